//! Relay device port: the 8-in/8-out digital I/O box.

use std::future::Future;
use std::time::Duration;

use relayseq_domain::channel::Channel;
use relayseq_domain::error::RelaySeqError;

/// Failures reported by a [`RelayDevice`].
///
/// All of them are transient from the engine's point of view: the failing
/// tick is skipped or the failing write is dropped, and the next tick tries
/// again.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay is not connected")]
    NotConnected,

    #[error("relay did not answer within {0:?}")]
    Timeout(Duration),

    #[error("relay i/o failed")]
    Io(#[from] std::io::Error),

    /// The device answered with an exception code.
    #[error("relay rejected function {function:#04x} with exception {code:#04x}")]
    Exception { function: u8, code: u8 },

    /// The device answered with something that is not a valid response.
    #[error("malformed relay response: {0}")]
    Protocol(String),

    /// Any other adapter-specific failure.
    #[error("relay backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RelayError> for RelaySeqError {
    fn from(err: RelayError) -> Self {
        Self::Device(Box::new(err))
    }
}

/// Access to the relay box.
///
/// Masks use bit `n-1` for channel `n`.
pub trait RelayDevice: Send + Sync {
    /// Open the connection. Calling it while connected is a no-op.
    fn connect(&self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Close the connection. Never fails.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;

    /// Read the eight digital inputs as a bitmask.
    fn read_inputs(&self) -> impl Future<Output = Result<u8, RelayError>> + Send;

    /// Read the eight output coils as a bitmask.
    fn read_outputs(&self) -> impl Future<Output = Result<u8, RelayError>> + Send;

    /// Drive one output.
    fn set(
        &self,
        channel: Channel,
        on: bool,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    fn all_on(&self) -> impl Future<Output = Result<(), RelayError>> + Send;

    fn all_off(&self) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Whether one output is currently ON.
    fn status(&self, channel: Channel) -> impl Future<Output = Result<bool, RelayError>> + Send {
        async move { Ok(self.read_outputs().await? & channel.bit() != 0) }
    }

    fn on(&self, channel: Channel) -> impl Future<Output = Result<(), RelayError>> + Send {
        self.set(channel, true)
    }

    fn off(&self, channel: Channel) -> impl Future<Output = Result<(), RelayError>> + Send {
        self.set(channel, false)
    }
}

impl<T: RelayDevice> RelayDevice for std::sync::Arc<T> {
    fn connect(&self) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).connect()
    }

    fn disconnect(&self) -> impl Future<Output = ()> + Send {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn read_inputs(&self) -> impl Future<Output = Result<u8, RelayError>> + Send {
        (**self).read_inputs()
    }

    fn read_outputs(&self) -> impl Future<Output = Result<u8, RelayError>> + Send {
        (**self).read_outputs()
    }

    fn set(
        &self,
        channel: Channel,
        on: bool,
    ) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).set(channel, on)
    }

    fn all_on(&self) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).all_on()
    }

    fn all_off(&self) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).all_off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBoard {
        outputs: Mutex<u8>,
    }

    impl RelayDevice for FakeBoard {
        async fn connect(&self) -> Result<(), RelayError> {
            Ok(())
        }

        async fn disconnect(&self) {}

        fn is_connected(&self) -> bool {
            true
        }

        async fn read_inputs(&self) -> Result<u8, RelayError> {
            Ok(0)
        }

        async fn read_outputs(&self) -> Result<u8, RelayError> {
            Ok(*self.outputs.lock().unwrap())
        }

        async fn set(&self, channel: Channel, on: bool) -> Result<(), RelayError> {
            let mut outputs = self.outputs.lock().unwrap();
            if on {
                *outputs |= channel.bit();
            } else {
                *outputs &= !channel.bit();
            }
            Ok(())
        }

        async fn all_on(&self) -> Result<(), RelayError> {
            *self.outputs.lock().unwrap() = 0xFF;
            Ok(())
        }

        async fn all_off(&self) -> Result<(), RelayError> {
            *self.outputs.lock().unwrap() = 0;
            Ok(())
        }
    }

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    #[tokio::test]
    async fn should_report_status_from_output_mask() {
        let board = FakeBoard::default();
        board.on(ch(3)).await.unwrap();
        assert!(board.status(ch(3)).await.unwrap());
        assert!(!board.status(ch(2)).await.unwrap());

        board.off(ch(3)).await.unwrap();
        assert!(!board.status(ch(3)).await.unwrap());
    }

    #[tokio::test]
    async fn should_delegate_through_arc() {
        let board = std::sync::Arc::new(FakeBoard::default());
        board.all_on().await.unwrap();
        assert_eq!(board.read_outputs().await.unwrap(), 0xFF);
    }

    #[test]
    fn should_convert_into_device_error() {
        let err: RelaySeqError = RelayError::NotConnected.into();
        assert!(matches!(err, RelaySeqError::Device(_)));
    }

    #[test]
    fn should_display_exception_in_hex() {
        let err = RelayError::Exception {
            function: 0x85,
            code: 0x02,
        };
        assert_eq!(
            err.to_string(),
            "relay rejected function 0x85 with exception 0x02"
        );
    }
}
