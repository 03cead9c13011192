//! Modbus framing errors.

use relayseq_app::ports::RelayError;
use relayseq_domain::error::RelaySeqError;

/// A response that does not answer the request it was read for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("response is truncated")]
    Truncated,

    #[error("unexpected protocol id {0}")]
    ProtocolId(u16),

    #[error("invalid frame length {0}")]
    Length(usize),

    #[error("transaction id {actual} does not match request {expected}")]
    TransactionMismatch { expected: u16, actual: u16 },

    #[error("expected function {expected:#04x}, got {actual:#04x}")]
    UnexpectedFunction { expected: u8, actual: u8 },

    #[error("expected {expected} data bytes, got {actual}")]
    ByteCount { expected: usize, actual: usize },

    #[error("write was not echoed back")]
    EchoMismatch,

    /// The device answered with an exception code.
    #[error("exception {code:#04x} for function {function:#04x}")]
    Exception { function: u8, code: u8 },
}

impl From<FrameError> for RelayError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Exception { function, code } => Self::Exception { function, code },
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<FrameError> for RelaySeqError {
    fn from(err: FrameError) -> Self {
        RelayError::from(err).into()
    }
}
