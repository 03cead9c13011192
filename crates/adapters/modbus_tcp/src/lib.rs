//! # relayseq-adapter-modbus-tcp
//!
//! Drives an Ethernet relay box (8 discrete inputs, 8 coils) over
//! Modbus/TCP.
//!
//! ## Mapping
//!
//! | Port operation | Function code |
//! |----------------|---------------|
//! | `read_inputs` | `0x02` read discrete inputs 0..8 |
//! | `read_outputs` / `status` | `0x01` read coils 0..8 |
//! | `set` / `on` / `off` | `0x05` write single coil `channel - 1` |
//! | `all_on` / `all_off` | `0x0F` write multiple coils 0..8 |
//!
//! One request is in flight at a time. Every request is bounded by the
//! configured timeout; a timeout, an I/O error or a garbled response drops
//! the connection and the next request reconnects.
//!
//! ## Dependency rule
//!
//! Depends on `relayseq-app` (port traits) and `relayseq-domain` only.

mod config;
mod error;
mod frame;

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use relayseq_app::ports::{RelayDevice, RelayError};
use relayseq_domain::channel::{CHANNEL_COUNT, Channel};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

pub use config::ModbusConfig;
pub use error::FrameError;

use frame::{HEADER_LEN, Header, Request, Response};

/// Modbus/TCP client for the relay box.
#[derive(Debug)]
pub struct ModbusRelay {
    config: ModbusConfig,
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    transaction: AtomicU16,
}

impl ModbusRelay {
    #[must_use]
    pub fn new(config: ModbusConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            transaction: AtomicU16::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ModbusConfig {
        &self.config
    }

    async fn open(&self) -> Result<TcpStream, RelayError> {
        let address = self.config.address();
        let stream = tokio::time::timeout(self.config.timeout(), TcpStream::connect(&address))
            .await
            .map_err(|_| RelayError::Timeout(self.config.timeout()))??;
        stream.set_nodelay(true)?;
        tracing::info!(%address, unit = self.config.unit_id, "relay connected");
        Ok(stream)
    }

    /// Send one request and wait for its response, connecting first if needed.
    async fn call(&self, request: Request) -> Result<Response, RelayError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
            self.connected.store(true, Ordering::SeqCst);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(RelayError::NotConnected);
        };

        let transaction = self.transaction.fetch_add(1, Ordering::Relaxed);
        let result = tokio::time::timeout(
            self.config.timeout(),
            exchange(stream, &request, transaction, self.config.unit_id),
        )
        .await
        .unwrap_or(Err(RelayError::Timeout(self.config.timeout())));

        if let Err(err) = &result
            && !matches!(err, RelayError::Exception { .. })
        {
            tracing::warn!(
                error = %err,
                function = request.function(),
                "dropping relay connection"
            );
            *guard = None;
            self.connected.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn read_mask(&self, request: Request) -> Result<u8, RelayError> {
        match self.call(request).await? {
            Response::Bits(bits) => bits
                .first()
                .copied()
                .ok_or_else(|| RelayError::Protocol("empty bit response".to_string())),
            Response::Written => Err(RelayError::Protocol(
                "write acknowledgement for a read".to_string(),
            )),
        }
    }

    async fn write_all(&self, on: bool) -> Result<(), RelayError> {
        self.call(Request::WriteMultipleCoils {
            address: 0,
            values: vec![on; usize::from(CHANNEL_COUNT)],
        })
        .await
        .map(|_| ())
    }
}

async fn exchange(
    stream: &mut TcpStream,
    request: &Request,
    transaction: u16,
    unit: u8,
) -> Result<Response, RelayError> {
    stream.write_all(&request.encode(transaction, unit)).await?;

    let mut head = [0u8; HEADER_LEN];
    stream.read_exact(&mut head).await?;
    let header = Header::parse(&head)?;
    let mut pdu = vec![0u8; header.pdu_len];
    stream.read_exact(&mut pdu).await?;

    if header.transaction != transaction {
        return Err(FrameError::TransactionMismatch {
            expected: transaction,
            actual: header.transaction,
        }
        .into());
    }
    Ok(request.decode_response(&pdu)?)
}

impl RelayDevice for ModbusRelay {
    async fn connect(&self) -> Result<(), RelayError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
            self.connected.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
            tracing::info!(address = %self.config.address(), "relay disconnected");
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn read_inputs(&self) -> Result<u8, RelayError> {
        self.read_mask(Request::ReadDiscreteInputs {
            address: 0,
            count: u16::from(CHANNEL_COUNT),
        })
        .await
    }

    async fn read_outputs(&self) -> Result<u8, RelayError> {
        self.read_mask(Request::ReadCoils {
            address: 0,
            count: u16::from(CHANNEL_COUNT),
        })
        .await
    }

    async fn set(&self, channel: Channel, on: bool) -> Result<(), RelayError> {
        self.call(Request::WriteSingleCoil {
            address: u16::from(channel.number() - 1),
            on,
        })
        .await
        .map(|_| ())
    }

    async fn all_on(&self) -> Result<(), RelayError> {
        self.write_all(true).await
    }

    async fn all_off(&self) -> Result<(), RelayError> {
        self.write_all(false).await
    }
}
