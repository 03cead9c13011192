//! # relayseq-adapter-virtual
//!
//! Simulated relay board that lives entirely in memory.
//!
//! ## Behaviour
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `read_inputs` | Returns the mask last injected with [`VirtualRelay::set_input`] |
//! | `read_outputs` | Returns the coil mask |
//! | `set` / `all_on` / `all_off` | Drive the coils and append to the write log |
//!
//! The handle is cheaply clonable: tests keep one clone to inject inputs and
//! inspect outputs while the controller owns another. Read and write
//! failures can be injected to exercise the engine's retry paths.
//!
//! ## Dependency rule
//!
//! Depends on `relayseq-app` (port traits) and `relayseq-domain` only.

mod demo;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relayseq_app::ports::{RelayDevice, RelayError};
use relayseq_domain::channel::Channel;

pub use demo::InputScript;

/// One output write as seen by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Set { channel: Channel, on: bool },
    AllOn,
    AllOff,
}

#[derive(Debug, Default)]
struct Board {
    inputs: u8,
    outputs: u8,
    writes: Vec<Write>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug, Default)]
struct Shared {
    board: Mutex<Board>,
    connected: AtomicBool,
}

/// In-memory relay board.
#[derive(Debug, Clone, Default)]
pub struct VirtualRelay {
    shared: Arc<Shared>,
}

impl VirtualRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        // The board holds plain data; a panicked holder cannot leave it torn.
        self.shared
            .board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive one input as if its sensor changed.
    pub fn set_input(&self, channel: Channel, on: bool) {
        let mut board = self.board();
        if on {
            board.inputs |= channel.bit();
        } else {
            board.inputs &= !channel.bit();
        }
    }

    /// Replace every input at once.
    pub fn set_inputs(&self, mask: u8) {
        self.board().inputs = mask;
    }

    #[must_use]
    pub fn inputs(&self) -> u8 {
        self.board().inputs
    }

    #[must_use]
    pub fn outputs(&self) -> u8 {
        self.board().outputs
    }

    #[must_use]
    pub fn output(&self, channel: Channel) -> bool {
        self.outputs() & channel.bit() != 0
    }

    /// Writes received since the last call, oldest first.
    pub fn take_writes(&self) -> Vec<Write> {
        std::mem::take(&mut self.board().writes)
    }

    /// Make every read fail with [`RelayError::NotConnected`] until reset.
    pub fn fail_reads(&self, fail: bool) {
        self.board().fail_reads = fail;
    }

    /// Make every write fail with [`RelayError::NotConnected`] until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.board().fail_writes = fail;
    }

    fn write(&self, write: Write) -> Result<(), RelayError> {
        let mut board = self.board();
        if board.fail_writes {
            return Err(RelayError::NotConnected);
        }
        board.outputs = match write {
            Write::Set { channel, on: true } => board.outputs | channel.bit(),
            Write::Set { channel, on: false } => board.outputs & !channel.bit(),
            Write::AllOn => u8::MAX,
            Write::AllOff => 0,
        };
        board.writes.push(write);
        Ok(())
    }

    fn read(&self, pick: impl FnOnce(&Board) -> u8) -> Result<u8, RelayError> {
        let board = self.board();
        if board.fail_reads {
            return Err(RelayError::NotConnected);
        }
        Ok(pick(&board))
    }
}

impl RelayDevice for VirtualRelay {
    async fn connect(&self) -> Result<(), RelayError> {
        if !self.shared.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("virtual relay connected");
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn read_inputs(&self) -> Result<u8, RelayError> {
        self.read(|board| board.inputs)
    }

    async fn read_outputs(&self) -> Result<u8, RelayError> {
        self.read(|board| board.outputs)
    }

    async fn set(&self, channel: Channel, on: bool) -> Result<(), RelayError> {
        self.write(Write::Set { channel, on })
    }

    async fn all_on(&self) -> Result<(), RelayError> {
        self.write(Write::AllOn)
    }

    async fn all_off(&self) -> Result<(), RelayError> {
        self.write(Write::AllOff)
    }
}
