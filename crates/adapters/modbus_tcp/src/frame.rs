//! Modbus/TCP framing.
//!
//! ```text
//!  Transaction ID | Protocol ID | Length  | Unit ID | Function | Data
//!  2 bytes        | 2 bytes     | 2 bytes | 1 byte  | 1 byte   | n bytes
//! ```
//!
//! `Length` counts the unit id and the PDU. All fields are big-endian.

use crate::error::FrameError;

pub const READ_COILS: u8 = 0x01;
pub const READ_DISCRETE_INPUTS: u8 = 0x02;
pub const WRITE_SINGLE_COIL: u8 = 0x05;
pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Set on the function code of an exception response.
const EXCEPTION_FLAG: u8 = 0x80;

pub const HEADER_LEN: usize = 7;

/// Largest PDU allowed by the protocol.
const MAX_PDU_LEN: usize = 253;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { address: u16, count: u16 },
    ReadDiscreteInputs { address: u16, count: u16 },
    WriteSingleCoil { address: u16, on: bool },
    WriteMultipleCoils { address: u16, values: Vec<bool> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Packed bits of a read, least significant bit first.
    Bits(Vec<u8>),
    /// A write was echoed back as expected.
    Written,
}

impl Request {
    #[must_use]
    pub const fn function(&self) -> u8 {
        match self {
            Self::ReadCoils { .. } => READ_COILS,
            Self::ReadDiscreteInputs { .. } => READ_DISCRETE_INPUTS,
            Self::WriteSingleCoil { .. } => WRITE_SINGLE_COIL,
            Self::WriteMultipleCoils { .. } => WRITE_MULTIPLE_COILS,
        }
    }

    fn encode_pdu(&self, buf: &mut Vec<u8>) {
        buf.push(self.function());
        match self {
            Self::ReadCoils { address, count } | Self::ReadDiscreteInputs { address, count } => {
                buf.extend(address.to_be_bytes());
                buf.extend(count.to_be_bytes());
            }
            Self::WriteSingleCoil { address, on } => {
                buf.extend(address.to_be_bytes());
                buf.extend(coil_value(*on).to_be_bytes());
            }
            Self::WriteMultipleCoils { address, values } => {
                let packed = pack_bits(values);
                buf.extend(address.to_be_bytes());
                buf.extend(quantity(values).to_be_bytes());
                buf.push(u8::try_from(packed.len()).unwrap_or(u8::MAX));
                buf.extend(packed);
            }
        }
    }

    /// Encode the full ADU.
    #[must_use]
    pub fn encode(&self, transaction: u16, unit: u8) -> Vec<u8> {
        let mut pdu = Vec::with_capacity(16);
        self.encode_pdu(&mut pdu);

        let mut frame = Vec::with_capacity(HEADER_LEN + pdu.len());
        frame.extend(transaction.to_be_bytes());
        frame.extend(0u16.to_be_bytes());
        frame.extend(quantity(&pdu).saturating_add(1).to_be_bytes());
        frame.push(unit);
        frame.extend(pdu);
        frame
    }

    /// Decode the PDU answering this request.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Exception`] when the device rejected the
    /// request, or another [`FrameError`] when the PDU does not answer it.
    pub fn decode_response(&self, pdu: &[u8]) -> Result<Response, FrameError> {
        let (&function, data) = pdu.split_first().ok_or(FrameError::Truncated)?;
        if function == self.function() | EXCEPTION_FLAG {
            let code = data.first().copied().ok_or(FrameError::Truncated)?;
            return Err(FrameError::Exception {
                function: self.function(),
                code,
            });
        }
        if function != self.function() {
            return Err(FrameError::UnexpectedFunction {
                expected: self.function(),
                actual: function,
            });
        }

        match self {
            Self::ReadCoils { count, .. } | Self::ReadDiscreteInputs { count, .. } => {
                let (&byte_count, bits) = data.split_first().ok_or(FrameError::Truncated)?;
                let expected = usize::from(count.div_ceil(8));
                if usize::from(byte_count) != expected || bits.len() != expected {
                    return Err(FrameError::ByteCount {
                        expected,
                        actual: bits.len(),
                    });
                }
                Ok(Response::Bits(bits.to_vec()))
            }
            Self::WriteSingleCoil { address, on } => {
                expect_echo(data, *address, coil_value(*on))
            }
            Self::WriteMultipleCoils { address, values } => {
                expect_echo(data, *address, quantity(values))
            }
        }
    }
}

/// The fixed part of an incoming frame. The unit id is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub transaction: u16,
    /// Length of the PDU that follows.
    pub pdu_len: usize,
}

impl Header {
    /// Parse and check a received MBAP header.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ProtocolId`] for a non-Modbus protocol id and
    /// [`FrameError::Length`] when the announced length is out of bounds.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, FrameError> {
        let transaction = u16::from_be_bytes([bytes[0], bytes[1]]);
        let protocol = u16::from_be_bytes([bytes[2], bytes[3]]);
        let length = usize::from(u16::from_be_bytes([bytes[4], bytes[5]]));
        if protocol != 0 {
            return Err(FrameError::ProtocolId(protocol));
        }
        if !(2..=MAX_PDU_LEN + 1).contains(&length) {
            return Err(FrameError::Length(length));
        }
        Ok(Self {
            transaction,
            pdu_len: length - 1,
        })
    }
}

const fn coil_value(on: bool) -> u16 {
    if on { COIL_ON } else { COIL_OFF }
}

fn expect_echo(data: &[u8], address: u16, value: u16) -> Result<Response, FrameError> {
    let [a0, a1, v0, v1] = data else {
        return Err(FrameError::Truncated);
    };
    if u16::from_be_bytes([*a0, *a1]) != address || u16::from_be_bytes([*v0, *v1]) != value {
        return Err(FrameError::EchoMismatch);
    }
    Ok(Response::Written)
}

fn quantity<T>(items: &[T]) -> u16 {
    u16::try_from(items.len()).unwrap_or(u16::MAX)
}

/// Pack coil values eight per byte, first coil in the lowest bit.
fn pack_bits(values: &[bool]) -> Vec<u8> {
    values
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .fold(0u8, |byte, (bit, _)| byte | (1 << bit))
        })
        .collect()
}
