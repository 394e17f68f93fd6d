//! Wire protocol between the bridge and its peer.
//!
//! Read request: `'R'` | addr(4B LE) | size(1B), always 6 bytes; the peer
//! answers with `size` bytes of data, little-endian, no framing.
//! Write request: `'W'` | addr(4B LE) | size(1B) | data(size B LE); the peer
//! never answers a write.

use crate::err::MmioError;

pub const READ_OPCODE: u8 = b'R';
pub const WRITE_OPCODE: u8 = b'W';

/// Length of a read request; also the header length of a write request.
pub const READ_REQUEST_LEN: usize = 6;

/// A validated access width. The codec only accepts this type, so an
/// out-of-set size can never reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte = 1,
    Half = 2,
    Word = 4,
}

impl AccessSize {
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for AccessSize {
    type Error = MmioError;

    fn try_from(size: usize) -> Result<Self, MmioError> {
        match size {
            1 => Ok(Self::Byte),
            2 => Ok(Self::Half),
            4 => Ok(Self::Word),
            _ => Err(MmioError::InvalidSize { size }),
        }
    }
}

pub fn encode_read_request(addr: u32, size: AccessSize) -> [u8; READ_REQUEST_LEN] {
    let mut req = [0u8; READ_REQUEST_LEN];
    req[0] = READ_OPCODE;
    req[1..5].copy_from_slice(&addr.to_le_bytes());
    req[5] = size.bytes() as u8;
    req
}

pub fn encode_write_request(addr: u32, size: AccessSize, value: u64) -> Vec<u8> {
    let mut req = Vec::with_capacity(READ_REQUEST_LEN + size.bytes());
    req.push(WRITE_OPCODE);
    req.extend_from_slice(&addr.to_le_bytes());
    req.push(size.bytes() as u8);
    req.extend_from_slice(&value.to_le_bytes()[..size.bytes()]);
    req
}

/// Decodes a read response. `buf` must hold exactly `size.bytes()` bytes.
pub fn decode_response(buf: &[u8], size: AccessSize) -> u64 {
    match size {
        AccessSize::Byte => buf[0] as u64,
        AccessSize::Half => u16::from_le_bytes([buf[0], buf[1]]) as u64,
        AccessSize::Word => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64,
    }
}
