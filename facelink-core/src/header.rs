//! The 8-byte header that precedes every block on the wire.
//!
//! ```text
//! block_id:   u16  (2)
//! version:    u16  (2)
//! block_size: u32  (4)   payload bytes following the header
//! ```
//!
//! All fields are little-endian. `version` and `block_size` are taken
//! at face value; the codec only bounds `block_size` against its limit.

use crate::error::{FaceLinkError, Result};

/// Encoded size of a [`BlockHeader`] on the wire.
pub const HEADER_SIZE: usize = 8;

/// Header prefixed to every block, including the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHeader {
    pub block_id: u16,
    pub version: u16,
    pub block_size: u32,
}

impl BlockHeader {
    pub fn new(block_id: u16, version: u16, block_size: u32) -> Self {
        Self {
            block_id,
            version,
            block_size,
        }
    }

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.block_id.to_le_bytes());
        buf[2..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_size.to_le_bytes());
        buf
    }

    /// Deserialize from the first [`HEADER_SIZE`] bytes of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some(bytes) = data.first_chunk::<HEADER_SIZE>() else {
            return Err(FaceLinkError::Truncated {
                what: "block header",
                needed: HEADER_SIZE,
                available: data.len(),
            });
        };
        Ok(Self {
            block_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            version: u16::from_le_bytes([bytes[2], bytes[3]]),
            block_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Total bytes occupied by this header plus its payload.
    pub fn total_len(&self) -> usize {
        HEADER_SIZE + self.block_size as usize
    }
}
