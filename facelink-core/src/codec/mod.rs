//! Stream framing for top-level blocks.
//!
//! The decoder yields a [`Packet`] only once its header and all
//! `block_size` payload bytes are buffered, so a TCP read that ends
//! mid-block never reaches the tracking state.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FaceLinkError;
use crate::header::{BlockHeader, HEADER_SIZE};
use crate::packet::Packet;

/// Default upper bound on a single top-level block's payload.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Framing codec for the tracking stream.
#[derive(Debug, Clone)]
pub struct FaceLinkCodec {
    max_block_size: usize,
}

impl FaceLinkCodec {
    pub fn new(max_block_size: usize) -> Self {
        Self { max_block_size }
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

impl Default for FaceLinkCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCK_SIZE)
    }
}

impl Decoder for FaceLinkCodec {
    type Item = Packet;
    type Error = FaceLinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = BlockHeader::decode(src)?;
        let size = header.block_size as usize;
        if size > self.max_block_size {
            return Err(FaceLinkError::FrameTooLarge {
                size,
                max: self.max_block_size,
            });
        }

        let total = header.total_len();
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(HEADER_SIZE);
        Ok(Some(Packet::from_parts(header, frame.freeze())))
    }
}

impl Encoder<Packet> for FaceLinkCodec {
    type Error = FaceLinkError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = item.payload().len();
        if size > self.max_block_size {
            return Err(FaceLinkError::FrameTooLarge {
                size,
                max: self.max_block_size,
            });
        }
        item.encode(dst);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
