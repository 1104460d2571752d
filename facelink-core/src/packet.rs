//! Top-level wire records and container traversal.
//!
//! A [`Packet`] is one header-prefixed record exactly as framed off the
//! stream: usually a Container, whose payload is a `u16` block count
//! followed by that many header-prefixed inner blocks.
//!
//! Every inner block occupies exactly `HEADER_SIZE + block_size` bytes
//! of the container. The reader always advances by the declared size,
//! whether or not it understood the block, so an unknown block never
//! misaligns the blocks after it. A block that claims more bytes than
//! the container holds ends traversal with [`FaceLinkError::Truncated`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::{Block, BlockKind, BLOCK_VERSION};
use crate::error::{FaceLinkError, Result};
use crate::header::{BlockHeader, HEADER_SIZE};

// ── Packet ───────────────────────────────────────────────────────

/// One framed top-level record.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    header: BlockHeader,
    payload: Bytes,
}

impl Packet {
    /// Wrap raw bytes. The header's `block_size` is set from `payload`.
    pub fn new(block_id: u16, version: u16, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: BlockHeader::new(block_id, version, payload.len() as u32),
            payload,
        }
    }

    /// Reassemble a packet from an already-decoded header and its payload.
    pub(crate) fn from_parts(header: BlockHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// A single encoded block as a packet.
    pub fn from_block(block: &Block) -> Self {
        let mut buf = BytesMut::new();
        let header = block.encode(&mut buf);
        let payload = buf.freeze().split_off(HEADER_SIZE);
        Self { header, payload }
    }

    /// A container holding `inner` in order.
    pub fn container(inner: &[Packet]) -> Self {
        let mut payload = BytesMut::new();
        payload.put_u16_le(inner.len() as u16);
        for packet in inner {
            packet.encode(&mut payload);
        }
        Self::new(BlockKind::Container.id(), BLOCK_VERSION, payload.freeze())
    }

    /// A container holding `blocks` in order.
    pub fn container_of(blocks: &[Block]) -> Self {
        let inner: Vec<Packet> = blocks.iter().map(Packet::from_block).collect();
        Self::container(&inner)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_container(&self) -> bool {
        self.header.block_id == BlockKind::Container.id()
    }

    /// Append header + payload to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE + self.payload.len());
        dst.put_slice(&self.header.encode());
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.to_vec()
    }

    /// Iterate the decoded blocks carried by this packet.
    ///
    /// A container yields its inner blocks; any other packet yields
    /// itself as a single block.
    pub fn blocks(&self) -> Result<BlockReader<'_>> {
        if self.is_container() {
            BlockReader::container(&self.payload)
        } else {
            Ok(BlockReader::single(self.header, &self.payload))
        }
    }
}

// ── BlockReader ──────────────────────────────────────────────────

/// Iterator over the blocks of one packet.
///
/// Stops after the first error.
#[derive(Debug)]
pub struct BlockReader<'a> {
    data: &'a [u8],
    remaining: u16,
    single: Option<BlockHeader>,
    failed: bool,
}

impl<'a> BlockReader<'a> {
    /// Start reading a container payload (`u16 count` + blocks).
    pub fn container(payload: &'a [u8]) -> Result<Self> {
        let Some((count, data)) = payload.split_first_chunk::<2>() else {
            return Err(FaceLinkError::Truncated {
                what: "container block count",
                needed: 2,
                available: payload.len(),
            });
        };
        Ok(Self {
            data,
            remaining: u16::from_le_bytes(*count),
            single: None,
            failed: false,
        })
    }

    fn single(header: BlockHeader, payload: &'a [u8]) -> Self {
        Self {
            data: payload,
            remaining: 1,
            single: Some(header),
            failed: false,
        }
    }

    /// Blocks the container still claims to hold.
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    fn next_block(&mut self) -> Result<Block> {
        if let Some(header) = self.single.take() {
            return Block::decode(&header, self.data);
        }

        let header = BlockHeader::decode(self.data)?;
        let end = header.total_len();
        if self.data.len() < end {
            return Err(FaceLinkError::Truncated {
                what: "container inner block",
                needed: end,
                available: self.data.len(),
            });
        }
        let payload = &self.data[HEADER_SIZE..end];
        self.data = &self.data[end..];
        Block::decode(&header, payload)
    }
}

impl Iterator for BlockReader<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let result = self.next_block();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

// ── Tests ────────────────────────────────────────────────────────
