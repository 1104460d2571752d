//! Typed tracking blocks and their payload layouts.
//!
//! | Id    | Kind        | Payload                                        |
//! |-------|-------------|------------------------------------------------|
//! | 33433 | Container   | `u16 count` + `count` header-prefixed blocks   |
//! | 101   | FrameInfo   | `f64 timestamp`, `u8 success`                  |
//! | 102   | Pose        | `f32 qx,qy,qz,qw`, `f32 px,py,pz`              |
//! | 103   | Blendshapes | `u32 count`, `count × f32`                     |
//! | 104   | Eyes        | `f32 leftTheta,leftPhi,rightTheta,rightPhi`    |
//! | 105   | Markers     | `u16 count`, `count × (f32 x,y,z)`             |
//!
//! Payload bytes beyond the fields listed are ignored, so newer block
//! versions that append fields still decode.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FaceLinkError, Result};
use crate::header::{BlockHeader, HEADER_SIZE};
use crate::math::{EyeAngles, Quat, Vec3};

/// Version number written into headers by the encoder.
pub const BLOCK_VERSION: u16 = 1;

// ── BlockKind ────────────────────────────────────────────────────

/// Block identifiers understood by the decoder.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    FrameInfo = 101,
    Pose = 102,
    Blendshapes = 103,
    Eyes = 104,
    Markers = 105,
    /// Wraps the blocks of one tracking frame.
    Container = 33433,
}

impl BlockKind {
    pub const fn id(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for BlockKind {
    type Error = FaceLinkError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            101 => Ok(BlockKind::FrameInfo),
            102 => Ok(BlockKind::Pose),
            103 => Ok(BlockKind::Blendshapes),
            104 => Ok(BlockKind::Eyes),
            105 => Ok(BlockKind::Markers),
            33433 => Ok(BlockKind::Container),
            _ => Err(FaceLinkError::UnknownVariant {
                type_name: "BlockKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::FrameInfo => write!(f, "FrameInfo"),
            BlockKind::Pose => write!(f, "Pose"),
            BlockKind::Blendshapes => write!(f, "Blendshapes"),
            BlockKind::Eyes => write!(f, "Eyes"),
            BlockKind::Markers => write!(f, "Markers"),
            BlockKind::Container => write!(f, "Container"),
        }
    }
}

// ── Block ────────────────────────────────────────────────────────

/// One decoded data block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    FrameInfo {
        timestamp: f64,
        tracking_successful: bool,
    },
    Pose {
        orientation: Quat,
        position: Vec3,
    },
    Blendshapes(Vec<f32>),
    Eyes {
        left: EyeAngles,
        right: EyeAngles,
    },
    Markers(Vec<Vec3>),
    /// A block id this client does not interpret. Its payload was skipped.
    Unknown(BlockHeader),
}

impl Block {
    /// Decode a single non-container block from its exact payload window.
    pub fn decode(header: &BlockHeader, payload: &[u8]) -> Result<Self> {
        let Ok(kind) = BlockKind::try_from(header.block_id) else {
            return Ok(Block::Unknown(*header));
        };

        let mut buf = payload;
        let block = match kind {
            BlockKind::FrameInfo => {
                need(&buf, 9, "frame info block")?;
                let timestamp = buf.get_f64_le();
                let success = buf.get_u8();
                Block::FrameInfo {
                    timestamp,
                    tracking_successful: success == 1,
                }
            }
            BlockKind::Pose => {
                need(&buf, 28, "pose block")?;
                let orientation = Quat::new(
                    buf.get_f32_le(),
                    buf.get_f32_le(),
                    buf.get_f32_le(),
                    buf.get_f32_le(),
                );
                let position = read_vec3(&mut buf);
                Block::Pose {
                    orientation,
                    position,
                }
            }
            BlockKind::Blendshapes => {
                need(&buf, 4, "blendshapes block")?;
                let count = buf.get_u32_le() as usize;
                need(&buf, count.saturating_mul(4), "blendshapes block")?;
                let weights = (0..count).map(|_| buf.get_f32_le()).collect();
                Block::Blendshapes(weights)
            }
            BlockKind::Eyes => {
                need(&buf, 16, "eyes block")?;
                let left = EyeAngles::new(buf.get_f32_le(), buf.get_f32_le());
                let right = EyeAngles::new(buf.get_f32_le(), buf.get_f32_le());
                Block::Eyes { left, right }
            }
            BlockKind::Markers => {
                need(&buf, 2, "markers block")?;
                let count = buf.get_u16_le() as usize;
                need(&buf, count * 12, "markers block")?;
                let markers = (0..count).map(|_| read_vec3(&mut buf)).collect();
                Block::Markers(markers)
            }
            BlockKind::Container => {
                return Err(FaceLinkError::InvalidHeader("nested container block"));
            }
        };
        Ok(block)
    }

    /// Block id written to the wire for this block.
    pub fn block_id(&self) -> u16 {
        match self {
            Block::FrameInfo { .. } => BlockKind::FrameInfo.id(),
            Block::Pose { .. } => BlockKind::Pose.id(),
            Block::Blendshapes(_) => BlockKind::Blendshapes.id(),
            Block::Eyes { .. } => BlockKind::Eyes.id(),
            Block::Markers(_) => BlockKind::Markers.id(),
            Block::Unknown(header) => header.block_id,
        }
    }

    /// Append header + payload to `dst`.
    ///
    /// `Unknown` blocks are written with a zero-filled payload of their
    /// declared size. Returns the header that was written.
    pub fn encode(&self, dst: &mut BytesMut) -> BlockHeader {
        let start = dst.len();
        dst.put_bytes(0, HEADER_SIZE);

        match self {
            Block::FrameInfo {
                timestamp,
                tracking_successful,
            } => {
                dst.put_f64_le(*timestamp);
                dst.put_u8(u8::from(*tracking_successful));
            }
            Block::Pose {
                orientation,
                position,
            } => {
                dst.put_f32_le(orientation.x);
                dst.put_f32_le(orientation.y);
                dst.put_f32_le(orientation.z);
                dst.put_f32_le(orientation.w);
                write_vec3(dst, *position);
            }
            Block::Blendshapes(weights) => {
                dst.put_u32_le(weights.len() as u32);
                for w in weights {
                    dst.put_f32_le(*w);
                }
            }
            Block::Eyes { left, right } => {
                dst.put_f32_le(left.theta);
                dst.put_f32_le(left.phi);
                dst.put_f32_le(right.theta);
                dst.put_f32_le(right.phi);
            }
            Block::Markers(markers) => {
                dst.put_u16_le(markers.len() as u16);
                for m in markers {
                    write_vec3(dst, *m);
                }
            }
            Block::Unknown(header) => {
                dst.put_bytes(0, header.block_size as usize);
            }
        }

        let version = match self {
            Block::Unknown(header) => header.version,
            _ => BLOCK_VERSION,
        };
        let size = (dst.len() - start - HEADER_SIZE) as u32;
        let header = BlockHeader::new(self.block_id(), version, size);
        dst[start..start + HEADER_SIZE].copy_from_slice(&header.encode());
        header
    }
}

// ── Internal ─────────────────────────────────────────────────────

fn need(buf: &&[u8], needed: usize, what: &'static str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(FaceLinkError::Truncated {
            what,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn read_vec3(buf: &mut &[u8]) -> Vec3 {
    Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le())
}

fn write_vec3(dst: &mut BytesMut, v: Vec3) {
    dst.put_f32_le(v.x);
    dst.put_f32_le(v.y);
    dst.put_f32_le(v.z);
}

// ── Tests ────────────────────────────────────────────────────────
