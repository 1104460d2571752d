//! # facelink-core
//!
//! Client library for a face-tracking server's binary TCP stream.
//!
//! This crate contains:
//! - **Wire types**: `BlockHeader`, `Block`, `BlockKind`, `Packet` and the
//!   container `BlockReader`
//! - **Codec**: `FaceLinkCodec` for framed TCP I/O via `tokio_util`
//! - **Network**: resolve, endpoint fallback and the persistent read loop
//! - **State**: the shared `TrackingState` and the `ConnectionPhase` machine
//! - **Client**: `FaceTracker`, the thread-safe façade owning the worker
//! - **Blend**: `BlendCompositor`, lazy CPU blendshape mixing
//! - **Error**: `FaceLinkError`, a typed `thiserror`-based error enum

pub mod blend;
pub mod blendshapes;
pub mod block;
pub mod client;
pub mod codec;
pub mod error;
pub mod header;
pub mod math;
pub mod network;
pub mod packet;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use blend::{BlendCompositor, Mesh, MeshImporter, MeshSet};
pub use blendshapes::{BLENDSHAPE_NAMES, NUM_BLENDSHAPE_NAMES};
pub use block::{Block, BlockKind};
pub use client::{ClientOptions, FaceTracker};
pub use codec::FaceLinkCodec;
pub use error::{FaceLinkError, Result};
pub use header::{BlockHeader, HEADER_SIZE};
pub use math::{EyeAngles, Quat, Vec3};
pub use network::{ConnectionInfo, DEFAULT_HOST, DEFAULT_PORT};
pub use packet::{BlockReader, Packet};
pub use state::{ConnectionPhase, TrackingFrame, TrackingState};
