//! A synthetic tracking server.
//!
//! Streams one container per frame to every connected client: frame info,
//! a slowly nodding head pose, sinusoidal blendshape weights, wandering
//! eyes and a small marker ring. Useful for exercising `watch` (or any
//! other client) without a camera.

use std::f32::consts::TAU;
use std::net::SocketAddr;
use std::time::Duration;

use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use facelink_core::{Block, EyeAngles, FaceLinkCodec, Packet, Quat, Vec3};

const NUM_MARKERS: usize = 4;

/// Build the container for frame number `frame` at `fps`.
pub fn synthetic_frame(frame: u64, fps: u32, blendshapes: usize) -> Packet {
    let t = frame as f32 / fps.max(1) as f32;

    let nod = Quat::from_axis_angle(Vec3::X, 0.2 * (t * 0.5 * TAU).sin());
    let position = Vec3::new(20.0 * (t * 0.25 * TAU).sin(), 0.0, 600.0);

    let weights = (0..blendshapes)
        .map(|i| 0.5 + 0.5 * (t * TAU * 0.2 + i as f32 * 0.4).sin())
        .collect();

    let gaze = EyeAngles::new(10.0 * (t * TAU * 0.3).sin(), 15.0 * (t * TAU * 0.1).cos());

    let markers = (0..NUM_MARKERS)
        .map(|i| {
            let a = i as f32 / NUM_MARKERS as f32 * TAU + t;
            Vec3::new(30.0 * a.cos(), 30.0 * a.sin(), 600.0)
        })
        .map(|m| m + position)
        .collect();

    Packet::container_of(&[
        Block::FrameInfo {
            timestamp: t as f64,
            tracking_successful: true,
        },
        Block::Pose {
            orientation: nod,
            position,
        },
        Block::Blendshapes(weights),
        Block::Eyes {
            left: gaze,
            right: gaze,
        },
        Block::Markers(markers),
    ])
}

/// Accept clients on `listener` and stream synthetic frames to each one
/// until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    fps: u32,
    blendshapes: usize,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, fps, "synthetic server listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("synthetic server stopping");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!(%peer, "client connected");
                let cancel = cancel.child_token();
                tokio::spawn(async move {
                    stream_frames(stream, peer, fps, blendshapes, cancel).await;
                });
            }
        }
    }
}

async fn stream_frames(
    stream: TcpStream,
    peer: SocketAddr,
    fps: u32,
    blendshapes: usize,
    cancel: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, "set_nodelay failed: {e}");
    }
    let mut writer = FramedWrite::new(stream, FaceLinkCodec::default());
    let mut ticker = interval(Duration::from_secs(1) / fps.max(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frame = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let packet = synthetic_frame(frame, fps, blendshapes);
                if let Err(e) = writer.send(packet).await {
                    warn!(%peer, "client write failed: {e}");
                    break;
                }
                frame += 1;
            }
        }
    }
    info!(%peer, frames = frame, "client disconnected");
}

// ── Tests ────────────────────────────────────────────────────────
