//! Thread-safe tracking client.
//!
//! [`FaceTracker`] owns one background worker thread. The worker runs a
//! single-threaded Tokio runtime that resolves the server, connects with
//! endpoint fallback, then reads and applies blocks until the connection
//! fails or [`FaceTracker::close`] is called. Every other thread only
//! sees the decoded values through copy-out accessors.
//!
//! ```text
//! caller thread                     facelink-worker thread
//! ─────────────                     ──────────────────────
//! connect() ──spawn──────────────►  resolve → connect_any
//!    ◄──────── connect result ────  │
//!                                   read_loop ──apply──► TrackingState
//! rotation(), blendshape_weights() ◄──────── copy ───────┘
//! close() ─────── cancel token ──►  read_loop returns, socket dropped
//! drop ────────── join ──────────►  thread exits
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::blend::{BlendCompositor, MeshImporter, MeshSet};
use crate::blendshapes::{blendshape_name, BLENDSHAPE_NAMES};
use crate::codec::{FaceLinkCodec, DEFAULT_MAX_BLOCK_SIZE};
use crate::error::{FaceLinkError, Result};
use crate::math::{EyeAngles, Quat, Vec3};
use crate::network::{establish, read_loop, ConnectionInfo, ReadOutcome};
use crate::state::{ConnectionPhase, TrackingFrame, TrackingState};

// ── ClientOptions ────────────────────────────────────────────────

/// Tunables for [`FaceTracker`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-endpoint connect deadline.
    pub connect_timeout: Duration,
    /// Largest top-level block payload accepted from the server.
    pub max_block_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── FaceTracker ──────────────────────────────────────────────────

/// Client for a tracking server's binary TCP stream.
///
/// All methods take `&self`; share the tracker with `Arc` to call
/// [`close`](Self::close) from another thread while
/// [`connect`](Self::connect) is blocked.
#[derive(Debug)]
pub struct FaceTracker {
    options: ClientOptions,
    tracking: TrackingState,
    phase: Arc<Mutex<ConnectionPhase>>,
    cancel: Mutex<CancellationToken>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for FaceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceTracker {
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            options,
            tracking: TrackingState::new(),
            phase: Arc::new(Mutex::new(ConnectionPhase::Disconnected)),
            cancel: Mutex::new(CancellationToken::new()),
            worker: Mutex::new(None),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Resolve `host:port` and connect to the first endpoint that accepts.
    ///
    /// Blocks until the connection is established or every candidate
    /// failed; the read loop then keeps running on the worker thread.
    /// From async code, call this through `spawn_blocking`.
    pub fn connect(&self, host: &str, port: &str) -> Result<SocketAddr> {
        self.start(ConnectionInfo::host(host, port))
    }

    /// [`connect`](Self::connect) to `127.0.0.1:33433`.
    pub fn connect_default(&self) -> Result<SocketAddr> {
        self.start(ConnectionInfo::default())
    }

    /// Like [`connect`](Self::connect), with explicit endpoints and no
    /// name resolution.
    pub fn connect_addrs(&self, addrs: Vec<SocketAddr>) -> Result<SocketAddr> {
        self.start(ConnectionInfo::Addrs(addrs))
    }

    /// Request the connection be closed.
    ///
    /// Safe from any thread and idempotent. The socket is closed by the
    /// worker that owns it; an in-flight connect attempt is abandoned
    /// and [`connect`](Self::connect) returns [`FaceLinkError::Cancelled`].
    pub fn close(&self) {
        debug!("close requested");
        lock(&self.cancel).cancel();
    }

    /// Current connection phase.
    pub fn phase(&self) -> ConnectionPhase {
        lock(&self.phase).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.phase).is_connected()
    }

    fn start(&self, info: ConnectionInfo) -> Result<SocketAddr> {
        let mut worker = lock(&self.worker);

        if let Some(handle) = worker.take() {
            // A disconnected worker is on its way out; just join it.
            let phase = self.phase();
            if !handle.is_finished() && !phase.is_disconnected() {
                *worker = Some(handle);
                return Err(FaceLinkError::AlreadyConnected(phase.to_string()));
            }
            if handle.join().is_err() {
                warn!("previous network worker panicked");
            }
        }

        lock(&self.phase).begin_connect()?;

        let cancel = CancellationToken::new();
        *lock(&self.cancel) = cancel.clone();

        let (connected_tx, connected_rx) = mpsc::channel();
        let ctx = Worker {
            info: info.clone(),
            options: self.options.clone(),
            tracking: self.tracking.clone(),
            phase: Arc::clone(&self.phase),
            cancel,
        };

        info!(server = %info, "connecting to tracking server");
        let handle = thread::Builder::new()
            .name("facelink-worker".into())
            .spawn(move || ctx.run(connected_tx))
            .map_err(|e| {
                lock(&self.phase).force_disconnect();
                FaceLinkError::Worker(e.to_string())
            })?;

        let result = connected_rx.recv().unwrap_or_else(|_| {
            Err(FaceLinkError::Worker(
                "network worker exited before reporting".into(),
            ))
        });

        match result {
            Ok(peer) => {
                *worker = Some(handle);
                Ok(peer)
            }
            Err(e) => {
                if handle.join().is_err() {
                    warn!("network worker panicked during connect");
                }
                Err(e)
            }
        }
    }

    // ── Tracking accessors ───────────────────────────────────────

    /// Handle to the shared state, for consumers such as [`BlendCompositor`].
    pub fn tracking(&self) -> TrackingState {
        self.tracking.clone()
    }

    /// Every field, copied under one lock acquisition.
    pub fn snapshot(&self) -> TrackingFrame {
        self.tracking.snapshot()
    }

    /// Timestamp of the last FrameInfo block.
    pub fn timestamp(&self) -> f64 {
        self.tracking.timestamp()
    }

    pub fn is_tracking_successful(&self) -> bool {
        self.tracking.is_tracking_successful()
    }

    /// Head orientation.
    pub fn rotation(&self) -> Quat {
        self.tracking.rotation()
    }

    /// Head position in millimetres, as sent by the server.
    pub fn position(&self) -> Vec3 {
        self.tracking.position()
    }

    pub fn left_eye_rotation(&self) -> Quat {
        self.tracking.left_eye_angles().to_quat()
    }

    pub fn right_eye_rotation(&self) -> Quat {
        self.tracking.right_eye_angles().to_quat()
    }

    pub fn left_eye_angles(&self) -> EyeAngles {
        self.tracking.left_eye_angles()
    }

    pub fn right_eye_angles(&self) -> EyeAngles {
        self.tracking.right_eye_angles()
    }

    pub fn blendshape_names(&self) -> &'static [&'static str] {
        &BLENDSHAPE_NAMES
    }

    pub fn blendshape_name(&self, i: usize) -> Option<&'static str> {
        blendshape_name(i)
    }

    /// Length of the current weight vector.
    pub fn num_blendshapes(&self) -> usize {
        self.tracking.num_blendshapes()
    }

    pub fn blendshape_weights(&self) -> Vec<f32> {
        self.tracking.blendshape_weights()
    }

    pub fn blendshape_weight(&self, i: usize) -> Option<f32> {
        self.tracking.blendshape_weight(i)
    }

    pub fn markers(&self) -> Vec<Vec3> {
        self.tracking.markers()
    }

    // ── Meshes ───────────────────────────────────────────────────

    /// A compositor blending `meshes` with this client's live weights.
    pub fn blend_compositor(&self, meshes: MeshSet) -> BlendCompositor {
        BlendCompositor::new(self.tracking(), meshes)
    }

    /// Import meshes from `folder` and bind them to this client.
    pub fn import_meshes(
        &self,
        importer: &impl MeshImporter,
        folder: &Path,
    ) -> Result<BlendCompositor> {
        BlendCompositor::import(self.tracking(), importer, folder)
    }
}

impl Drop for FaceTracker {
    fn drop(&mut self) {
        self.close();
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                warn!("network worker panicked");
            }
        }
    }
}

// ── Worker ───────────────────────────────────────────────────────

/// Everything the worker thread owns.
struct Worker {
    info: ConnectionInfo,
    options: ClientOptions,
    tracking: TrackingState,
    phase: Arc<Mutex<ConnectionPhase>>,
    cancel: CancellationToken,
}

impl Worker {
    fn run(self, connected: mpsc::Sender<Result<SocketAddr>>) {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.drive(&connected)),
            Err(e) => {
                let _ = connected.send(Err(FaceLinkError::Worker(e.to_string())));
            }
        }
        lock(&self.phase).force_disconnect();
        debug!("network worker stopped");
    }

    async fn drive(&self, connected: &mpsc::Sender<Result<SocketAddr>>) {
        let established = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FaceLinkError::Cancelled),
            result = establish(&self.info, self.options.connect_timeout) => result,
        };

        let (stream, peer) = match established {
            Ok(ok) => ok,
            Err(e) => {
                warn!(server = %self.info, "connect failed: {e}");
                let _ = connected.send(Err(e));
                return;
            }
        };

        if let Err(e) = lock(&self.phase).complete_connect(peer) {
            let _ = connected.send(Err(e));
            return;
        }
        info!(%peer, "connected to tracking server");
        let _ = connected.send(Ok(peer));

        let codec = FaceLinkCodec::new(self.options.max_block_size);
        let outcome = read_loop(stream, codec, &self.tracking, &self.cancel).await;
        let _ = lock(&self.phase).begin_disconnect();

        match outcome {
            ReadOutcome::Closed => info!(%peer, "connection closed"),
            ReadOutcome::PeerClosed => info!(%peer, "server ended the stream"),
            ReadOutcome::Failed(e) => warn!(%peer, "connection lost: {e}"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
