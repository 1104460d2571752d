//! Resolve, connect with endpoint fallback, and the persistent read loop.
//!
//! These are the async building blocks the background worker in
//! [`crate::client`] drives on its own single-threaded runtime.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::{lookup_host, TcpStream};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::block::Block;
use crate::codec::FaceLinkCodec;
use crate::error::{FaceLinkError, Result};
use crate::packet::Packet;
use crate::state::TrackingState;

/// Default tracking server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default tracking server port.
pub const DEFAULT_PORT: &str = "33433";

// ── ConnectionInfo ───────────────────────────────────────────────

/// Where the worker should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInfo {
    /// Resolve `host:port`, then try every result in order.
    Host { host: String, port: String },
    /// Try these endpoints in order, without resolution.
    Addrs(Vec<SocketAddr>),
}

impl ConnectionInfo {
    pub fn host(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self::Host {
            host: host.into(),
            port: port.into(),
        }
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self::host(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { host, port } => write!(f, "{host}:{port}"),
            Self::Addrs(addrs) => {
                let list: Vec<String> = addrs.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", list.join(", "))
            }
        }
    }
}

// ── Resolve / connect ────────────────────────────────────────────

/// Resolve `host:port` into candidate endpoints, in resolver order.
pub async fn resolve(host: &str, port: &str) -> Result<Vec<SocketAddr>> {
    let port: u16 = port
        .parse()
        .map_err(|_| FaceLinkError::Other(format!("invalid port: {port:?}")))?;
    let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
    if addrs.is_empty() {
        return Err(FaceLinkError::NoEndpoints(format!("{host}:{port}")));
    }
    debug!(%host, port, candidates = addrs.len(), "resolved tracking server");
    Ok(addrs)
}

/// Try each endpoint in order; return the first that accepts.
pub async fn connect_any(
    addrs: &[SocketAddr],
    timeout: Duration,
) -> Result<(TcpStream, SocketAddr)> {
    let mut last: Option<(SocketAddr, std::io::Error)> = None;

    for &addr in addrs {
        debug!(%addr, "trying endpoint");
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(%addr, "set_nodelay failed: {e}");
                }
                return Ok((stream, addr));
            }
            Ok(Err(e)) => {
                warn!(%addr, "connect failed: {e}");
                last = Some((addr, e));
            }
            Err(_) => {
                warn!(%addr, "connect timed out after {timeout:?}");
                if addrs.len() == 1 {
                    return Err(FaceLinkError::ConnectTimeout { addr, timeout });
                }
                let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
                last = Some((addr, e));
            }
        }
    }

    match last {
        Some((last_addr, last_error)) => Err(FaceLinkError::AllEndpointsFailed {
            attempted: addrs.len(),
            last_addr,
            last_error,
        }),
        None => Err(FaceLinkError::NoEndpoints("empty endpoint list".into())),
    }
}

/// Resolve (if needed) and connect.
pub async fn establish(
    info: &ConnectionInfo,
    timeout: Duration,
) -> Result<(TcpStream, SocketAddr)> {
    match info {
        ConnectionInfo::Host { host, port } => {
            let addrs = resolve(host, port).await?;
            connect_any(&addrs, timeout).await
        }
        ConnectionInfo::Addrs(addrs) => connect_any(addrs, timeout).await,
    }
}

// ── Read loop ────────────────────────────────────────────────────

/// Why the read loop stopped.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `close()` was requested.
    Closed,
    /// The server closed the stream.
    PeerClosed,
    /// A transport or framing error ended the stream.
    Failed(FaceLinkError),
}

/// Apply every block of `packet` to `tracking`, one lock per block.
///
/// Returns the number of blocks applied. On a malformed block the
/// blocks before it stay applied and the rest of the packet is dropped.
pub fn dispatch(packet: &Packet, tracking: &TrackingState) -> Result<usize> {
    let mut applied = 0;
    for block in packet.blocks()? {
        let block = block?;
        if let Block::Unknown(header) = &block {
            trace!(
                block_id = header.block_id,
                size = header.block_size,
                "skipping unknown block"
            );
        }
        tracking.apply(block);
        applied += 1;
    }
    Ok(applied)
}

/// Read and apply packets until cancelled, EOF, or a transport error.
///
/// The stream is dropped (and so closed) on return.
pub async fn read_loop<S>(
    stream: S,
    codec: FaceLinkCodec,
    tracking: &TrackingState,
    cancel: &CancellationToken,
) -> ReadOutcome
where
    S: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(stream, codec);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("close requested, leaving read loop");
                return ReadOutcome::Closed;
            }
            next = framed.next() => match next {
                Some(Ok(packet)) => {
                    if let Err(e) = dispatch(&packet, tracking) {
                        warn!(block_id = packet.header().block_id, "dropping malformed packet: {e}");
                    }
                }
                Some(Err(e)) => {
                    warn!("read failed: {e}");
                    return ReadOutcome::Failed(e);
                }
                None => {
                    info!("tracking server closed the connection");
                    return ReadOutcome::PeerClosed;
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
