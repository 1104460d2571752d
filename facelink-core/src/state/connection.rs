//! Connection lifecycle state machine for the tracking client.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::net::SocketAddr;
use std::time::Instant;

use crate::error::FaceLinkError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the client's server connection.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲                │              │
///       │                ▼              ▼
///       └─────────────────────── Disconnecting
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// Resolving the host or trying candidate endpoints.
    Connecting,

    /// The read loop is running.
    Connected {
        /// Endpoint that accepted the connection.
        peer: SocketAddr,
        /// When the connection entered the `Connected` state.
        since: Instant,
    },

    /// The read loop is unwinding after a close request or an error.
    Disconnecting,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { peer, .. } => write!(f, "Connected to {peer}"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), FaceLinkError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            other => Err(FaceLinkError::AlreadyConnected(other.to_string())),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self, peer: SocketAddr) -> Result<(), FaceLinkError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    peer,
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(FaceLinkError::Other(
                "cannot complete connect: not in Connecting state".into(),
            )),
        }
    }

    /// Transition to `Disconnecting`.
    ///
    /// Valid from: `Connecting`, `Connected`.
    pub fn begin_disconnect(&mut self) -> Result<(), FaceLinkError> {
        match self {
            Self::Connecting | Self::Connected { .. } => {
                *self = Self::Disconnecting;
                Ok(())
            }
            _ => Err(FaceLinkError::Other(
                "cannot disconnect: not in Connecting or Connected state".into(),
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
