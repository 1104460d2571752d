//! Monitor configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use facelink_core::{ClientOptions, DEFAULT_HOST, DEFAULT_PORT};

/// Top-level configuration for the monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tracking server to connect to.
    pub network: NetworkConfig,
    /// What `watch` prints and how often.
    pub display: DisplayConfig,
    /// Synthetic server settings.
    pub simulate: SimulateConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port (numeric or service name, passed to the resolver).
    pub port: String,
    /// Per-endpoint connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Print interval in milliseconds.
    pub refresh_ms: u64,
    /// Include blendshape weights in each line.
    pub show_blendshapes: bool,
    /// Print one JSON snapshot per tick instead of text.
    pub json: bool,
}

/// Synthetic server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateConfig {
    /// Address to listen on.
    pub bind: String,
    /// Frames per second sent to each client.
    pub fps: u32,
    /// Number of blendshape weights per frame.
    pub blendshapes: usize,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT.into(),
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            show_blendshapes: false,
            json: false,
        }
    }
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            bind: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            fps: 30,
            blendshapes: facelink_core::NUM_BLENDSHAPE_NAMES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl MonitorConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Client options derived from the network section.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            ..ClientOptions::default()
        }
    }
}

impl DisplayConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }
}

// ── Tests ────────────────────────────────────────────────────────
