//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SocketConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Handshake deadline and socket options.
    pub handshake: HandshakeConfig,

    /// Certificate material.
    pub tls: TlsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8443".to_string(),
            max_connections: 1_024,
        }
    }
}

/// Handshake configuration applied to every connection of an endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Handshake deadline in milliseconds.
    pub timeout_ms: u64,

    /// Disable Nagle's algorithm before the handshake starts.
    pub nodelay: bool,
}

impl HandshakeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            nodelay: true,
        }
    }
}

/// TLS material. Server role needs `cert_path` and `key_path`; client role
/// needs `ca_path`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM).
    pub cert_path: Option<String>,

    /// Path to private key (PEM).
    pub key_path: Option<String>,

    /// Path to trusted CA certificates (PEM).
    pub ca_path: Option<String>,

    /// Name the client verifies the server certificate against.
    pub server_name: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
