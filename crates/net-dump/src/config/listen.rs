//! Listen-side (`in`) and TLS configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TLS material for an HTTPS listener, as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SslConfig {
    /// Path to the private key (PEM), relative to the config file's directory
    pub key: PathBuf,
    /// Path to the certificate chain (PEM), relative to the config file's directory
    pub cert: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InConfig {
    pub port: u16,
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Terminate TLS on this listener when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslConfig>,
}

fn default_interface() -> String {
    "0.0.0.0".to_string()
}

/// TLS key and certificate bytes loaded from disk.
#[derive(Clone)]
pub struct TlsMaterial {
    pub key: Vec<u8>,
    pub cert: Vec<u8>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("cert", &format_args!("<{} bytes>", self.cert.len()))
            .finish()
    }
}

/// Resolved listen side of a mapping.
#[derive(Debug, Clone)]
pub struct ListenSpec {
    pub interface: String,
    pub port: u16,
    pub tls: Option<TlsMaterial>,
}
