//! Backend (`out`) configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Force HTTPS towards the backend
    #[serde(default)]
    pub https: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

/// Resolved backend of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub https: bool,
}

impl Target {
    /// `https` when forced by config or when the backend listens on 443.
    pub fn scheme(&self) -> &'static str {
        if self.https || self.port == 443 {
            "https"
        } else {
            "http"
        }
    }

    /// Base URI of the backend, without a path.
    pub fn base_uri(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(port: u16, https: bool) -> Target {
        Target {
            host: "backend".to_string(),
            port,
            https,
        }
    }

    #[test]
    fn test_scheme_defaults_to_http() {
        assert_eq!(target(9000, false).scheme(), "http");
    }

    #[test]
    fn test_scheme_forced_https() {
        assert_eq!(target(9000, true).scheme(), "https");
        assert_eq!(target(9000, true).base_uri(), "https://backend:9000");
    }

    #[test]
    fn test_scheme_port_443_implies_https() {
        assert_eq!(target(443, false).scheme(), "https");
    }

    #[test]
    fn test_display() {
        assert_eq!(target(8000, false).to_string(), "backend:8000");
    }
}
