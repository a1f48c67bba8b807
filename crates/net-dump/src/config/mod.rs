//! Configuration types for net-dump.

mod listen;
mod mapping;
mod rules;
mod upstream;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use listen::{InConfig, ListenSpec, SslConfig, TlsMaterial};
pub use mapping::{Mapping, MappingConfig};
pub use rules::{ReplaceConfig, ReplaceRule};
pub use upstream::{OutConfig, Target};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Shared index log, one line per exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_log: Option<PathBuf>,

    /// Directory receiving one transcript file per exchange
    #[serde(default = "default_request_logs")]
    pub request_logs: PathBuf,

    /// Stop startup when any mapping fails to bind instead of skipping it
    #[serde(default)]
    pub abort_on_bind_error: bool,

    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

fn default_request_logs() -> PathBuf {
    PathBuf::from("./requests")
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mappings.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one entry in 'mappings' is required".to_string(),
            ));
        }

        for mapping in &self.mappings {
            let name = mapping.effective_name();
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "mapping on port {} has an empty name",
                    mapping.inbound.port
                )));
            }
            if mapping.outbound.host.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "mapping '{name}': 'out.host' must not be empty"
                )));
            }
            if mapping.outbound.port == 0 {
                return Err(ConfigError::Invalid(format!(
                    "mapping '{name}': 'out.port' must be non-zero"
                )));
            }
        }

        Ok(())
    }

    /// Resolve every mapping, loading TLS material relative to `base_dir`.
    pub fn resolve_mappings(&self, base_dir: &Path) -> Result<Vec<Mapping>, ConfigError> {
        self.mappings.iter().map(|m| m.resolve(base_dir)).collect()
    }
}

/// Directory that relative paths inside the config file are resolved against.
pub fn config_dir(config_path: &Path) -> PathBuf {
    let absolute = std::path::absolute(config_path).unwrap_or_else(|_| config_path.to_path_buf());
    absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
