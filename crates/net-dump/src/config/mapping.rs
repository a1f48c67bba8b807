//! Mapping configuration and its resolved runtime form.

use super::listen::{InConfig, ListenSpec, TlsMaterial};
use super::rules::ReplaceConfig;
use super::upstream::{OutConfig, Target};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One `mappings[]` entry of the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub inbound: InConfig,
    #[serde(rename = "out")]
    pub outbound: OutConfig,
    #[serde(default)]
    pub replace: ReplaceConfig,
}

impl MappingConfig {
    /// Configured name, or `<inPort>-><outPort>`.
    pub fn effective_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}->{}", self.inbound.port, self.outbound.port))
    }

    /// Resolve into a runtime [`Mapping`], reading TLS material relative to `base_dir`.
    pub fn resolve(&self, base_dir: &Path) -> Result<Mapping, ConfigError> {
        let name = self.effective_name();

        let tls = match &self.inbound.ssl {
            Some(ssl) => {
                let read = |relative: &Path| {
                    let path = base_dir.join(relative);
                    std::fs::read(&path).map_err(|source| ConfigError::TlsMaterial {
                        mapping: name.clone(),
                        path,
                        source,
                    })
                };
                Some(TlsMaterial {
                    key: read(&ssl.key)?,
                    cert: read(&ssl.cert)?,
                })
            }
            None => None,
        };

        Ok(Mapping {
            name,
            listen: ListenSpec {
                interface: self.inbound.interface.clone(),
                port: self.inbound.port,
                tls,
            },
            target: Target {
                host: self.outbound.host.clone(),
                port: self.outbound.port,
                https: self.outbound.https,
            },
            replace: self.replace.clone(),
        })
    }
}

/// A route from one listen port to one backend. Immutable once started.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub name: String,
    pub listen: ListenSpec,
    pub target: Target,
    pub replace: ReplaceConfig,
}

impl Mapping {
    /// Plain HTTP mapping without rewrite rules.
    pub fn new(
        name: impl Into<String>,
        interface: impl Into<String>,
        listen_port: u16,
        target: Target,
    ) -> Self {
        Self {
            name: name.into(),
            listen: ListenSpec {
                interface: interface.into(),
                port: listen_port,
                tls: None,
            },
            target,
            replace: ReplaceConfig::default(),
        }
    }

    pub fn with_replace(mut self, replace: ReplaceConfig) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.listen.tls = Some(tls);
        self
    }
}
