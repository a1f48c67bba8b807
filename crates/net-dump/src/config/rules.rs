//! Body rewrite rule configuration.

use serde::{Deserialize, Serialize};

/// A literal substring replacement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplaceRule {
    pub from: String,
    pub to: String,
}

impl ReplaceRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Independent rule lists for request and response bodies, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplaceConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request: Vec<ReplaceRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response: Vec<ReplaceRule>,
}
