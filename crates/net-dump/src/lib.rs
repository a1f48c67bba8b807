//! net-dump: a capture proxy that relays HTTP/HTTPS traffic to backends and
//! writes a readable transcript of every request/response pair to disk.

pub mod config;
pub mod error;
pub mod proxy;
pub mod rewrite;
pub mod transcript;

pub use config::{Config, Mapping};
pub use error::{BindError, ConfigError, ForwardError, ForwardErrorKind, TranscriptError};
pub use proxy::{BindPolicy, ListenerSet, MappingHandler};
pub use transcript::{Exchange, TranscriptWriter};
