//! Error types shared across net-dump.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to load TLS material for mapping '{mapping}' from '{path}': {source}")]
    TlsMaterial {
        mapping: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while starting a mapping's listener.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("Mapping '{mapping}': cannot resolve listen address {interface}:{port}: {reason}")]
    Resolve {
        mapping: String,
        interface: String,
        port: u16,
        reason: String,
    },
    #[error("Mapping '{mapping}': failed to bind {addr}: {source}")]
    Bind {
        mapping: String,
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Mapping '{mapping}': invalid TLS material: {reason}")]
    Tls { mapping: String, reason: String },
    #[error("No listener could be started")]
    NothingStarted,
}

/// Errors raised while persisting a transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Failed to create transcript '{path}': {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write transcript '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Transcript writer task failed: {0}")]
    Task(String),
}

/// Transport-level failure classes when talking to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardErrorKind {
    ConnectionRefused,
    ConnectionReset,
    BrokenPipe,
    /// Backend closed the connection before a complete response arrived
    PrematureClose,
    TimedOut,
    Other,
}

impl ForwardErrorKind {
    /// Short errno-style code used in operator logs.
    pub fn code(&self) -> &'static str {
        match self {
            ForwardErrorKind::ConnectionRefused => "ECONNREFUSED",
            ForwardErrorKind::ConnectionReset => "ECONNRESET",
            ForwardErrorKind::BrokenPipe => "EPIPE",
            ForwardErrorKind::PrematureClose => "EPREMATURE",
            ForwardErrorKind::TimedOut => "ETIMEDOUT",
            ForwardErrorKind::Other => "EUNKNOWN",
        }
    }

    /// Failures that typically mean a plain-HTTP request hit a TLS-only backend.
    pub fn backend_closed(&self) -> bool {
        matches!(
            self,
            ForwardErrorKind::ConnectionReset
                | ForwardErrorKind::BrokenPipe
                | ForwardErrorKind::PrematureClose
        )
    }
}

const BACKEND_CLOSED_HINT: &str =
    " (Backend closed connection. If backend requires HTTPS, set \"out.https\": true in config)";

/// A forwarding attempt that produced no usable backend response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ForwardError {
    pub kind: ForwardErrorKind,
    pub message: String,
}

impl ForwardError {
    pub fn new(kind: ForwardErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify an error by walking its source chain.
    pub fn classify(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut kind = ForwardErrorKind::Other;
        let mut messages = Vec::new();
        let mut current = Some(err);

        while let Some(e) = current {
            messages.push(e.to_string());
            if kind == ForwardErrorKind::Other {
                kind = classify_one(e);
            }
            current = e.source();
        }

        Self::new(kind, messages.join(": "))
    }

    /// Operator hint appended to the 502 body, empty when none applies.
    pub fn hint(&self) -> &'static str {
        if self.kind.backend_closed() {
            BACKEND_CLOSED_HINT
        } else {
            ""
        }
    }
}

fn classify_one(e: &(dyn std::error::Error + 'static)) -> ForwardErrorKind {
    use std::io::ErrorKind;

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return match io.kind() {
            ErrorKind::ConnectionRefused => ForwardErrorKind::ConnectionRefused,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                ForwardErrorKind::ConnectionReset
            }
            ErrorKind::BrokenPipe => ForwardErrorKind::BrokenPipe,
            ErrorKind::UnexpectedEof => ForwardErrorKind::PrematureClose,
            ErrorKind::TimedOut => ForwardErrorKind::TimedOut,
            _ => ForwardErrorKind::Other,
        };
    }
    if let Some(h) = e.downcast_ref::<hyper::Error>() {
        if h.is_incomplete_message() || h.is_closed() {
            return ForwardErrorKind::PrematureClose;
        }
        if h.is_timeout() {
            return ForwardErrorKind::TimedOut;
        }
    }
    ForwardErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("client error (Connect)")]
    struct Wrapper(#[source] std::io::Error);

    #[test]
    fn test_classify_walks_source_chain() {
        let err = Wrapper(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused",
        ));
        let fe = ForwardError::classify(&err);
        assert_eq!(fe.kind, ForwardErrorKind::ConnectionRefused);
        assert_eq!(fe.kind.code(), "ECONNREFUSED");
        assert_eq!(fe.message, "client error (Connect): Connection refused");
        assert_eq!(fe.hint(), "");
    }

    #[test]
    fn test_backend_closed_kinds_carry_hint() {
        for kind in [
            std::io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::UnexpectedEof,
        ] {
            let fe = ForwardError::classify(&std::io::Error::new(kind, "closed"));
            assert!(fe.kind.backend_closed(), "{kind:?}");
            assert!(fe.hint().contains("\"out.https\": true"));
        }
    }

    #[test]
    fn test_unknown_errors_are_other() {
        let fe = ForwardError::classify(&std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "weird",
        ));
        assert_eq!(fe.kind, ForwardErrorKind::Other);
        assert_eq!(fe.kind.code(), "EUNKNOWN");
    }
}
