//! Proxy module.
//!
//! This module provides the capture proxy:
//! - One listener per mapping, plain or TLS
//! - Whole-body buffering and literal body rewriting
//! - Forwarding to HTTP or HTTPS backends
//! - Transcript recording for every exchange, including synthetic 502s
//!
//! # Module Structure
//!
//! - `server` - ListenerSet and per-mapping accept loops
//! - `handler` - Per-mapping request handling
//! - `context` - Per-exchange state
//! - `forwarding` - Forwarder trait and hyper-backed implementation
//! - `client` - Backend HTTP client creation
//! - `headers` - Header adjustments around forwarding
//! - `tls` - TLS acceptor and backend certificate verifier
//! - `network` - TCP listener creation

mod client;
mod context;
mod forwarding;
mod handler;
mod headers;
mod network;
mod server;
mod tls;

pub use client::{create_http_client, HttpClient};
pub use context::{ExchangeContext, Phase};
pub use forwarding::{BufferedResponse, Forwarder, HyperForwarder};
pub use handler::MappingHandler;
pub use server::{BindPolicy, ListenerSet, RunningListener};
pub use tls::create_tls_acceptor;
