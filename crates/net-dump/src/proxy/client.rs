//! HTTP client creation and configuration.
//!
//! One client is shared by every mapping; it speaks HTTP/1.1 over plain TCP or
//! TLS depending on the target URI's scheme.

use super::tls::{crypto_provider, NoVerifier};
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE: Duration = Duration::from_secs(60);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 32;

/// Create the shared backend client with connection pooling.
pub fn create_http_client() -> Result<HttpClient, rustls::Error> {
    let mut http_connector = HttpConnector::new();
    http_connector.set_keepalive(Some(KEEPALIVE));
    http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let provider = crypto_provider();
    let tls_config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier::new(provider)))
        .with_no_client_auth();

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build(https_connector);

    debug!(
        "Backend client configured (HTTP/1.1): connect_timeout={}s, idle_timeout={}s",
        CONNECT_TIMEOUT.as_secs(),
        POOL_IDLE_TIMEOUT.as_secs()
    );

    Ok(http_client)
}
