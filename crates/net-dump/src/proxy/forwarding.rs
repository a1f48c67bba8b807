//! Request forwarding to backends.
//!
//! A [`Forwarder`] takes a fully buffered outbound request and reports either
//! a fully buffered backend response or a classified transport failure.

use super::client::{create_http_client, HttpClient};
use crate::error::ForwardError;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::http::response::Parts;
use hyper::Request;
use tracing::debug;

/// Backend response with its whole body read.
#[derive(Debug)]
pub struct BufferedResponse {
    pub parts: Parts,
    pub body: Bytes,
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Full<Bytes>>)
        -> Result<BufferedResponse, ForwardError>;
}

/// [`Forwarder`] backed by the shared hyper client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: HttpClient,
}

impl HyperForwarder {
    pub fn new() -> Result<Self, rustls::Error> {
        Ok(Self {
            client: create_http_client()?,
        })
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Forwarder for HyperForwarder {
    async fn forward(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<BufferedResponse, ForwardError> {
        debug!("Forwarding to: {}", request.uri());

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ForwardError::classify(&e))?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ForwardError::classify(&e))?
            .to_bytes();

        Ok(BufferedResponse { parts, body })
    }
}
