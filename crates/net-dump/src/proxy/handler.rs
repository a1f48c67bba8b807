//! Per-mapping request handling.
//!
//! Each request is buffered whole, rewritten, forwarded, and its buffered
//! response rewritten and recorded before anything goes back to the client.
//! Nothing is streamed in either direction, so a failure can always be
//! answered with a complete 502.

use super::context::ExchangeContext;
use super::forwarding::{BufferedResponse, Forwarder};
use super::headers::{
    response_has_body, strip_accept_encoding, sync_content_length, upstream_headers,
    ResponsePartsExt,
};
use crate::config::ReplaceRule;
use crate::config::Mapping;
use crate::error::{ForwardError, ForwardErrorKind};
use crate::rewrite::rewrite;
use crate::transcript::{CapturedRequest, CapturedResponse, Exchange, TranscriptWriter};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode, Uri};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Handler owned by one mapping's listener.
pub struct MappingHandler {
    mapping: Arc<Mapping>,
    forwarder: Arc<dyn Forwarder>,
    writer: Arc<TranscriptWriter>,
}

impl MappingHandler {
    pub fn new(
        mapping: Arc<Mapping>,
        forwarder: Arc<dyn Forwarder>,
        writer: Arc<TranscriptWriter>,
    ) -> Self {
        Self {
            mapping,
            forwarder,
            writer,
        }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Handle one client request. Every request whose body arrives completely
    /// produces exactly one transcript.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(
                    "[{}] Failed to read request body for {} {}: {}",
                    self.mapping.name, parts.method, parts.uri, e
                );
                return plain_response(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        let mut headers = parts.headers;
        strip_accept_encoding(&mut headers);
        let body = rewrite_body(body, &self.mapping.replace.request, &mut headers);

        let mut ctx = ExchangeContext::begin(
            &self.mapping.name,
            CapturedRequest {
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                headers,
                body,
            },
        );

        ctx.forwarding();
        debug!(mapping = %self.mapping.name, phase = %ctx.phase(), "{} {}", ctx.request().method, ctx.request().uri);

        let outcome = match self.upstream_request(ctx.request()) {
            Ok(upstream) => self.forwarder.forward(upstream).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                ctx.receiving_response();
                self.complete(ctx, response).await
            }
            Err(err) => self.fail(ctx, err).await,
        }
    }

    fn upstream_request(
        &self,
        request: &CapturedRequest,
    ) -> Result<Request<Full<Bytes>>, ForwardError> {
        let path_and_query = request
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let uri: Uri = format!("{}{}", self.mapping.target.base_uri(), path_and_query)
            .parse()
            .map_err(|e| {
                ForwardError::new(ForwardErrorKind::Other, format!("invalid backend URI: {e}"))
            })?;

        let mut upstream = Request::new(Full::new(request.body.clone()));
        *upstream.method_mut() = request.method.clone();
        *upstream.uri_mut() = uri;
        *upstream.headers_mut() = upstream_headers(&request.headers);
        Ok(upstream)
    }

    async fn complete(
        &self,
        ctx: ExchangeContext,
        response: BufferedResponse,
    ) -> Response<Full<Bytes>> {
        let BufferedResponse { mut parts, body } = response;

        // Bodiless responses keep the backend's framing headers untouched.
        let body = if response_has_body(&ctx.request().method, parts.status) {
            rewrite_body(body, &self.mapping.replace.response, &mut parts.headers)
        } else {
            body
        };

        let reason = parts
            .extensions
            .get::<hyper::ext::ReasonPhrase>()
            .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
            .unwrap_or_else(|| parts.status.canonical_reason().unwrap_or("").to_string());

        let exchange = ctx.complete(CapturedResponse {
            version: parts.version,
            status: parts.status,
            reason,
            headers: parts.headers.clone(),
            body: body.clone(),
        });
        self.record(exchange).await;

        Response::from_parts(parts, Full::new(body))
    }

    async fn fail(&self, ctx: ExchangeContext, err: ForwardError) -> Response<Full<Bytes>> {
        let hint = err.hint();
        error!(
            "[proxy error] {} -> {} {} {}",
            self.mapping.name,
            self.mapping.target,
            err.kind.code(),
            hint
        );

        let body = Bytes::from(format!("Bad Gateway: {}{}", err.message, hint));
        let exchange = ctx.fail(CapturedResponse::bad_gateway(body.clone()));
        self.record(exchange).await;

        let (mut parts, ()) = Response::new(()).into_parts();
        parts.status = StatusCode::BAD_GATEWAY;
        parts.set_text_plain();
        Response::from_parts(parts, Full::new(body))
    }

    async fn record(&self, exchange: Exchange) {
        if let Err(e) = self.writer.record_blocking(exchange).await {
            error!("[{}] {}", self.mapping.name, e);
        }
    }
}

/// Apply `rules` and, only when the bytes changed, fix an explicit `Content-Length`.
fn rewrite_body(body: Bytes, rules: &[ReplaceRule], headers: &mut HeaderMap) -> Bytes {
    let rewritten = rewrite(body.clone(), rules);
    if rewritten != body {
        sync_content_length(headers, rewritten.len());
    }
    rewritten
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let (mut parts, ()) = Response::new(()).into_parts();
    parts.status = status;
    parts.set_text_plain();
    Response::from_parts(parts, Full::new(Bytes::from_static(message.as_bytes())))
}
