//! Per-exchange state carried through a mapping handler.

use crate::transcript::{capture_timestamp, CapturedRequest, CapturedResponse, Exchange};
use std::fmt;

/// Where an exchange is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReceivingRequest,
    Forwarding,
    ReceivingResponse,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ReceivingRequest => "receiving-request",
            Phase::Forwarding => "forwarding",
            Phase::ReceivingResponse => "receiving-response",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Context created once the request body has fully arrived.
///
/// The capture timestamp is fixed here and reused for the transcript name,
/// whichever way the exchange ends.
#[derive(Debug)]
pub struct ExchangeContext {
    mapping: String,
    timestamp: String,
    request: CapturedRequest,
    phase: Phase,
}

impl ExchangeContext {
    pub fn begin(mapping: &str, request: CapturedRequest) -> Self {
        Self::with_timestamp(mapping, capture_timestamp(), request)
    }

    pub fn with_timestamp(mapping: &str, timestamp: String, request: CapturedRequest) -> Self {
        Self {
            mapping: mapping.to_string(),
            timestamp,
            request,
            phase: Phase::ReceivingRequest,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn request(&self) -> &CapturedRequest {
        &self.request
    }

    pub fn forwarding(&mut self) {
        debug_assert_eq!(self.phase, Phase::ReceivingRequest);
        self.phase = Phase::Forwarding;
    }

    pub fn receiving_response(&mut self) {
        debug_assert_eq!(self.phase, Phase::Forwarding);
        self.phase = Phase::ReceivingResponse;
    }

    /// Finish with the backend's (rewritten) response.
    pub fn complete(mut self, response: CapturedResponse) -> Exchange {
        debug_assert_eq!(self.phase, Phase::ReceivingResponse);
        self.phase = Phase::Completed;
        self.into_exchange(response)
    }

    /// Finish with a synthesized error response.
    pub fn fail(mut self, response: CapturedResponse) -> Exchange {
        debug_assert!(matches!(
            self.phase,
            Phase::Forwarding | Phase::ReceivingResponse
        ));
        self.phase = Phase::Failed;
        self.into_exchange(response)
    }

    fn into_exchange(self, response: CapturedResponse) -> Exchange {
        Exchange {
            mapping: self.mapping,
            timestamp: self.timestamp,
            request: self.request,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::header::HeaderMap;
    use hyper::{Method, StatusCode, Version};

    fn request() -> CapturedRequest {
        CapturedRequest {
            method: Method::GET,
            uri: "/a".parse().unwrap(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_success_path_keeps_timestamp() {
        let mut ctx = ExchangeContext::with_timestamp("api", "01:02:03.004".into(), request());
        assert_eq!(ctx.phase(), Phase::ReceivingRequest);
        ctx.forwarding();
        ctx.receiving_response();
        assert_eq!(ctx.phase(), Phase::ReceivingResponse);

        let exchange = ctx.complete(CapturedResponse::bad_gateway(Bytes::new()));
        assert_eq!(exchange.timestamp, "01:02:03.004");
        assert_eq!(exchange.mapping, "api");
    }

    #[test]
    fn test_failure_from_forwarding() {
        let mut ctx = ExchangeContext::with_timestamp("api", "01:02:03.004".into(), request());
        ctx.forwarding();
        let exchange = ctx.fail(CapturedResponse::bad_gateway(Bytes::from_static(b"x")));
        assert_eq!(exchange.response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(exchange.timestamp, "01:02:03.004");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::ReceivingResponse.to_string(), "receiving-response");
    }
}
