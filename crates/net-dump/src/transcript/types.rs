//! Captured exchange types and their text rendering.

use bytes::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, StatusCode, Uri, Version};

/// Request half of an exchange, as received from the client.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    /// Target exactly as received (path and query)
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedRequest {
    /// Request target as received, as written to the index log.
    /// Absolute-form targets (`http://host/x`) are kept whole.
    pub fn url(&self) -> String {
        if self.uri.scheme().is_some() {
            return self.uri.to_string();
        }
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| self.uri.to_string())
    }

    /// Path without query string and without its leading `/`.
    pub fn url_path(&self) -> &str {
        let path = self.uri.path();
        path.strip_prefix('/').unwrap_or(path)
    }
}

/// Response half of an exchange: either the backend's response or a synthesized error.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub version: Version,
    pub status: StatusCode,
    /// Reason phrase as sent by the backend
    pub reason: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedResponse {
    /// Synthesized `502 Bad Gateway` with no headers.
    pub fn bad_gateway(body: Bytes) -> Self {
        Self {
            version: Version::HTTP_11,
            status: StatusCode::BAD_GATEWAY,
            reason: "Bad Gateway".to_string(),
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}",
            version_str(self.version),
            self.status.as_u16(),
            self.reason
        )
    }
}

/// One request paired with its outcome.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub mapping: String,
    /// `HH:MM:SS.mmm`, taken when the request body finished arriving
    pub timestamp: String,
    pub request: CapturedRequest,
    pub response: CapturedResponse,
}

impl Exchange {
    /// Full transcript text.
    pub fn render(&self) -> String {
        let req = &self.request;
        let res = &self.response;
        let request_line = format!(
            "{} {} {}",
            req.method,
            req.url(),
            version_str(req.version)
        );

        format!(
            ">>>> REQUEST\n{}\n{}\n\n{}\n\n------------------------\n\n<<<< RESPONSE\n{}\n{}\n\n{}",
            request_line,
            header_lines(&req.headers),
            String::from_utf8_lossy(&req.body),
            res.status_line(),
            header_lines(&res.headers),
            String::from_utf8_lossy(&res.body),
        )
    }
}

/// Current time of day as `HH:MM:SS.mmm` (UTC).
pub fn capture_timestamp() -> String {
    chrono::Utc::now().format("%H:%M:%S%.3f").to_string()
}

pub(crate) fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_2 {
        "HTTP/2"
    } else if version == Version::HTTP_3 {
        "HTTP/3"
    } else {
        "HTTP/1.1"
    }
}

fn header_lines(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}: {}",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
