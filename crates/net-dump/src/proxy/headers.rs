//! Header adjustments applied around forwarding.

use hyper::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use hyper::http::response::Parts;
use hyper::{Method, StatusCode};

pub static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain");

/// Remove `Accept-Encoding` so the backend answers with an uncompressed body.
pub fn strip_accept_encoding(headers: &mut HeaderMap) {
    headers.remove(ACCEPT_ENCODING);
}

/// Headers sent to the backend: everything but `Host`, which the client
/// derives from the target URI.
pub fn upstream_headers(headers: &HeaderMap) -> HeaderMap {
    let mut upstream = headers.clone();
    upstream.remove(HOST);
    upstream
}

/// Rewrite an explicit `Content-Length` to `len`. Absent headers stay absent.
pub fn sync_content_length(headers: &mut HeaderMap, len: usize) {
    if headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
}

/// Whether a response to `method` with `status` carries a body at all.
/// HEAD answers and 1xx/204/304 may advertise a length they never send.
pub fn response_has_body(method: &Method, status: StatusCode) -> bool {
    !(*method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Extension trait for response parts built by the proxy.
pub trait ResponsePartsExt {
    fn set_text_plain(&mut self);
}

impl ResponsePartsExt for Parts {
    fn set_text_plain(&mut self) {
        self.headers.insert(CONTENT_TYPE, TEXT_PLAIN.clone());
    }
}
