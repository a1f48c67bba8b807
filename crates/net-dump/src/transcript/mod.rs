//! Exchange capture to disk.
//!
//! Every exchange handled by a mapping, whether answered by the backend or
//! turned into a synthetic 502, produces exactly one transcript file in the
//! request-logs directory and, when configured, one line in the main log.
//!
//! # Module Structure
//!
//! - `types` - Captured request/response/exchange types and rendering
//! - `naming` - File naming and collision sequence
//! - `writer` - Transcript and index log persistence

mod naming;
mod types;
mod writer;

pub use naming::{base_label, TranscriptName};
pub use types::{capture_timestamp, CapturedRequest, CapturedResponse, Exchange};
pub use writer::TranscriptWriter;
