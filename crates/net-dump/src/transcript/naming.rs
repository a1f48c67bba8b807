//! Transcript file naming.
//!
//! A transcript is named after its exchange:
//! `<time> <mapping> <method> <path> <status>`, with whitespace turned into `_`
//! and the characters `/ \ ? * : | "` turned into `-`. When `<base>.txt` is
//! taken, `<base> 0.txt`, `<base> 1.txt`, ... are tried in order.

/// Build the file-system safe base label of a transcript.
pub fn base_label(
    timestamp: &str,
    mapping: &str,
    method: &str,
    url_path: &str,
    status: u16,
) -> String {
    format!("{timestamp} {mapping} {method} {url_path} {status}")
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '/' | '\\' | '?' | '*' | ':' | '|' | '"' => '-',
            c => c,
        })
        .collect()
}

/// Name of one transcript file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptName {
    /// `<base>.txt` or `<base> <seq>.txt`
    pub file_name: String,
    /// File name without the `.txt` extension
    pub display_name: String,
    /// Disambiguation sequence, set only after a collision
    pub seq: Option<u32>,
}

impl TranscriptName {
    pub fn new(base: &str, seq: Option<u32>) -> Self {
        let display_name = match seq {
            Some(seq) => format!("{base} {seq}"),
            None => base.to_string(),
        };
        Self {
            file_name: format!("{display_name}.txt"),
            display_name,
            seq,
        }
    }

    /// Candidate tried after this one collided.
    pub fn next(&self, base: &str) -> Self {
        Self::new(base, Some(self.seq.map_or(0, |seq| seq + 1)))
    }
}
