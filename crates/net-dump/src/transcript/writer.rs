//! Transcript persistence: one file per exchange plus an optional index log.

use super::naming::{base_label, TranscriptName};
use super::types::Exchange;
use crate::error::TranscriptError;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Writes transcripts into one request-logs directory.
pub struct TranscriptWriter {
    request_logs: PathBuf,
    main_log: Option<PathBuf>,
}

impl TranscriptWriter {
    pub fn new(request_logs: impl Into<PathBuf>, main_log: Option<PathBuf>) -> Self {
        Self {
            request_logs: request_logs.into(),
            main_log,
        }
    }

    pub fn request_logs(&self) -> &Path {
        &self.request_logs
    }

    pub fn main_log(&self) -> Option<&Path> {
        self.main_log.as_deref()
    }

    /// Create the request-logs directory and the main log's parent directory.
    pub fn prepare(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.request_logs)?;
        if let Some(parent) = self.main_log.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Persist one exchange and return the name its transcript was written under.
    pub fn record(&self, exchange: &Exchange) -> Result<TranscriptName, TranscriptError> {
        let base = base_label(
            &exchange.timestamp,
            &exchange.mapping,
            exchange.request.method.as_str(),
            exchange.request.url_path(),
            exchange.response.status.as_u16(),
        );

        let (name, mut file) = self.claim(&base)?;
        let path = self.request_logs.join(&name.file_name);
        file.write_all(exchange.render().as_bytes())
            .map_err(|source| TranscriptError::Write { path, source })?;

        info!("{}", name.display_name);

        if let Some(main_log) = &self.main_log {
            let line = format!("{} {}\n", name.file_name, exchange.request.url());
            if let Err(e) = append_line(main_log, &line) {
                warn!("Failed to append to main log {:?}: {}", main_log, e);
            }
        }

        Ok(name)
    }

    /// [`record`](Self::record) on the blocking pool.
    pub async fn record_blocking(
        self: &Arc<Self>,
        exchange: Exchange,
    ) -> Result<TranscriptName, TranscriptError> {
        let writer = Arc::clone(self);
        tokio::task::spawn_blocking(move || writer.record(&exchange))
            .await
            .map_err(|e| TranscriptError::Task(e.to_string()))?
    }

    /// Create the first free candidate name. Creation is exclusive, so two
    /// exchanges with the same base label never end up sharing a file.
    fn claim(&self, base: &str) -> Result<(TranscriptName, File), TranscriptError> {
        let mut name = TranscriptName::new(base, None);
        loop {
            let path = self.request_logs.join(&name.file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => name = name.next(base),
                Err(source) => return Err(TranscriptError::Create { path, source }),
            }
        }
    }
}

/// Append `line` with a single write on a file opened in append mode.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{CapturedRequest, CapturedResponse};
    use bytes::Bytes;
    use hyper::header::HeaderMap;
    use hyper::{Method, StatusCode, Version};

    fn exchange(uri: &str, status: StatusCode, body: &'static [u8]) -> Exchange {
        Exchange {
            mapping: "api".to_string(),
            timestamp: "12:00:00.000".to_string(),
            request: CapturedRequest {
                method: Method::GET,
                uri: uri.parse().unwrap(),
                version: Version::HTTP_11,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
            response: CapturedResponse {
                version: Version::HTTP_11,
                status,
                reason: status.canonical_reason().unwrap_or("").to_string(),
                headers: HeaderMap::new(),
                body: Bytes::from_static(body),
            },
        }
    }

    #[test]
    fn test_prepare_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(
            dir.path().join("a/b/requests"),
            Some(dir.path().join("logs/nested/main.log")),
        );
        writer.prepare().unwrap();
        assert!(dir.path().join("a/b/requests").is_dir());
        assert!(dir.path().join("logs/nested").is_dir());
    }

    #[test]
    fn test_record_writes_transcript_and_index_line() {
        let dir = tempfile::tempdir().unwrap();
        let main_log = dir.path().join("main.log");
        let writer = TranscriptWriter::new(dir.path().join("requests"), Some(main_log.clone()));
        writer.prepare().unwrap();

        let name = writer
            .record(&exchange("/users?x=1", StatusCode::OK, br#"{"ok":true}"#))
            .unwrap();
        assert_eq!(name.file_name, "12-00-00.000_api_GET_users_200.txt");
        assert_eq!(name.seq, None);

        let transcript =
            fs::read_to_string(dir.path().join("requests").join(&name.file_name)).unwrap();
        assert!(transcript.starts_with(">>>> REQUEST\nGET /users?x=1 HTTP/1.1\n"));
        assert!(transcript.ends_with("HTTP/1.1 200 OK\n\n\n{\"ok\":true}"));

        let index = fs::read_to_string(&main_log).unwrap();
        assert_eq!(index, "12-00-00.000_api_GET_users_200.txt /users?x=1\n");
    }

    #[test]
    fn test_index_line_keeps_absolute_form_target() {
        let dir = tempfile::tempdir().unwrap();
        let main_log = dir.path().join("main.log");
        let writer = TranscriptWriter::new(dir.path().join("requests"), Some(main_log.clone()));
        writer.prepare().unwrap();

        let name = writer
            .record(&exchange("http://backend:9000/users?x=1", StatusCode::OK, b""))
            .unwrap();
        assert_eq!(name.file_name, "12-00-00.000_api_GET_users_200.txt");
        assert_eq!(
            fs::read_to_string(&main_log).unwrap(),
            format!("{} http://backend:9000/users?x=1\n", name.file_name)
        );
    }

    #[test]
    fn test_collisions_get_sequence_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path(), None);

        let first = writer
            .record(&exchange("/same", StatusCode::OK, b"first"))
            .unwrap();
        let second = writer
            .record(&exchange("/same", StatusCode::OK, b"second"))
            .unwrap();
        let third = writer
            .record(&exchange("/same", StatusCode::OK, b"third"))
            .unwrap();

        assert_eq!(first.file_name, "12-00-00.000_api_GET_same_200.txt");
        assert_eq!(second.file_name, "12-00-00.000_api_GET_same_200 0.txt");
        assert_eq!(third.file_name, "12-00-00.000_api_GET_same_200 1.txt");

        let read = |name: &TranscriptName| fs::read_to_string(dir.path().join(&name.file_name)).unwrap();
        assert!(read(&first).ends_with("first"));
        assert!(read(&second).ends_with("second"));
        assert!(read(&third).ends_with("third"));
    }

    #[test]
    fn test_concurrent_identical_exchanges_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(TranscriptWriter::new(dir.path(), None));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    writer
                        .record(&exchange("/race", StatusCode::OK, b"body"))
                        .unwrap()
                })
            })
            .collect();

        let mut names: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().file_name)
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 16);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 16);
    }

    #[test]
    fn test_main_log_failure_does_not_fail_record() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let writer = TranscriptWriter::new(dir.path().join("requests"), Some(dir.path().to_path_buf()));
        fs::create_dir_all(dir.path().join("requests")).unwrap();

        let name = writer
            .record(&exchange("/x", StatusCode::OK, b""))
            .unwrap();
        assert!(dir.path().join("requests").join(name.file_name).exists());
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path().join("does-not-exist"), None);
        let err = writer
            .record(&exchange("/x", StatusCode::OK, b""))
            .unwrap_err();
        assert!(matches!(err, TranscriptError::Create { .. }));
    }

    #[tokio::test]
    async fn test_record_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(TranscriptWriter::new(dir.path(), None));
        let name = writer
            .record_blocking(exchange("/async", StatusCode::NOT_FOUND, b"nope"))
            .await
            .unwrap();
        assert_eq!(name.file_name, "12-00-00.000_api_GET_async_404.txt");
    }
}
