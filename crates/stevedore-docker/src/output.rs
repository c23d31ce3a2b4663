//! Build and push progress logs
//!
//! The engine reports build and push progress as a stream of JSON messages.
//! Every message is kept as one JSON line; the final line decides success.
//! A final line carrying `error` (or `errorDetail.message`) fails the whole
//! operation while still handing back everything received.

use bollard::models::{BuildInfo, PushImageInfo};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DockerError, Result};

/// Error message shape used by the engine on progress streams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLine {
    #[serde(default)]
    pub error: String,

    #[serde(default, rename = "errorDetail")]
    pub error_detail: ErrorDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}

impl ErrorLine {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: message.clone(),
            error_detail: ErrorDetail { message },
        }
    }

    /// The reported error, if the line carries one
    pub fn message(&self) -> Option<&str> {
        if !self.error.is_empty() {
            Some(&self.error)
        } else if !self.error_detail.message.is_empty() {
            Some(&self.error_detail.message)
        } else {
            None
        }
    }
}

fn put(line: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        line.insert(key.to_string(), Value::String(value));
    }
}

/// JSON line for one build message, keeping only the fields that are set
pub fn build_info_line(info: BuildInfo) -> Value {
    let mut line = Map::new();
    put(&mut line, "id", info.id);
    put(&mut line, "stream", info.stream);
    put(&mut line, "status", info.status);
    put(&mut line, "progress", info.progress);
    put(&mut line, "error", info.error);
    if let Some(message) = info.error_detail.and_then(|detail| detail.message) {
        let mut detail = Map::new();
        detail.insert("message".to_string(), Value::String(message));
        line.insert("errorDetail".to_string(), Value::Object(detail));
    }
    Value::Object(line)
}

/// JSON line for one push message, keeping only the fields that are set
pub fn push_info_line(info: PushImageInfo) -> Value {
    let mut line = Map::new();
    put(&mut line, "status", info.status);
    put(&mut line, "progress", info.progress);
    put(&mut line, "error", info.error);
    Value::Object(line)
}

/// Accumulated progress log of one build or push
#[derive(Debug, Default)]
pub struct StreamLog {
    buffer: String,
    last_line: String,
}

impl StreamLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw line
    pub fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.last_line = line.to_string();
    }

    /// Append one progress message as a JSON line
    pub fn push<T: Serialize>(&mut self, item: &T) -> Result<()> {
        let line = serde_json::to_string(item)?;
        self.push_line(&line);
        Ok(())
    }

    /// Record a failure as a final error line
    pub fn push_error(&mut self, message: &str) -> Result<()> {
        self.push(&ErrorLine::new(message))
    }

    /// Drain a progress stream, rendering each message with `to_line`
    ///
    /// A transport error ends the stream as an error line.
    pub async fn consume<S, T, F>(&mut self, stream: S, mut to_line: F) -> Result<()>
    where
        S: Stream<Item = std::result::Result<T, bollard::errors::Error>>,
        F: FnMut(T) -> Value,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(message) => self.push(&to_line(message))?,
                Err(e) => {
                    tracing::debug!(error = %e, "progress stream failed");
                    self.push_error(&e.to_string())?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Everything received so far
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Return the log, or fail if the last line reports an error
    pub fn finish(self) -> Result<String> {
        let last: ErrorLine = serde_json::from_str(&self.last_line).unwrap_or_default();
        match last.message() {
            Some(message) => Err(DockerError::StreamFailed {
                message: message.to_string(),
                output: self.buffer,
            }),
            None => Ok(self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    #[test]
    fn test_clean_log_is_returned() {
        let mut log = StreamLog::new();
        log.push(&json!({ "stream": "Step 1/2 : FROM alpine\n" })).unwrap();
        log.push(&json!({ "stream": "Successfully built 1234\n" })).unwrap();

        let output = log.finish().unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("Successfully built"));
    }

    #[test]
    fn test_error_on_last_line_fails_with_log() {
        let mut log = StreamLog::new();
        log.push(&json!({ "stream": "Step 1/2 : FROM alpine\n" })).unwrap();
        log.push_line(r#"{"errorDetail":{"message":"pull access denied"},"error":"pull access denied"}"#);

        match log.finish() {
            Err(DockerError::StreamFailed { message, output }) => {
                assert_eq!(message, "pull access denied");
                assert!(output.starts_with(r#"{"stream":"Step 1/2 : FROM alpine\n"}"#));
                assert_eq!(output.lines().count(), 2);
            }
            other => panic!("expected StreamFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_error_detail_alone_counts() {
        let mut log = StreamLog::new();
        log.push_line(r#"{"errorDetail":{"message":"disk full"}}"#);
        let err = log.finish().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_earlier_errors_are_ignored() {
        let mut log = StreamLog::new();
        log.push_line(r#"{"error":"transient"}"#);
        log.push_line(r#"{"status":"done"}"#);
        assert!(log.finish().is_ok());
    }

    #[test]
    fn test_non_json_last_line_is_not_an_error() {
        let mut log = StreamLog::new();
        log.push_line("plain text");
        assert_eq!(log.finish().unwrap(), "plain text\n");
        assert_eq!(StreamLog::new().finish().unwrap(), "");
    }

    #[tokio::test]
    async fn test_transport_error_becomes_final_error_line() {
        let items: Vec<std::result::Result<serde_json::Value, bollard::errors::Error>> = vec![
            Ok(json!({ "status": "Preparing" })),
            Err(bollard::errors::Error::RequestTimeoutError),
            Ok(json!({ "status": "never seen" })),
        ];

        let mut log = StreamLog::new();
        log.consume(stream::iter(items), |line| line).await.unwrap();
        assert!(!log.as_str().contains("never seen"));

        let err = log.finish().unwrap_err();
        assert!(matches!(err, DockerError::StreamFailed { .. }));
        assert_eq!(err.output().unwrap().lines().count(), 2);
    }

    #[test]
    fn test_build_info_line_skips_unset_fields() {
        let info = BuildInfo {
            stream: Some("Step 1/2 : FROM alpine\n".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_info_line(info),
            json!({ "stream": "Step 1/2 : FROM alpine\n" })
        );
    }

    #[test]
    fn test_build_info_line_error_is_detected() {
        let info = BuildInfo {
            error_detail: Some(bollard::models::ErrorDetail {
                message: Some("no such file".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut log = StreamLog::new();
        log.push(&build_info_line(info)).unwrap();
        assert_eq!(log.finish().unwrap_err().to_string(), "no such file");
    }

    #[test]
    fn test_push_info_line() {
        let info = PushImageInfo {
            status: Some("Pushed".to_string()),
            ..Default::default()
        };
        assert_eq!(push_info_line(info), json!({ "status": "Pushed" }));
    }
}
