//! Response envelope returned to callers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::request::MixRequest;
use crate::orchestrator::{ErrorKind, JobReport, PipelineError, StepError};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Status code, headers and JSON body of one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl ApiResponse {
    fn new(status_code: u16, body: Value) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ]);
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// 200 with `body`.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `{"error": message, ...extra}` with `status_code`.
    pub fn error(status_code: u16, message: impl Into<String>, extra: Map<String, Value>) -> Self {
        let mut body = Map::new();
        body.insert("error".into(), Value::String(message.into()));
        body.extend(extra);
        Self::new(status_code, Value::Object(body))
    }

    /// Success body: the request's chunk keys and bucket plus the link.
    pub fn success(request: &MixRequest, report: &JobReport) -> Self {
        Self::ok(json!({
            "chunk_keys": request.chunk_keys,
            "bucket": request.bucket,
            "download_url": report.download_url,
        }))
    }

    /// Map a job failure to its status code and error body.
    pub fn from_error(err: &PipelineError, request: &MixRequest) -> Self {
        let mut extra = Map::new();
        let message = match (err.kind(), err.step_error()) {
            (ErrorKind::Validation, _) => {
                extra.insert("got".into(), Value::Object(request.body.clone()));
                err.detail()
            }
            (_, Some(StepError::MusicNotFound { bucket, key, .. })) => {
                extra.insert("bucket".into(), Value::from(bucket.as_str()));
                extra.insert("key".into(), Value::from(key.as_str()));
                "Could not download music".to_string()
            }
            (_, Some(StepError::Mix(_))) => "Mixing failed".to_string(),
            (_, Some(source)) if err.step_name() == Some("Assemble") => {
                format!("Failed to concatenate narration: {}", source)
            }
            _ => err.detail(),
        };

        if let Some(step) = err.step_name() {
            extra.insert("step".into(), Value::from(step));
        }
        if let Some(diagnostic) = err.diagnostic() {
            extra.insert("ffmpeg_error".into(), Value::from(diagnostic));
        }
        extra.insert("kind".into(), Value::from(err.kind().as_str()));

        Self::error(err.status_code(), message, extra)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Gateway-style envelope: `statusCode`, `headers`, and the body as a
    /// JSON-encoded string.
    pub fn to_envelope(&self) -> Value {
        json!({
            "statusCode": self.status_code,
            "headers": self.headers,
            "body": self.body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::mix::MixFailure;
    use crate::storage::StorageError;

    fn request() -> MixRequest {
        MixRequest::new(vec!["a.mp3".into()], "narr")
    }

    #[test]
    fn every_response_allows_any_origin() {
        let ok = ApiResponse::ok(json!({}));
        let err = ApiResponse::error(500, "boom", Map::new());
        for response in [ok, err] {
            assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
            assert_eq!(response.headers["Content-Type"], CONTENT_TYPE_JSON);
        }
    }

    #[test]
    fn validation_echoes_body() {
        let request = MixRequest::new(vec![], "narr");
        let err = PipelineError::validation_failed("job", crate::api::MISSING_FIELDS);
        let response = ApiResponse::from_error(&err, &request);

        assert_eq!(response.status_code, 400);
        assert_eq!(response.body["error"], "Missing 'chunk_keys' or 'bucket'");
        assert_eq!(response.body["got"]["bucket"], "narr");
    }

    #[test]
    fn music_not_found_is_404_with_location() {
        let err = PipelineError::step_failed(
            "job",
            "FetchMusic",
            StepError::MusicNotFound {
                bucket: "beds".into(),
                key: "calm.mp3".into(),
                source: StorageError::not_found("beds", "calm.mp3"),
            },
        );
        let response = ApiResponse::from_error(&err, &request());
        assert_eq!(response.status_code, 404);
        assert_eq!(response.body["bucket"], "beds");
        assert_eq!(response.body["key"], "calm.mp3");
        assert_eq!(response.body["kind"], "music_not_found");
    }

    #[test]
    fn mix_failure_carries_ffmpeg_error() {
        let err = PipelineError::step_failed(
            "job",
            "Compose",
            StepError::from(MixFailure {
                source: EngineError::failed("ffmpeg", 1, "Invalid filtergraph"),
            }),
        );
        let response = ApiResponse::from_error(&err, &request());
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body["error"], "Mixing failed");
        assert_eq!(response.body["ffmpeg_error"], "Invalid filtergraph");
    }

    #[test]
    fn assemble_failure_mentions_concatenation() {
        let err = PipelineError::step_failed(
            "job",
            "Assemble",
            StepError::fetch("narration chunk 0", StorageError::not_found("narr", "a.mp3")),
        );
        let response = ApiResponse::from_error(&err, &request());
        let message = response.body["error"].as_str().unwrap();
        assert!(message.starts_with("Failed to concatenate narration: "));
        assert_eq!(response.body["step"], "Assemble");
    }

    #[test]
    fn envelope_encodes_body_as_string() {
        let envelope = ApiResponse::ok(json!({"download_url": "file:///x.mp3"})).to_envelope();
        assert_eq!(envelope["statusCode"], 200);
        let body: Value = serde_json::from_str(envelope["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["download_url"], "file:///x.mp3");
    }
}
