//! Request boundary: normalize a raw body, run the job, shape the reply.

mod request;
mod response;

pub use request::{parse_body, unwrap_body, MixRequest, MISSING_FIELDS};
pub use response::{ApiResponse, CONTENT_TYPE_JSON};

use crate::logging::{LogLevel, LogSinkExt};
use crate::models::new_job_id;
use crate::orchestrator::MixJob;

/// Run one raw request body through `job`. Never fails: every error
/// becomes a response.
pub fn handle(job: &MixJob, raw_body: &str) -> ApiResponse {
    respond(job, &new_job_id(), &parse_body(raw_body))
}

/// Run an already parsed request through `job` as `job_id`.
pub fn respond(job: &MixJob, job_id: &str, request: &MixRequest) -> ApiResponse {
    let log = job.log();
    let response = match job.run_with_id(job_id, request) {
        Ok(report) => ApiResponse::success(request, &report),
        Err(err) => {
            log.error(&err.to_string());
            ApiResponse::from_error(&err, request)
        }
    };

    let level = if response.is_success() {
        LogLevel::Info
    } else {
        LogLevel::Error
    };
    log.event(
        level,
        "response",
        &format!("[RESPONSE {}] {}", response.status_code, response.body),
        &[("status", response.status_code.to_string())],
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::MemorySink;
    use crate::testing::{FakeEngine, MemoryStore};
    use std::sync::Arc;

    fn job(dir: &std::path::Path, store: Arc<MemoryStore>, log: Arc<MemorySink>) -> MixJob {
        let mut settings = Settings::default();
        settings.paths.temp_root = dir.to_string_lossy().into_owned();
        settings.storage.output_bucket = "out".into();
        MixJob::new(settings, Arc::new(FakeEngine::new()), store, log)
    }

    #[test]
    fn handle_success_returns_link() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.put_audio("narr", "a.mp3", 2.0);
        let log = Arc::new(MemorySink::new());

        let response = handle(
            &job(dir.path(), store, log.clone()),
            r#"{"chunk_keys":["a.mp3"],"bucket":"narr"}"#,
        );

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["bucket"], "narr");
        assert_eq!(response.body["chunk_keys"][0], "a.mp3");
        assert!(response.body["download_url"]
            .as_str()
            .unwrap()
            .starts_with("memory://out/mixed/"));
        assert!(log.contains("[RESPONSE 200]"));
    }

    #[test]
    fn handle_garbage_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(MemorySink::new());

        let response = handle(&job(dir.path(), store.clone(), log.clone()), "<xml/>");
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body["got"], serde_json::json!({}));
        assert_eq!(store.total_calls(), 0);
        assert_eq!(log.events("response").len(), 1);
    }
}
