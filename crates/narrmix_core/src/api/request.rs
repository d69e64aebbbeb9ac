//! Request body normalization and validation.

use serde_json::{Map, Value};

use crate::models::NarrationFragmentRef;
use crate::music::MusicRef;
use crate::orchestrator::JobRequest;

/// Message for requests without narration chunks or a bucket.
pub const MISSING_FIELDS: &str = "Missing 'chunk_keys' or 'bucket'";

/// An unvalidated mix request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixRequest {
    pub chunk_keys: Option<Vec<String>>,
    pub bucket: Option<String>,
    pub music: Option<String>,
    /// The object the fields were read from, echoed back on rejection.
    pub body: Map<String, Value>,
}

impl MixRequest {
    pub fn new(chunk_keys: Vec<String>, bucket: impl Into<String>) -> Self {
        let mut request = Self {
            chunk_keys: Some(chunk_keys),
            bucket: Some(bucket.into()),
            ..Self::default()
        };
        request.sync_body();
        request
    }

    pub fn with_music(mut self, music: impl Into<String>) -> Self {
        self.music = Some(music.into());
        self.sync_body();
        self
    }

    /// Read the known fields from a JSON object. Anything of the wrong
    /// type reads as absent.
    pub fn from_object(body: Map<String, Value>) -> Self {
        let chunk_keys = body.get("chunk_keys").and_then(Value::as_array).map(|keys| {
            keys.iter()
                .map(|k| match k {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        });
        let text = |field: &str| body.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            chunk_keys,
            bucket: text("bucket"),
            music: text("music"),
            body,
        }
    }

    /// Check required fields and resolve the music reference.
    ///
    /// An empty `music` string means no music.
    pub fn validate(&self) -> Result<JobRequest, String> {
        let keys = self.chunk_keys.as_deref().unwrap_or_default();
        let bucket = self.bucket.as_deref().unwrap_or_default();
        if keys.is_empty() || bucket.is_empty() {
            return Err(MISSING_FIELDS.to_string());
        }

        let music = match self.music.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                MusicRef::parse(raw)
                    .map_err(|e| format!("Invalid music reference '{}': {}", raw, e))?,
            ),
        };

        Ok(JobRequest {
            fragments: NarrationFragmentRef::from_keys(keys),
            bucket: bucket.to_string(),
            music,
        })
    }

    fn sync_body(&mut self) {
        let mut body = Map::new();
        if let Some(ref keys) = self.chunk_keys {
            body.insert("chunk_keys".into(), Value::from(keys.clone()));
        }
        if let Some(ref bucket) = self.bucket {
            body.insert("bucket".into(), Value::from(bucket.as_str()));
        }
        if let Some(ref music) = self.music {
            body.insert("music".into(), Value::from(music.as_str()));
        }
        self.body = body;
    }
}

/// Normalize a raw request body into a [`MixRequest`].
///
/// Bodies arrive JSON-encoded any number of times, possibly wrapped in an
/// envelope whose `body` field holds the real request as a string.
/// Anything that does not end up as an object is an empty request.
pub fn parse_body(raw: &str) -> MixRequest {
    MixRequest::from_object(unwrap_body(Value::String(raw.to_string())))
}

/// Decode `value` until it stops being a JSON string, then unwrap one
/// string-encoded `body` envelope.
pub fn unwrap_body(mut value: Value) -> Map<String, Value> {
    while let Value::String(ref text) = value {
        match serde_json::from_str::<Value>(text) {
            Ok(decoded) => value = decoded,
            Err(_) => break,
        }
    }

    let Value::Object(object) = value else {
        return Map::new();
    };
    if let Some(Value::String(inner)) = object.get("body") {
        if let Ok(Value::Object(inner)) = serde_json::from_str::<Value>(inner) {
            return inner;
        }
    }
    object
}
