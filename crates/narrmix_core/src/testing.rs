//! Test doubles for the engine and storage seams.
//!
//! `FakeEngine` stands in for ffmpeg: every "audio" file it writes holds
//! its duration as text, so probing is exact and each operation's effect
//! on duration is easy to assert.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{
    EncodeProfile, EngineError, EngineResult, FilterGraph, MediaEngine, ProbeFailure, RetimeMode,
};
use crate::models::{AudioAsset, SilenceSpec};
use crate::storage::{ObjectStore, StorageError, StorageResult};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Probe(PathBuf),
    Silence(f64),
    Concat(Vec<PathBuf>),
    Filter { inputs: Vec<PathBuf>, graph: FilterGraph },
    Retime { target: f64, mode: RetimeMode },
}

impl EngineCall {
    pub fn operation(&self) -> &'static str {
        match self {
            EngineCall::Probe(_) => "probe",
            EngineCall::Silence(_) => "silence",
            EngineCall::Concat(_) => "concat",
            EngineCall::Filter { .. } => "filter",
            EngineCall::Retime { .. } => "retime",
        }
    }
}

/// Deterministic in-process engine.
#[derive(Debug, Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    failing: HashSet<&'static str>,
    unreachable: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of `operation` ("silence", "concat", "filter",
    /// "retime") with a processing error.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Fail every non-probe call as if the engine could not be started.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Write a fake audio file of `seconds`.
    pub fn write_audio(&self, path: &Path, seconds: f64) {
        fs::write(path, seconds.to_string()).unwrap();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Calls excluding probes.
    pub fn work_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, EngineCall::Probe(_)))
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub fn filter_graphs(&self) -> Vec<FilterGraph> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Filter { graph, .. } => Some(graph.clone()),
                _ => None,
            })
            .collect()
    }

    fn begin(&self, call: EngineCall) -> EngineResult<()> {
        let operation = call.operation();
        self.calls.lock().push(call);
        if self.unreachable {
            return Err(EngineError::unreachable(
                "fake-ffmpeg",
                std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            ));
        }
        if self.failing.contains(operation) {
            return Err(EngineError::failed(
                "fake-ffmpeg",
                1,
                format!("injected {} failure", operation),
            ));
        }
        Ok(())
    }

    fn read(path: &Path) -> Option<f64> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    fn emit(&self, output: &Path, seconds: f64) -> EngineResult<AudioAsset> {
        fs::write(output, seconds.to_string()).map_err(|e| EngineError::io("fake write", e))?;
        Ok(AudioAsset::new(output))
    }
}

impl MediaEngine for FakeEngine {
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeFailure> {
        self.calls.lock().push(EngineCall::Probe(path.to_path_buf()));
        Self::read(path).ok_or_else(|| ProbeFailure::new(path, "unreadable fake audio"))
    }

    fn synthesize_silence(&self, spec: SilenceSpec, output: &Path) -> EngineResult<AudioAsset> {
        self.begin(EngineCall::Silence(spec.duration_seconds()))?;
        let mut asset = self.emit(output, spec.duration_seconds())?;
        asset.set_duration(spec.duration_seconds());
        Ok(asset)
    }

    fn concatenate(
        &self,
        assets: &[AudioAsset],
        _profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        self.begin(EngineCall::Concat(
            assets.iter().map(|a| a.path().to_path_buf()).collect(),
        ))?;
        let total: f64 = assets.iter().filter_map(|a| Self::read(a.path())).sum();
        self.emit(output, total)
    }

    fn apply_filter_graph(
        &self,
        inputs: &[&AudioAsset],
        graph: &FilterGraph,
        _profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        self.begin(EngineCall::Filter {
            inputs: inputs.iter().map(|a| a.path().to_path_buf()).collect(),
            graph: graph.clone(),
        })?;
        let durations: Vec<f64> = inputs
            .iter()
            .map(|a| Self::read(a.path()).unwrap_or(0.0))
            .collect();
        let seconds = if graph.spec().contains("concat=") {
            durations.iter().sum()
        } else {
            // Single-input chains and `amix=...:duration=first` follow input 0.
            durations.first().copied().unwrap_or(0.0)
        };
        self.emit(output, seconds)
    }

    fn retime(
        &self,
        input: &AudioAsset,
        target_seconds: f64,
        mode: RetimeMode,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        self.begin(EngineCall::Retime {
            target: target_seconds,
            mode,
        })?;
        let source = Self::read(input.path()).unwrap_or(0.0);
        let seconds = match mode {
            RetimeMode::Loop if source > 0.0 => target_seconds,
            RetimeMode::Loop => 0.0,
            RetimeMode::Trim => source.min(target_seconds),
        };
        self.emit(output, seconds)
    }
}

/// In-memory buckets with call counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing_downloads: Mutex<HashSet<String>>,
    fail_uploads: bool,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    presigns: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload fail.
    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), bytes.into());
    }

    /// Store a fake audio object of `seconds`.
    pub fn put_audio(&self, bucket: &str, key: &str, seconds: f64) {
        self.put(bucket, key, seconds.to_string());
    }

    /// Make downloads of `key` fail with an I/O error.
    pub fn fail_download(&self, key: &str) {
        self.failing_downloads.lock().insert(key.to_string());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys stored in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn presigns(&self) -> usize {
        self.presigns.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.downloads() + self.uploads() + self.presigns()
    }
}

impl ObjectStore for MemoryStore {
    fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing_downloads.lock().contains(key) {
            return Err(StorageError::io(
                bucket,
                key,
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            ));
        }
        let bytes = self
            .get(bucket, key)
            .ok_or_else(|| StorageError::not_found(bucket, key))?;
        fs::write(dest, bytes).map_err(|e| StorageError::io(bucket, key, e))
    }

    fn upload(&self, bucket: &str, key: &str, source: &Path) -> StorageResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(StorageError::io(
                bucket,
                key,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            ));
        }
        let bytes = fs::read(source).map_err(|e| StorageError::io(bucket, key, e))?;
        self.put(bucket, key, bytes);
        Ok(())
    }

    fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<String> {
        self.presigns.fetch_add(1, Ordering::SeqCst);
        if self.get(bucket, key).is_none() {
            return Err(StorageError::not_found(bucket, key));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}
