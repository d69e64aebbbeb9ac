//! Job and step failures, and how they classify for the response.
//!
//! A [`PipelineError`] names the job and the step; the [`StepError`]
//! inside it names the operation and keeps the underlying storage or
//! engine error as its source.

use serde::Serialize;
use thiserror::Error;

use crate::assembly::AssemblyError;
use crate::engine::EngineError;
use crate::mix::MixFailure;
use crate::storage::StorageError;

/// Failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required request fields are missing or malformed.
    Validation,
    /// A narration chunk could not be downloaded.
    Fetch,
    /// The requested music bed could not be downloaded.
    MusicNotFound,
    /// The engine could not be run to completion.
    EngineInvocation,
    /// The engine ran but failed to filter or encode.
    Processing,
    /// The final mix failed.
    Mix,
    /// Upload or link generation failed.
    Publish,
    /// The job could not be set up (configuration, scratch space).
    Setup,
}

impl ErrorKind {
    /// HTTP-style status code for this class.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::MusicNotFound => 404,
            _ => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Fetch => "fetch",
            ErrorKind::MusicNotFound => "music_not_found",
            ErrorKind::EngineInvocation => "engine_invocation",
            ErrorKind::Processing => "processing",
            ErrorKind::Mix => "mix",
            ErrorKind::Publish => "publish",
            ErrorKind::Setup => "setup",
        }
    }
}

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The request was rejected before the pipeline started.
    #[error("Job '{job_name}' failed validation: {message}")]
    ValidationFailed { job_name: String, message: String },

    /// Failed to set up the job (configuration, scratch directory).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn validation_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StepFailed { source, .. } => source.kind(),
            Self::ValidationFailed { .. } => ErrorKind::Validation,
            Self::SetupFailed { .. } => ErrorKind::Setup,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Name of the failing step, if a step failed.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_name, .. } => Some(step_name),
            _ => None,
        }
    }

    /// The step error, if a step failed.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Engine diagnostic text attached to the failure.
    pub fn diagnostic(&self) -> Option<&str> {
        self.step_error().and_then(StepError::diagnostic)
    }

    /// The message without job context.
    pub fn detail(&self) -> String {
        match self {
            Self::StepFailed { source, .. } => source.to_string(),
            Self::ValidationFailed { message, .. } | Self::SetupFailed { message, .. } => {
                message.clone()
            }
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// A narration chunk was rejected under strict chunk handling.
    #[error("Chunk {index} ({key}) is {reason}")]
    InvalidChunk {
        index: usize,
        key: String,
        reason: String,
    },

    /// Downloading narration failed.
    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: StorageError,
    },

    /// Downloading the music bed failed.
    #[error("Could not download music {bucket}/{key}: {source}")]
    MusicNotFound {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// An engine operation failed.
    #[error("Failed to {operation}: {source}")]
    Engine {
        operation: String,
        #[source]
        source: EngineError,
    },

    /// The final mix failed.
    #[error(transparent)]
    Mix(#[from] MixFailure),

    /// Uploading or presigning the result failed.
    #[error("Failed to {operation}: {source}")]
    Publish {
        operation: String,
        #[source]
        source: StorageError,
    },
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn fetch(what: impl Into<String>, source: StorageError) -> Self {
        Self::Fetch {
            what: what.into(),
            source,
        }
    }

    pub fn engine(operation: impl Into<String>, source: EngineError) -> Self {
        Self::Engine {
            operation: operation.into(),
            source,
        }
    }

    pub fn publish(operation: impl Into<String>, source: StorageError) -> Self {
        Self::Publish {
            operation: operation.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::MusicNotFound { .. } => ErrorKind::MusicNotFound,
            Self::Engine { source, .. } if source.is_invocation() => ErrorKind::EngineInvocation,
            Self::Mix(failure) if failure.source.is_invocation() => ErrorKind::EngineInvocation,
            Self::Mix(_) => ErrorKind::Mix,
            Self::Publish { .. } => ErrorKind::Publish,
            Self::Engine { .. }
            | Self::InvalidInput(_)
            | Self::InvalidOutput(_)
            | Self::InvalidChunk { .. } => ErrorKind::Processing,
        }
    }

    /// Engine diagnostic text, if the engine reported any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Engine { source, .. } => source.diagnostic(),
            Self::Mix(failure) => failure.source.diagnostic(),
            _ => None,
        }
    }
}

impl From<AssemblyError> for StepError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::NoFragments => Self::invalid_input("no narration fragments"),
            AssemblyError::InvalidChunk { index, key, reason } => {
                Self::InvalidChunk { index, key, reason }
            }
            AssemblyError::Engine { operation, source } => Self::engine(operation, source),
            AssemblyError::MissingOutput(path) => Self::invalid_output(format!(
                "concatenated narration does not exist at {}",
                path.display()
            )),
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
