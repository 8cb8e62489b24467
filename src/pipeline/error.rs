use crate::environment::EnvironmentError;
use crate::qa::QaError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run. Everything scoped to one transformer, directory,
/// artifact or mapping is recorded in the run report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("Failed to read pipeline config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse pipeline config{}: {source}", .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    ConfigParse {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("No fixpoint after {rounds} rounds; still pending: {pending}")]
    CycleDetected { rounds: usize, pending: String },

    #[error("Transformer task '{name}' panicked: {message}")]
    TaskPanicked { name: String, message: String },

    #[error(transparent)]
    Qa(#[from] QaError),
}
