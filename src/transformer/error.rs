use crate::artifact::{ArtifactType, ConfigType, PathType};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformerError {
    #[error("Invalid configuration for transformer '{name}': {message}")]
    Config { name: String, message: String },

    #[error("Transformer '{0}' was used before init")]
    NotInitialized(String),

    #[error("Artifact '{artifact}' has no {path_type} path")]
    MissingPath { artifact: String, path_type: PathType },

    #[error("Artifact '{artifact}' has no {config_type} config")]
    MissingConfig {
        artifact: String,
        config_type: ConfigType,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {template}: {message}")]
    Render { template: String, message: String },

    #[error("Failed to write generated output: {0}")]
    Write(String),

    #[error("Transformer task panicked: {0}")]
    Panicked(String),

    #[error("Artifact type {0} is not handled by this transformer")]
    UnsupportedArtifact(ArtifactType),
}

impl TransformerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
