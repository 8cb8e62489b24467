//! Execution environment handed to every transformer.
//!
//! A run owns one scratch root; each transformer instance receives its own
//! subdirectory of it, so concurrent transformers never write to the same place.

use crate::qa::QaResolver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const TEMPLATES_DIR_NAME: &str = "templates";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "Dockerfile.license",
        include_str!("../templates/Dockerfile.license"),
    ),
    (
        "Dockerfile.gradle-build",
        include_str!("../templates/Dockerfile.gradle-build"),
    ),
    (
        "Dockerfile.maven-build",
        include_str!("../templates/Dockerfile.maven-build"),
    ),
    (
        "Dockerfile.jar-runtime",
        include_str!("../templates/Dockerfile.jar-runtime"),
    ),
    (
        "Dockerfile.war-runtime",
        include_str!("../templates/Dockerfile.war-runtime"),
    ),
    (
        "Dockerfile.ear-runtime",
        include_str!("../templates/Dockerfile.ear-runtime"),
    ),
    (
        "java-versions.yaml",
        include_str!("../templates/java-versions.yaml"),
    ),
];

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Source root does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct Environment {
    source_root: PathBuf,
    scratch_root: PathBuf,
    scratch_path: PathBuf,
    templates_root: PathBuf,
    qa: Arc<dyn QaResolver>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("source_root", &self.source_root)
            .field("scratch_path", &self.scratch_path)
            .field("templates_root", &self.templates_root)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Creates a run environment with a fresh scratch root under the system
    /// temp directory and the built-in templates materialized inside it.
    pub fn new(source_root: &Path, qa: Arc<dyn QaResolver>) -> Result<Self, EnvironmentError> {
        let scratch_root =
            std::env::temp_dir().join(format!("kubeshift-{}", uuid::Uuid::new_v4()));
        Self::with_scratch_root(source_root, &scratch_root, qa)
    }

    pub fn with_scratch_root(
        source_root: &Path,
        scratch_root: &Path,
        qa: Arc<dyn QaResolver>,
    ) -> Result<Self, EnvironmentError> {
        if !source_root.is_dir() {
            return Err(EnvironmentError::SourceNotFound(source_root.to_path_buf()));
        }
        create_dir(scratch_root)?;

        let templates_root = scratch_root.join(TEMPLATES_DIR_NAME);
        create_dir(&templates_root)?;
        for (name, content) in BUILTIN_TEMPLATES {
            let path = templates_root.join(name);
            std::fs::write(&path, content)
                .map_err(|source| EnvironmentError::Io { path, source })?;
        }
        debug!(
            scratch = %scratch_root.display(),
            templates = BUILTIN_TEMPLATES.len(),
            "Prepared run environment"
        );

        Ok(Self {
            source_root: source_root.to_path_buf(),
            scratch_root: scratch_root.to_path_buf(),
            scratch_path: scratch_root.to_path_buf(),
            templates_root,
            qa,
        })
    }

    /// Overlays templates from a user-supplied directory. Templates missing
    /// from it are still served from the built-in set.
    pub fn with_templates_override(self, dir: &Path) -> Result<Self, EnvironmentError> {
        if !dir.is_dir() {
            return Err(EnvironmentError::SourceNotFound(dir.to_path_buf()));
        }
        for (name, _) in BUILTIN_TEMPLATES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                let target = self.templates_root.join(name);
                std::fs::copy(&candidate, &target).map_err(|source| EnvironmentError::Io {
                    path: candidate.clone(),
                    source,
                })?;
            }
        }
        Ok(self)
    }

    /// Environment for one transformer instance, scoped to its own scratch
    /// subdirectory.
    pub fn for_transformer(&self, name: &str) -> Result<Self, EnvironmentError> {
        let scratch_path = self.scratch_root.join("transformers").join(name);
        create_dir(&scratch_path)?;
        Ok(Self {
            scratch_path,
            ..self.clone()
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    pub fn templates_root(&self) -> &Path {
        &self.templates_root
    }

    pub fn qa(&self) -> &dyn QaResolver {
        self.qa.as_ref()
    }

    pub fn read_template(&self, name: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.templates_root.join(name))
    }

    /// Path of `path` relative to the source root, or the path itself when it
    /// lies outside the source tree.
    pub fn relative_to_source(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Removes the run's scratch root.
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.scratch_root) {
            warn!(path = %self.scratch_root.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

fn create_dir(path: &Path) -> Result<(), EnvironmentError> {
    std::fs::create_dir_all(path).map_err(|source| EnvironmentError::Io {
        path: path.to_path_buf(),
        source,
    })
}
