use super::render::{render, RenderError};
use crate::artifact::{PathMapping, PathMappingKind};
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Destination {0} escapes the output directory")]
    UnsafeDestination(PathBuf),

    #[error("Source {0} does not exist")]
    MissingSource(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render {template}: {source}")]
    Render {
        template: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub destination: PathBuf,
    pub cause: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub mappings_written: usize,
    pub files_written: usize,
    pub failures: Vec<WriteFailure>,
}

/// Applies path mappings below an output root.
///
/// Mappings are written in order, so a later mapping to the same destination
/// overwrites an earlier one. A failing mapping is logged and recorded; the
/// rest of the plan is still written.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_root: PathBuf,
    skip: Vec<PathBuf>,
}

impl OutputWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            skip: Vec::new(),
        }
    }

    /// Directories never copied by a copy mapping, typically the output root
    /// itself when it lives inside the source tree.
    pub fn skipping(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip.push(path.into());
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn write_plan(&self, mappings: &[PathMapping]) -> WriteSummary {
        let mut summary = WriteSummary::default();

        if let Err(e) = std::fs::create_dir_all(&self.output_root) {
            warn!(output = %self.output_root.display(), error = %e, "Cannot create output directory");
            summary.failures = mappings
                .iter()
                .map(|m| WriteFailure {
                    destination: m.destination_path.clone(),
                    cause: e.to_string(),
                })
                .collect();
            return summary;
        }
        let skip = self.resolved_skip();

        for mapping in mappings {
            match self.write_mapping(mapping, &skip) {
                Ok(files) => {
                    debug!(
                        destination = %mapping.destination_path.display(),
                        files,
                        "Wrote mapping"
                    );
                    summary.mappings_written += 1;
                    summary.files_written += files;
                }
                Err(e) => {
                    warn!(
                        destination = %mapping.destination_path.display(),
                        error = %e,
                        "Dropping path mapping"
                    );
                    summary.failures.push(WriteFailure {
                        destination: mapping.destination_path.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        info!(
            mappings = summary.mappings_written,
            files = summary.files_written,
            failed = summary.failures.len(),
            "Output written"
        );
        summary
    }

    fn resolved_skip(&self) -> Vec<PathBuf> {
        std::iter::once(&self.output_root)
            .chain(self.skip.iter())
            .filter_map(|p| p.canonicalize().ok())
            .collect()
    }

    fn write_mapping(&self, mapping: &PathMapping, skip: &[PathBuf]) -> Result<usize, OutputError> {
        let destination = self.resolve_destination(&mapping.destination_path)?;
        if !mapping.source_path.exists() {
            return Err(OutputError::MissingSource(mapping.source_path.clone()));
        }

        match mapping.kind {
            PathMappingKind::Copy if mapping.source_path.is_dir() => stage(&destination, |staging| {
                copy_tree(&mapping.source_path, staging, skip)
            }),
            PathMappingKind::Copy => stage(&destination, |staging| {
                std::fs::copy(&mapping.source_path, staging).map_err(io_error(&mapping.source_path))?;
                Ok(1)
            }),
            PathMappingKind::Template => {
                let template = std::fs::read_to_string(&mapping.source_path)
                    .map_err(io_error(&mapping.source_path))?;
                let binding = mapping.template_binding.clone().unwrap_or(Value::Null);
                let rendered = render(&template, &binding).map_err(|source| OutputError::Render {
                    template: mapping.source_path.clone(),
                    source,
                })?;
                stage(&destination, |staging| {
                    std::fs::write(staging, rendered).map_err(io_error(staging))?;
                    Ok(1)
                })
            }
        }
    }

    fn resolve_destination(&self, destination: &Path) -> Result<PathBuf, OutputError> {
        let escapes = destination
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(OutputError::UnsafeDestination(destination.to_path_buf()));
        }
        Ok(self.output_root.join(destination))
    }
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent).map_err(io_error(parent)),
        None => Ok(()),
    }
}

/// Produces `destination` through a staging sibling that is moved into place
/// only when `produce` succeeds. On failure nothing is left behind.
fn stage<F>(destination: &Path, produce: F) -> Result<usize, OutputError>
where
    F: FnOnce(&Path) -> Result<usize, OutputError>,
{
    ensure_parent(destination)?;
    let staging = staging_path(destination);
    let result = produce(&staging).and_then(|files| {
        move_into_place(&staging, destination)?;
        Ok(files)
    });
    discard(&staging);
    result
}

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    destination.with_file_name(format!(".{}.partial-{}", name, Uuid::new_v4().simple()))
}

fn discard(path: &Path) {
    let removed = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        return;
    };
    if let Err(e) = removed {
        warn!(path = %path.display(), error = %e, "Failed to remove staging path");
    }
}

/// Moves a staged file or tree to `destination`. A staged tree is merged into
/// an existing directory, replacing files of the same name.
fn move_into_place(staging: &Path, destination: &Path) -> Result<(), OutputError> {
    if staging.is_file() || !destination.is_dir() {
        replace(staging, destination)?;
        return Ok(());
    }

    let entries = WalkDir::new(staging)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| OutputError::Walk {
            path: staging.to_path_buf(),
            source,
        })?;
    for entry in entries {
        let relative = entry.path().strip_prefix(staging).unwrap_or(entry.path());
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            if target.is_file() {
                std::fs::remove_file(&target).map_err(io_error(&target))?;
            }
            std::fs::create_dir_all(&target).map_err(io_error(&target))?;
        } else {
            replace(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn replace(from: &Path, to: &Path) -> Result<(), OutputError> {
    if to.is_dir() {
        std::fs::remove_dir_all(to).map_err(io_error(to))?;
    } else if to.exists() {
        std::fs::remove_file(to).map_err(io_error(to))?;
    }
    std::fs::rename(from, to).map_err(io_error(to))
}

fn copy_tree(source: &Path, destination: &Path, skip: &[PathBuf]) -> Result<usize, OutputError> {
    let root = source.canonicalize().map_err(io_error(source))?;
    let mut files = 0;

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !skip.iter().any(|s| entry.path().starts_with(s)));

    for entry in walker {
        let entry = entry.map_err(|source| OutputError::Walk {
            path: root.clone(),
            source,
        })?;
        let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io_error(&target))?;
        } else if entry.file_type().is_file() {
            ensure_parent(&target)?;
            std::fs::copy(entry.path(), &target).map_err(io_error(entry.path()))?;
            files += 1;
        }
    }
    Ok(files)
}
