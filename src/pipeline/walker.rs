//! Recursive detection walk.
//!
//! Every directory under the source root is offered to every active
//! transformer. Directories are processed concurrently, but results are merged
//! in lexical directory order and then transformer registration order, so the
//! merged mapping is identical across runs.

use crate::artifact::{Artifact, PathType, ServiceConfig};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::transformer::{ActiveTransformer, DetectedServices, TransformerError};
use crate::util::{make_container_name_compliant, name_from_directory};
use futures_util::stream::{self, StreamExt};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-directory ignore file, gitignore syntax.
pub const IGNORE_FILE: &str = ".kubeshiftignore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFailure {
    pub transformer: String,
    pub directory: PathBuf,
    pub cause: String,
}

/// Merged output of the walk.
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    /// Artifacts keyed by service name, in contribution order.
    pub services: BTreeMap<String, Vec<Artifact>>,
    /// Artifacts whose detector could not name a service.
    pub unnamed: Vec<Artifact>,
    pub failures: Vec<DetectionFailure>,
    pub directories: usize,
}

impl DetectionResult {
    pub fn artifact_count(&self) -> usize {
        self.services.values().map(Vec::len).sum::<usize>() + self.unnamed.len()
    }

    /// Appends one detector's output under the container-name compliant form
    /// of each service name. Contributions under an existing name are added
    /// after the earlier ones.
    pub fn absorb(&mut self, detected: DetectedServices) {
        for (name, artifacts) in detected {
            if name.is_empty() {
                self.unnamed.extend(artifacts);
                continue;
            }
            let key = make_container_name_compliant(&name);
            let entry = self.services.entry(key.clone()).or_default();
            if let Some(other) = entry
                .iter()
                .map(|a| a.name.as_str())
                .find(|n| !n.is_empty() && *n != name)
            {
                warn!(service = %key, first = %other, second = %name, "Distinct service names fold into one service");
            }
            entry.extend(artifacts);
        }
    }

    /// Names every unnamed artifact after its service directory, made
    /// container-name compliant, and files it under that name.
    ///
    /// An artifact joins an existing service only when that service already
    /// holds an artifact from the same directory. Otherwise a taken name is
    /// widened with the directory's path below `source_root` (`b/app` becomes
    /// `b-app`), then suffixed with `-2`, `-3`, ... until it is free.
    pub fn resolve_unnamed(&mut self, source_root: &Path) {
        for mut artifact in std::mem::take(&mut self.unnamed) {
            let dir = artifact_dir(&artifact).unwrap_or_else(|| source_root.to_path_buf());
            let name = self.claim_name(&dir, source_root);
            debug!(dir = %dir.display(), service = %name, "Named unnamed artifact after its directory");
            artifact.name = name.clone();
            self.services.entry(name).or_default().push(artifact);
        }
    }

    fn claim_name(&self, dir: &Path, source_root: &Path) -> String {
        let available = |name: &str| match self.services.get(name) {
            None => true,
            Some(artifacts) => artifacts
                .iter()
                .any(|a| artifact_dir(a).as_deref() == Some(dir)),
        };

        let base = name_from_directory(dir);
        if available(&base) {
            return base;
        }

        let widened = dir
            .strip_prefix(source_root)
            .ok()
            .map(|rel| rel.to_string_lossy().to_string())
            .filter(|rel| !rel.is_empty())
            .map(|rel| make_container_name_compliant(&rel))
            .unwrap_or_else(|| base.clone());
        if widened != base && available(&widened) {
            warn!(dir = %dir.display(), taken = %base, service = %widened, "Service name already taken by another directory");
            return widened;
        }

        let mut suffix = 2;
        loop {
            let candidate = format!("{}-{}", widened, suffix);
            if available(&candidate) {
                warn!(dir = %dir.display(), taken = %base, service = %candidate, "Service name already taken by another directory");
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Stamps each artifact with its resolved service name, the same name
    /// that keys the returned map.
    pub fn into_services(self) -> BTreeMap<String, Vec<Artifact>> {
        self.services
            .into_iter()
            .map(|(name, artifacts)| {
                let artifacts = artifacts
                    .into_iter()
                    .map(|mut artifact| {
                        if artifact.name.is_empty() {
                            artifact.name = name.clone();
                        }
                        artifact.set_config(ServiceConfig {
                            service_name: name.clone(),
                        });
                        artifact
                    })
                    .collect();
                (name, artifacts)
            })
            .collect()
    }

    /// The scheduler's initial pending set, in service order.
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.into_services().into_values().flatten().collect()
    }
}

/// Directory an artifact was detected in: its service directory, else the
/// parent of its first recorded path.
fn artifact_dir(artifact: &Artifact) -> Option<PathBuf> {
    artifact
        .first_path(PathType::ServiceDirectory)
        .map(Path::to_path_buf)
        .or_else(|| {
            artifact
                .paths
                .values()
                .flatten()
                .next()
                .and_then(|p| p.parent())
                .map(Path::to_path_buf)
        })
}

/// Every directory under `root` in lexical path order, honoring `.gitignore`
/// and `.kubeshiftignore`. Hidden directories and anything under `skip` are
/// left out.
pub fn directories(root: &Path, skip: &[PathBuf]) -> Vec<PathBuf> {
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .parents(false)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(IGNORE_FILE)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| !skip.iter().any(|s| entry.path().starts_with(s)))
        .build();

    let mut dirs = Vec::new();
    for result in walker {
        match result {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_dir()) => {
                dirs.push(entry.into_path());
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Failed to read directory entry"),
        }
    }
    dirs.sort();
    dirs
}

type DirectoryDetections = Vec<(String, Result<DetectedServices, TransformerError>)>;

fn detect_directory(dir: &Path, transformers: &[ActiveTransformer]) -> DirectoryDetections {
    transformers
        .iter()
        .map(|t| (t.name.clone(), t.inner.directory_detect(dir)))
        .collect()
}

/// Runs every transformer's detector over every directory under `root`.
pub async fn detect(
    root: &Path,
    transformers: &[ActiveTransformer],
    skip: &[PathBuf],
    progress: &dyn ProgressHandler,
) -> DetectionResult {
    let start = Instant::now();
    let dirs = directories(root, skip);
    let parallelism = std::thread::available_parallelism().map_or(4, |n| n.get());
    debug!(directories = dirs.len(), parallelism, "Walking source tree");

    // `buffered` yields in input order, which keeps the merge lexical.
    let per_directory: Vec<(PathBuf, DirectoryDetections)> = stream::iter(dirs.iter().cloned())
        .map(|dir| {
            let transformers = transformers.to_vec();
            async move {
                let task_dir = dir.clone();
                let detections =
                    tokio::task::spawn_blocking(move || detect_directory(&task_dir, &transformers))
                        .await
                        .unwrap_or_else(|e| {
                            vec![("walker".to_string(), Err(TransformerError::Panicked(e.to_string())))]
                        });
                (dir, detections)
            }
        })
        .buffered(parallelism)
        .collect()
        .await;

    let mut result = DetectionResult {
        directories: dirs.len(),
        ..Default::default()
    };
    for (dir, detections) in per_directory {
        for (transformer, outcome) in detections {
            match outcome {
                Ok(detected) => result.absorb(detected),
                Err(e) => {
                    progress.on_progress(&ProgressEvent::DetectionFailed {
                        transformer: transformer.clone(),
                        directory: dir.display().to_string(),
                        error: e.to_string(),
                    });
                    result.failures.push(DetectionFailure {
                        transformer,
                        directory: dir.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        directories = result.directories,
        services = result.services.len(),
        unnamed = result.unnamed.len(),
        failures = result.failures.len(),
        "Walk complete"
    );
    progress.on_progress(&ProgressEvent::DetectionComplete {
        directories: result.directories,
        services: result.services.len(),
        artifacts: result.artifact_count(),
        duration: start.elapsed(),
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactType;
    use tempfile::TempDir;

    fn mkdir(root: &Path, rel: &str) {
        std::fs::create_dir_all(root.join(rel)).unwrap();
    }

    #[test]
    fn test_directories_lexical_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in ["b/inner", "a", ".git/objects", "ignored/deep", "out/x"] {
            mkdir(root, rel);
        }
        std::fs::write(root.join(IGNORE_FILE), "ignored/\n").unwrap();

        let dirs = directories(root, &[root.join("out")]);
        let root = root.canonicalize().unwrap();
        let rel: Vec<_> = dirs
            .iter()
            .map(|d| d.strip_prefix(&root).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(rel, vec!["", "a", "b", "b/inner"]);
    }

    #[test]
    fn test_absorb_appends_under_same_name() {
        let mut result = DetectionResult::default();
        let mut first = DetectedServices::new();
        first.insert("api".into(), vec![Artifact::new("api", ArtifactType::MavenBuild)]);
        let mut second = DetectedServices::new();
        second.insert("api".into(), vec![Artifact::new("api", ArtifactType::GradleBuild)]);
        second.insert(String::new(), vec![Artifact::new("", ArtifactType::GradleBuild)]);

        result.absorb(first);
        result.absorb(second);

        let types: Vec<_> = result.services["api"].iter().map(|a| a.artifact_type).collect();
        assert_eq!(types, vec![ArtifactType::MavenBuild, ArtifactType::GradleBuild]);
        assert_eq!(result.unnamed.len(), 1);
        assert_eq!(result.artifact_count(), 3);
    }

    #[test]
    fn test_unnamed_resolved_from_directory() {
        let mut result = DetectionResult::default();
        result.services.insert(
            "billing-api".into(),
            vec![Artifact::new("billing-api", ArtifactType::MavenBuild)
                .with_path(PathType::ServiceDirectory, "/src/Billing_API")],
        );
        result.unnamed.push(
            Artifact::new("", ArtifactType::GradleBuild)
                .with_path(PathType::ServiceDirectory, "/src/Billing_API"),
        );
        result.unnamed.push(
            Artifact::new("", ArtifactType::GradleBuild)
                .with_path(PathType::GradleBuildFile, "/src/worker/build.gradle"),
        );

        result.resolve_unnamed(Path::new("/src"));
        assert!(result.unnamed.is_empty());
        assert_eq!(result.services["billing-api"].len(), 2);
        assert_eq!(result.services["worker"][0].name, "worker");

        let artifacts = result.into_artifacts();
        assert!(artifacts
            .iter()
            .all(|a| a.config::<ServiceConfig>().is_some_and(|s| s.service_name == a.name)));
    }

    #[test]
    fn test_same_basename_in_different_directories_stays_apart() {
        let mut result = DetectionResult::default();
        for dir in ["/src/a/app", "/src/b/app", "/src/c/b/app"] {
            result.unnamed.push(
                Artifact::new("", ArtifactType::GradleBuild).with_path(PathType::ServiceDirectory, dir),
            );
        }
        // A second detector in the same directory joins its service.
        result.unnamed.push(
            Artifact::new("", ArtifactType::MavenBuild).with_path(PathType::ServiceDirectory, "/src/b/app"),
        );

        result.resolve_unnamed(Path::new("/src"));
        let names: Vec<_> = result.services.keys().cloned().collect();
        assert_eq!(names, vec!["app", "b-app", "c-b-app"]);
        assert_eq!(result.services["app"].len(), 1);
        assert_eq!(result.services["b-app"].len(), 2);
    }

    #[test]
    fn test_numeric_suffix_when_widened_name_is_taken() {
        let mut result = DetectionResult::default();
        result.services.insert(
            "a-app".into(),
            vec![Artifact::new("a-app", ArtifactType::MavenBuild)
                .with_path(PathType::ServiceDirectory, "/src/elsewhere")],
        );
        result.services.insert(
            "app".into(),
            vec![Artifact::new("app", ArtifactType::MavenBuild)
                .with_path(PathType::ServiceDirectory, "/src/app")],
        );
        result.unnamed.push(
            Artifact::new("", ArtifactType::GradleBuild).with_path(PathType::ServiceDirectory, "/src/a/app"),
        );

        result.resolve_unnamed(Path::new("/src"));
        assert_eq!(result.services["a-app-2"][0].name, "a-app-2");
    }

    #[test]
    fn test_names_differing_in_case_share_one_key() {
        let mut result = DetectionResult::default();
        let mut upper = DetectedServices::new();
        upper.insert("Orders".into(), vec![Artifact::new("Orders", ArtifactType::MavenBuild)]);
        let mut lower = DetectedServices::new();
        lower.insert("orders".into(), vec![Artifact::new("orders", ArtifactType::GradleBuild)]);

        result.absorb(upper);
        result.absorb(lower);

        let services = result.into_services();
        assert_eq!(services.keys().collect::<Vec<_>>(), vec!["orders"]);
        assert!(services["orders"]
            .iter()
            .all(|a| a.config::<ServiceConfig>().is_some_and(|s| s.service_name == "orders")));
    }
}
