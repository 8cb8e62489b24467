//! Per-artifact outcomes of a `transform` call.
//!
//! A transformer never aborts a whole call because one artifact is malformed:
//! each artifact yields either its outputs or a recorded cause, and the batch
//! carries both.

use super::TransformerError;
use crate::artifact::{Artifact, ArtifactType, PathMapping};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Skipped { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactOutcome {
    pub transformer: String,
    pub service: String,
    pub artifact_type: ArtifactType,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ArtifactOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }
}

/// What one consumed artifact produced.
#[derive(Debug, Default)]
pub struct ArtifactOutput {
    pub path_mappings: Vec<PathMapping>,
    pub created_artifacts: Vec<Artifact>,
}

impl ArtifactOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, mapping: PathMapping) -> Self {
        self.path_mappings.push(mapping);
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.created_artifacts.push(artifact);
        self
    }
}

#[derive(Debug, Default)]
pub struct TransformBatch {
    pub path_mappings: Vec<PathMapping>,
    pub created_artifacts: Vec<Artifact>,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl TransformBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on every artifact in order, isolating failures.
    pub fn collect<F>(transformer: &str, artifacts: &[Artifact], mut f: F) -> Self
    where
        F: FnMut(&Artifact) -> Result<ArtifactOutput, TransformerError>,
    {
        let mut batch = Self::new();
        for artifact in artifacts {
            let result = f(artifact);
            batch.record(transformer, artifact, result);
        }
        batch
    }

    pub fn record(
        &mut self,
        transformer: &str,
        artifact: &Artifact,
        result: Result<ArtifactOutput, TransformerError>,
    ) {
        let status = match result {
            Ok(output) => {
                debug!(
                    transformer,
                    service = %artifact.service_name(),
                    mappings = output.path_mappings.len(),
                    created = output.created_artifacts.len(),
                    "Transformed artifact"
                );
                self.path_mappings.extend(output.path_mappings);
                self.created_artifacts.extend(output.created_artifacts);
                OutcomeStatus::Succeeded
            }
            Err(e) => {
                warn!(
                    transformer,
                    service = %artifact.service_name(),
                    artifact_type = %artifact.artifact_type,
                    error = %e,
                    "Skipping artifact"
                );
                OutcomeStatus::Skipped {
                    cause: e.to_string(),
                }
            }
        };
        self.outcomes.push(ArtifactOutcome {
            transformer: transformer.to_string(),
            service: artifact.service_name().to_string(),
            artifact_type: artifact.artifact_type,
            status,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::PathType;

    #[test]
    fn test_failure_does_not_drop_siblings() {
        let artifacts = vec![
            Artifact::new("a", ArtifactType::JarPackage),
            Artifact::new("b", ArtifactType::JarPackage),
            Artifact::new("c", ArtifactType::JarPackage),
        ];

        let batch = TransformBatch::collect("test", &artifacts, |a| {
            if a.name == "b" {
                return Err(TransformerError::MissingPath {
                    artifact: a.name.clone(),
                    path_type: PathType::ServiceDirectory,
                });
            }
            Ok(ArtifactOutput::new().with_artifact(Artifact::new(&a.name, ArtifactType::Ir)))
        });

        assert_eq!(batch.created_artifacts.len(), 2);
        assert_eq!(batch.outcomes.len(), 3);
        let failed: Vec<_> = batch.failures().map(|o| o.service.as_str()).collect();
        assert_eq!(failed, vec!["b"]);
        assert!(matches!(
            &batch.outcomes[1].status,
            OutcomeStatus::Skipped { cause } if cause.contains("service-directory")
        ));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = ArtifactOutcome {
            transformer: "gradle".to_string(),
            service: "orders".to_string(),
            artifact_type: ArtifactType::GradleBuild,
            status: OutcomeStatus::Skipped {
                cause: "boom".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["cause"], "boom");
        assert_eq!(json["artifactType"], "gradle-build");
    }
}
