use super::{ArtifactOutput, TransformBatch, TransformerError};
use crate::artifact::{Artifact, ArtifactType, ConfigType};
use crate::ir::{preprocess, Ir};

/// IR assembled from every IR artifact a generator has received so far.
pub(crate) struct MergedIr<'a> {
    pub ir: Ir,
    pub accepted: Vec<&'a Artifact>,
    pub batch: TransformBatch,
}

impl MergedIr<'_> {
    /// Records the outcome of the generator's write step for every accepted
    /// artifact.
    pub fn finish(
        mut self,
        transformer: &str,
        result: Result<ArtifactOutput, TransformerError>,
    ) -> TransformBatch {
        match result {
            Ok(output) => {
                self.batch.path_mappings.extend(output.path_mappings);
                self.batch.created_artifacts.extend(output.created_artifacts);
                for artifact in self.accepted {
                    self.batch.record(transformer, artifact, Ok(ArtifactOutput::new()));
                }
            }
            Err(e) => {
                let cause = e.to_string();
                for artifact in self.accepted {
                    self.batch
                        .record(transformer, artifact, Err(TransformerError::Write(cause.clone())));
                }
            }
        }
        self.batch
    }
}

/// Merges IR artifacts seen in earlier rounds with the new ones and
/// preprocesses the result. New artifacts without an IR payload are recorded
/// as skipped.
pub(crate) fn merge_ir<'a>(
    transformer: &str,
    new_artifacts: &'a [Artifact],
    seen: &[Artifact],
) -> MergedIr<'a> {
    let mut ir = Ir::default();
    let mut batch = TransformBatch::new();
    let mut accepted = Vec::new();

    for artifact in seen.iter().filter(|a| a.artifact_type == ArtifactType::Ir) {
        if let Some(earlier) = artifact.config::<Ir>() {
            ir.merge(earlier.clone());
        }
    }

    for artifact in new_artifacts {
        match artifact.config::<Ir>() {
            Some(payload) => {
                let mut payload = payload.clone();
                if payload.name.is_empty() {
                    payload.name = artifact.name.clone();
                }
                ir.merge(payload);
                accepted.push(artifact);
            }
            None => batch.record(
                transformer,
                artifact,
                Err(TransformerError::MissingConfig {
                    artifact: artifact.name.clone(),
                    config_type: ConfigType::Ir,
                }),
            ),
        }
    }

    MergedIr {
        ir: preprocess(ir),
        accepted,
        batch,
    }
}
