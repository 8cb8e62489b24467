//! Docker Compose descriptor generator.

use super::ir_merge::merge_ir;
use super::{
    ArtifactOutput, Binding, DetectedServices, TransformBatch, Transformer, TransformerError,
    TransformerSpec,
};
use crate::artifact::{Artifact, ArtifactType, PathMapping};
use crate::environment::Environment;
use crate::ir::Ir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const COMPOSE_VERSION: &str = "3.5";
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";
/// First host port handed out; every container port gets the next one.
pub const BASE_PUBLISHED_PORT: u32 = 8080;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeGeneratorConfig {
    pub output_path: PathBuf,
}

impl Default for ComposeGeneratorConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("deploy/compose"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub version: String,
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub container_name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ComposePort>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposePort {
    pub target: u16,
    pub published: u32,
}

impl ComposeFile {
    /// Builds the descriptor from a preprocessed IR. Services are visited in
    /// name order and containers in their sorted order, so published ports are
    /// the same on every run.
    pub fn from_ir(ir: &Ir) -> Self {
        let mut services = BTreeMap::new();
        let mut next_port = BASE_PUBLISHED_PORT;

        for named in ir.resource_names() {
            let container = named.container;
            let ports = container
                .ports
                .iter()
                .map(|&target| {
                    let port = ComposePort {
                        target,
                        published: next_port,
                    };
                    next_port += 1;
                    port
                })
                .collect();
            services.insert(
                named.resource_name,
                ComposeService {
                    container_name: container.name.clone(),
                    image: container.image.clone(),
                    ports,
                    environment: container
                        .env
                        .iter()
                        .map(|e| (e.name.clone(), e.value.clone()))
                        .collect(),
                },
            );
        }

        Self {
            version: COMPOSE_VERSION.to_string(),
            services,
        }
    }
}

/// Writes one `docker-compose.yaml` covering every IR artifact received.
pub struct ComposeGenerator {
    binding: Binding<ComposeGeneratorConfig>,
}

impl ComposeGenerator {
    pub fn new() -> Self {
        Self {
            binding: Binding::unbound("ComposeGenerator"),
        }
    }

    fn write(&self, env: &Environment, ir: &Ir) -> Result<ArtifactOutput, TransformerError> {
        let compose = ComposeFile::from_ir(ir);
        debug!(services = compose.services.len(), "Generated compose descriptor");

        let yaml = serde_yaml::to_string(&compose)
            .map_err(|e| TransformerError::Write(e.to_string()))?;
        let path = env.scratch_path().join(COMPOSE_FILE_NAME);
        std::fs::write(&path, yaml).map_err(|e| TransformerError::io(&path, e))?;

        let destination = self.binding.config.output_path.join(COMPOSE_FILE_NAME);
        Ok(ArtifactOutput::new().with_mapping(PathMapping::copy(path, destination)))
    }
}

impl Default for ComposeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for ComposeGenerator {
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError> {
        let config = spec.decode_config()?;
        self.binding.bind(spec, env, config);
        Ok(())
    }

    fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
        (&self.binding.spec, self.binding.env.as_ref())
    }

    fn default_consumes(&self) -> Vec<ArtifactType> {
        vec![ArtifactType::Ir]
    }

    fn directory_detect(&self, _dir: &Path) -> Result<DetectedServices, TransformerError> {
        Ok(DetectedServices::new())
    }

    fn transform(
        &self,
        new_artifacts: Vec<Artifact>,
        seen: &[Artifact],
    ) -> Result<TransformBatch, TransformerError> {
        let env = self.binding.env()?;
        let merged = merge_ir(self.binding.name(), &new_artifacts, seen);
        if merged.accepted.is_empty() {
            return Ok(merged.batch);
        }
        let result = self.write(env, &merged.ir);
        Ok(merged.finish(self.binding.name(), result))
    }
}
