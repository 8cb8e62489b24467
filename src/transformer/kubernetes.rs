//! Kubernetes manifest generator.
//!
//! Emits one `Deployment` per container and, when the container declares
//! ports, a `Service` selecting it.

use super::ir_merge::merge_ir;
use super::{
    ArtifactOutput, Binding, DetectedServices, TransformBatch, Transformer, TransformerError,
    TransformerSpec,
};
use crate::artifact::{Artifact, ArtifactType, PathMapping};
use crate::environment::Environment;
use crate::ir::{Container, Ir};
use crate::util::make_container_name_compliant;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_LABEL: &str = "app";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubernetesGeneratorConfig {
    pub output_path: PathBuf,
    pub replicas: u32,
}

impl Default for KubernetesGeneratorConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("deploy/kubernetes"),
            replicas: 1,
        }
    }
}

/// A rendered manifest and the file name it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub file_name: String,
    pub document: Value,
}

fn deployment(name: &str, container: &Container, replicas: u32) -> Value {
    let ports: Vec<Value> = container
        .ports
        .iter()
        .map(|p| json!({ "containerPort": p }))
        .collect();
    let env: Vec<Value> = container
        .env
        .iter()
        .map(|e| json!({ "name": e.name, "value": e.value }))
        .collect();

    let mut spec_container = json!({
        "name": make_container_name_compliant(&container.name),
        "image": container.image,
    });
    if !ports.is_empty() {
        spec_container["ports"] = Value::Array(ports);
    }
    if !env.is_empty() {
        spec_container["env"] = Value::Array(env);
    }

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "labels": { APP_LABEL: name } },
        "spec": {
            "replicas": replicas,
            "selector": { "matchLabels": { APP_LABEL: name } },
            "template": {
                "metadata": { "labels": { APP_LABEL: name } },
                "spec": { "containers": [spec_container] }
            }
        }
    })
}

fn service(name: &str, ports: &[u16]) -> Value {
    let ports: Vec<Value> = ports
        .iter()
        .map(|p| json!({ "name": format!("port-{}", p), "port": p, "targetPort": p }))
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "labels": { APP_LABEL: name } },
        "spec": {
            "type": "ClusterIP",
            "selector": { APP_LABEL: name },
            "ports": ports
        }
    })
}

/// Builds every manifest for a preprocessed IR, in service then container
/// order.
pub fn manifests(ir: &Ir, replicas: u32) -> Vec<Manifest> {
    let mut out = Vec::new();
    for named in ir.resource_names() {
        let name = named.resource_name;
        out.push(Manifest {
            file_name: format!("{}-deployment.yaml", name),
            document: deployment(&name, named.container, replicas),
        });
        if !named.container.ports.is_empty() {
            out.push(Manifest {
                file_name: format!("{}-service.yaml", name),
                document: service(&name, &named.container.ports),
            });
        }
    }
    out
}

/// Writes Deployment and Service manifests for every IR artifact received.
pub struct KubernetesGenerator {
    binding: Binding<KubernetesGeneratorConfig>,
}

impl KubernetesGenerator {
    pub fn new() -> Self {
        Self {
            binding: Binding::unbound("KubernetesGenerator"),
        }
    }

    fn write(&self, env: &Environment, ir: &Ir) -> Result<ArtifactOutput, TransformerError> {
        let config = &self.binding.config;
        let mut output = ArtifactOutput::new();

        for manifest in manifests(ir, config.replicas) {
            let yaml = serde_yaml::to_string(&manifest.document)
                .map_err(|e| TransformerError::Write(e.to_string()))?;
            let path = env.scratch_path().join(&manifest.file_name);
            std::fs::write(&path, yaml).map_err(|e| TransformerError::io(&path, e))?;
            output = output.with_mapping(PathMapping::copy(
                path,
                config.output_path.join(&manifest.file_name),
            ));
        }

        debug!(files = output.path_mappings.len(), "Generated Kubernetes manifests");
        Ok(output)
    }
}

impl Default for KubernetesGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for KubernetesGenerator {
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError> {
        let config: KubernetesGeneratorConfig = spec.decode_config()?;
        if config.replicas == 0 {
            return Err(TransformerError::Config {
                name: spec.name.clone(),
                message: "replicas must be at least 1".to_string(),
            });
        }
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
