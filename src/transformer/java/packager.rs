use super::build::{self, DEFAULT_SERVICE_PORT};
use super::versions;
use crate::artifact::{
    Artifact, ArtifactType, ConfigType, ImageName, Packaging, PathMapping, PathType,
    ServiceConfig,
};
use crate::environment::Environment;
use crate::ir::{Container, Ir, Service};
use crate::transformer::{
    ArtifactOutput, Binding, DetectedServices, TransformBatch, Transformer, TransformerError,
    TransformerSpec,
};
use crate::util::make_container_name_compliant;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LICENSE_TEMPLATE: &str = "Dockerfile.license";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JavaPackagerConfig {
    /// Port used when the archive artifact declares none.
    pub default_port: u16,
    pub image_tag: String,
}

impl Default for JavaPackagerConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_SERVICE_PORT,
            image_tag: "latest".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RuntimeBinding {
    java_version: String,
    build_container_name: String,
    deployment_file_dir: String,
    deployment_file: String,
    env_block: String,
    port: u16,
}

/// Converts packaged archives into a runnable image description: a runtime
/// Dockerfile next to the service sources and an IR entry for generators.
pub struct JavaPackager {
    binding: Binding<JavaPackagerConfig>,
}

impl JavaPackager {
    pub fn new() -> Self {
        Self {
            binding: Binding::unbound("JavaPackager"),
        }
    }

    fn transform_one(
        &self,
        env: &Environment,
        artifact: &Artifact,
    ) -> Result<ArtifactOutput, TransformerError> {
        let packaging = Packaging::from_artifact_type(artifact.artifact_type)
            .ok_or(TransformerError::UnsupportedArtifact(artifact.artifact_type))?;
        let deployment = artifact.deployment_config(packaging).ok_or_else(|| {
            TransformerError::MissingConfig {
                artifact: artifact.name.clone(),
                config_type: packaging.config_type(),
            }
        })?;
        let service_dir = build::require_path(artifact, PathType::ServiceDirectory)?;
        let service = artifact.service_name().to_string();
        if service.is_empty() {
            return Err(TransformerError::MissingConfig {
                artifact: artifact.name.clone(),
                config_type: ConfigType::Service,
            });
        }

        let image_name = artifact
            .config::<ImageName>()
            .map(|i| i.image_name.clone())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| make_container_name_compliant(&service));
        let port = deployment.port.unwrap_or(self.binding.config.default_port);

        let template = self.runtime_template(env, artifact, packaging)?;
        let template_dir = build::scratch_dir_for(env, service_dir, &service);
        std::fs::create_dir_all(&template_dir)
            .map_err(|e| TransformerError::io(&template_dir, e))?;
        let template_path = template_dir.join(format!("Dockerfile.{}.template", packaging));
        std::fs::write(&template_path, template)
            .map_err(|e| TransformerError::io(&template_path, e))?;

        let runtime = RuntimeBinding {
            java_version: versions::normalize(&deployment.java_version),
            build_container_name: deployment.build_container_name.clone(),
            deployment_file_dir: deployment.deployment_file_dir_in_build_container.clone(),
            deployment_file: deployment.deployment_file.clone(),
            env_block: deployment
                .env_variables
                .iter()
                .map(|(k, v)| format!("ENV {}={}", k, v))
                .collect::<Vec<_>>()
                .join("\n"),
            port,
        };
        let destination = build::output_dir_for(env, service_dir, &service).join("Dockerfile");
        let mapping = PathMapping::template(&template_path, destination, &runtime).map_err(|e| {
            TransformerError::Render {
                template: template_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let mut container = Container::new(
            &service,
            format!("{}:{}", image_name, self.binding.config.image_tag),
        )
        .with_port(port);
        for (name, value) in &deployment.env_variables {
            container = container.with_env(name, value);
        }
        let mut ir = artifact.config::<Ir>().cloned().unwrap_or_else(|| Ir::new(&service));
        ir.add_service(Service::new(&service).with_container(container));

        let created = Artifact::new(&artifact.name, ArtifactType::Ir)
            .with_config(ir)
            .with_config(ServiceConfig {
                service_name: service.clone(),
            })
            .with_config(ImageName { image_name })
            .with_path(PathType::ServiceDirectory, service_dir);

        Ok(ArtifactOutput::new()
            .with_mapping(mapping)
            .with_artifact(created))
    }

    /// The build stage, when the archive comes with one, followed by the
    /// runtime stage for `packaging`.
    fn runtime_template(
        &self,
        env: &Environment,
        artifact: &Artifact,
        packaging: Packaging,
    ) -> Result<String, TransformerError> {
        let read_template = |name: &str| {
            env.read_template(name)
                .map_err(|e| TransformerError::io(env.templates_root().join(name), e))
        };
        let runtime = read_template(&format!("Dockerfile.{}-runtime", packaging))?;

        let head = match artifact.first_path(PathType::BuildContainerDockerfile) {
            Some(path) => {
                std::fs::read_to_string(path).map_err(|e| TransformerError::io(path, e))?
            }
            None => read_template(LICENSE_TEMPLATE)?,
        };
        Ok(format!("{}\n\n{}", head.trim_end(), runtime))
    }
}

impl Default for JavaPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for JavaPackager {
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError> {
        let config = spec.decode_config()?;
        self.binding.bind(spec, env, config);
        Ok(())
    }

    fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
        (&self.binding.spec, self.binding.env.as_ref())
    }

    fn default_consumes(&self) -> Vec<ArtifactType> {
        vec![
            ArtifactType::JarPackage,
            ArtifactType::WarPackage,
            ArtifactType::EarPackage,
        ]
    }

    fn directory_detect(&self, _dir: &Path) -> Result<DetectedServices, TransformerError> {
        Ok(DetectedServices::new())
    }

    fn transform(
        &self,
        new_artifacts: Vec<Artifact>,
        _seen: &[Artifact],
    ) -> Result<TransformBatch, TransformerError> {
        let env = self.binding.env()?;
        Ok(TransformBatch::collect(
            self.binding.name(),
            &new_artifacts,
            |artifact| self.transform_one(env, artifact),
        ))
    }
}
