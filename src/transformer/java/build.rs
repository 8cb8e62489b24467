//! Steps shared by the build-file analysers: turning an analysed build into
//! a build-container Dockerfile and a packaged-archive artifact.

use super::versions;
use crate::artifact::{
    Artifact, ArtifactConfig, ConfigPayload, DeploymentConfig, ImageName, Packaging, PathMapping,
    PathType, ServiceConfig, SpringBootConfig,
};
use crate::environment::Environment;
use crate::ir::Ir;
use crate::output::{render, SOURCE_DIR};
use crate::qa::{question_key, SERVICES_KEY};
use crate::transformer::{ArtifactOutput, TransformerError};
use crate::util::make_container_name_compliant;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BUILD_CONTAINER_NAME: &str = "build";
pub const DEFAULT_SERVICE_PORT: u16 = 8080;
pub const DEFAULT_APP_PATH: &str = "/app";

const LICENSE_TEMPLATE: &str = "Dockerfile.license";
const PROFILES_SEGMENT: &str = "activespringbootprofiles";
const PORT_SEGMENT: &str = "port";

/// What an analyser learned about one build.
pub struct BuildPlan {
    pub packaging: Packaging,
    pub deployment_file: String,
    pub java_version: String,
    pub deployment_dir: String,
    pub build_template: &'static str,
    /// Tool-specific template values, merged over the common ones.
    pub binding: Map<String, Value>,
    pub app_path: String,
}

pub fn require_service(artifact: &Artifact) -> Result<&ServiceConfig, TransformerError> {
    artifact
        .config::<ServiceConfig>()
        .filter(|s| !s.service_name.is_empty())
        .ok_or_else(|| TransformerError::MissingConfig {
            artifact: artifact.name.clone(),
            config_type: ServiceConfig::TYPE,
        })
}

pub fn require_path(artifact: &Artifact, path_type: PathType) -> Result<&Path, TransformerError> {
    artifact
        .first_path(path_type)
        .ok_or_else(|| TransformerError::MissingPath {
            artifact: artifact.name.clone(),
            path_type,
        })
}

/// Output directory mirroring `service_dir` under the copied source tree.
pub fn output_dir_for(env: &Environment, service_dir: &Path, service: &str) -> PathBuf {
    let rel = env.relative_to_source(service_dir);
    if rel.is_absolute() {
        Path::new(SOURCE_DIR).join(make_container_name_compliant(service))
    } else {
        Path::new(SOURCE_DIR).join(rel)
    }
}

/// Scratch directory for files generated for the service in `service_dir`.
/// Keyed like [`output_dir_for`], so services sharing a name never share
/// scratch files.
pub fn scratch_dir_for(env: &Environment, service_dir: &Path, service: &str) -> PathBuf {
    env.scratch_path().join(output_dir_for(env, service_dir, service))
}

/// Profiles the user keeps active for `service`, joined by `,`. `None` when
/// the service has no profiles or none were selected.
pub fn select_spring_profiles(env: &Environment, artifact: &Artifact, service: &str) -> Option<String> {
    let profiles = artifact
        .config::<SpringBootConfig>()
        .and_then(|sb| sb.profiles.as_ref())
        .filter(|p| !p.is_empty())?;

    let selected = env.qa().ask_multi_select(
        &question_key(&[SERVICES_KEY, service, PROFILES_SEGMENT]),
        &format!("Choose Spring Boot profiles to be used for the service {}", service),
        &[format!(
            "Selected Spring Boot profiles will be used for setting configuration for the service {}",
            service
        )],
        profiles,
        profiles,
    );
    if selected.is_empty() {
        debug!(service, "No Spring Boot profiles selected");
        None
    } else {
        Some(selected.join(","))
    }
}

/// Port the service listens on, chosen among the ports already declared in
/// its IR or the default port.
pub fn select_port(env: &Environment, ir: Option<&Ir>, service: &str) -> u16 {
    let mut ports = ir.map(Ir::all_service_ports).unwrap_or_default();
    if ports.is_empty() {
        ports.push(DEFAULT_SERVICE_PORT);
    }
    let options: Vec<String> = ports.iter().map(u16::to_string).collect();
    let answer = env.qa().ask_select(
        &question_key(&[SERVICES_KEY, service, PORT_SEGMENT]),
        &format!("Select the port to be exposed for the service {}", service),
        &["The service will listen on the selected port".to_string()],
        &options,
        &options[0],
    );
    answer.parse().unwrap_or(ports[0])
}

/// Renders the build-container Dockerfile into the scratch area and emits the
/// archive artifact for the packaging converter.
pub fn package_artifact(
    env: &Environment,
    artifact: &Artifact,
    service: &ServiceConfig,
    service_dir: &Path,
    plan: BuildPlan,
) -> Result<ArtifactOutput, TransformerError> {
    let name = service.service_name.as_str();
    let mut env_variables = BTreeMap::new();
    let profiles = select_spring_profiles(env, artifact, name);
    if let Some(profiles) = &profiles {
        env_variables.insert("SPRING_PROFILES_ACTIVE".to_string(), profiles.clone());
    }

    let image_name = artifact
        .config::<ImageName>()
        .filter(|i| !i.image_name.is_empty())
        .cloned()
        .unwrap_or_else(|| ImageName {
            image_name: make_container_name_compliant(name),
        });

    let ir = artifact.config::<Ir>();
    let port = match plan.packaging {
        Packaging::Jar => {
            let port = select_port(env, ir, name);
            let key = if profiles.is_some() { "SERVER_PORT" } else { "PORT" };
            env_variables.insert(key.to_string(), port.to_string());
            Some(port)
        }
        Packaging::War | Packaging::Ear => None,
    };

    let scratch_dir = scratch_dir_for(env, service_dir, name);
    let dockerfile = render_build_dockerfile(env, &scratch_dir, &plan)?;
    let destination = output_dir_for(env, service_dir, name).join("Dockerfile.build");

    let deployment = DeploymentConfig {
        deployment_file: plan.deployment_file,
        java_version: plan.java_version,
        build_container_name: BUILD_CONTAINER_NAME.to_string(),
        deployment_file_dir_in_build_container: plan.deployment_dir,
        env_variables,
        port,
    };

    let mut created = Artifact::new(&artifact.name, plan.packaging.artifact_type())
        .with_config(ArtifactConfig::deployment(plan.packaging, deployment))
        .with_config(image_name)
        .with_config(service.clone())
        .with_path(PathType::BuildContainerDockerfile, &dockerfile)
        .with_path(PathType::ServiceDirectory, service_dir);
    if let Some(ir) = ir {
        created.set_config(ir.clone());
    }

    Ok(ArtifactOutput::new()
        .with_mapping(PathMapping::copy(dockerfile, destination))
        .with_artifact(created))
}

fn render_build_dockerfile(
    env: &Environment,
    dir: &Path,
    plan: &BuildPlan,
) -> Result<PathBuf, TransformerError> {
    let read = |name: &str| {
        env.read_template(name)
            .map_err(|e| TransformerError::io(env.templates_root().join(name), e))
    };
    let template = format!("{}\n{}", read(LICENSE_TEMPLATE)?, read(plan.build_template)?);

    let mut binding = Map::new();
    binding.insert("build_container_name".into(), BUILD_CONTAINER_NAME.into());
    binding.insert(
        "java_package_name".into(),
        versions::java_package(env.templates_root(), &plan.java_version).into(),
    );
    binding.insert("app_path".into(), plan.app_path.clone().into());
    binding.extend(plan.binding.clone());

    let content =
        render(&template, &Value::Object(binding)).map_err(|e| TransformerError::Render {
            template: plan.build_template.to_string(),
            message: e.to_string(),
        })?;

    std::fs::create_dir_all(dir).map_err(|e| TransformerError::io(dir, e))?;
    let path = dir.join("Dockerfile.build");
    std::fs::write(&path, content).map_err(|e| TransformerError::io(&path, e))?;
    Ok(path)
}
