use super::build::{self, BuildPlan, DEFAULT_APP_PATH};
use super::gradle_parser::{self, GradleBuild};
use super::springboot::{self, SPRING_BOOT_GROUP};
use crate::artifact::{Artifact, ArtifactType, GradleConfig, Packaging, PathType, SpringBootConfig};
use crate::environment::Environment;
use crate::transformer::{
    detected, ArtifactOutput, Binding, DetectedServices, TransformBatch, Transformer,
    TransformerError, TransformerSpec,
};
use serde::Deserialize;
use serde_json::Map;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILD_FILES: &[&str] = &["build.gradle", "build.gradle.kts"];
const ARCHIVE_NAME_KEYS: &[&str] = &["archiveFileName", "archiveName"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradleAnalyserConfig {
    pub default_gradle_version: String,
    pub default_java_version: String,
    pub app_path_in_build_container: String,
}

impl Default for GradleAnalyserConfig {
    fn default() -> Self {
        Self {
            default_gradle_version: "8.5".to_string(),
            default_java_version: "17".to_string(),
            app_path_in_build_container: DEFAULT_APP_PATH.to_string(),
        }
    }
}

/// Detects Gradle builds and turns them into packaged-archive artifacts with
/// a build-container Dockerfile.
pub struct GradleAnalyser {
    binding: Binding<GradleAnalyserConfig>,
}

impl GradleAnalyser {
    pub fn new() -> Self {
        Self {
            binding: Binding::unbound("GradleAnalyser"),
        }
    }

    fn transform_one(
        &self,
        env: &Environment,
        artifact: &Artifact,
    ) -> Result<ArtifactOutput, TransformerError> {
        let build_file = build::require_path(artifact, PathType::GradleBuildFile)?;
        let service_dir = build::require_path(artifact, PathType::ServiceDirectory)?;
        let service = build::require_service(artifact)?;
        let gradle = read_build(build_file)?;

        let packaging = artifact
            .config::<GradleConfig>()
            .map(|c| c.packaging)
            .unwrap_or_else(|| packaging_of(&gradle));
        let deployment_file = artifact
            .config::<GradleConfig>()
            .and_then(|c| c.archive_name.clone())
            .or_else(|| archive_name(&gradle, packaging))
            .unwrap_or_else(|| format!("{}.{}", service.service_name, packaging));

        let config = &self.binding.config;
        let app_path = config.app_path_in_build_container.clone();
        let mut binding = Map::new();
        binding.insert(
            "gradle_version".into(),
            config.default_gradle_version.clone().into(),
        );

        let plan = BuildPlan {
            packaging,
            deployment_file,
            java_version: gradle
                .java_version
                .clone()
                .unwrap_or_else(|| config.default_java_version.clone()),
            deployment_dir: format!("{}/build/libs", app_path.trim_end_matches('/')),
            build_template: "Dockerfile.gradle-build",
            binding,
            app_path,
        };
        build::package_artifact(env, artifact, service, service_dir, plan)
    }
}

impl Default for GradleAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for GradleAnalyser {
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError> {
        let config = spec.decode_config()?;
        self.binding.bind(spec, env, config);
        Ok(())
    }

    fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
        (&self.binding.spec, self.binding.env.as_ref())
    }

    fn default_consumes(&self) -> Vec<ArtifactType> {
        vec![ArtifactType::GradleBuild]
    }

    fn directory_detect(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let Some(build_file) = find_build_file(dir) else {
            return Ok(DetectedServices::new());
        };
        let gradle = read_build(&build_file)?;

        let mut artifact = Artifact::new("", ArtifactType::GradleBuild)
            .with_config(GradleConfig {
                packaging: packaging_of(&gradle),
                archive_name: None,
            })
            .with_path(PathType::GradleBuildFile, &build_file)
            .with_path(PathType::ServiceDirectory, dir);

        let mut app_name = String::new();
        if let Some(version) = spring_boot_version(&gradle) {
            let (name, profiles) = springboot::app_name_and_profiles(dir);
            app_name = name.clone();
            artifact.set_config(SpringBootConfig {
                app_name: name,
                version,
                profiles: (!profiles.is_empty()).then_some(profiles),
            });
        }
        artifact.name = app_name.clone();

        debug!(dir = %dir.display(), service = %app_name, "Detected Gradle build");
        Ok(detected(app_name, artifact))
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

fn find_build_file(dir: &Path) -> Option<PathBuf> {
    BUILD_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn read_build(path: &Path) -> Result<GradleBuild, TransformerError> {
    let content = std::fs::read_to_string(path).map_err(|e| TransformerError::io(path, e))?;
    Ok(gradle_parser::parse(&content))
}

fn packaging_of(gradle: &GradleBuild) -> Packaging {
    if gradle.has_plugin("ear") {
        Packaging::Ear
    } else if gradle.has_plugin("war") {
        Packaging::War
    } else {
        Packaging::Jar
    }
}

/// `Some(version)` when the build uses Spring Boot, with the version when the
/// build pins one.
fn spring_boot_version(gradle: &GradleBuild) -> Option<Option<String>> {
    if let Some(dep) = gradle.dependency_in_group(SPRING_BOOT_GROUP) {
        return Some(dep.version.clone());
    }
    gradle.plugins.get(SPRING_BOOT_GROUP).cloned()
}

fn archive_name(gradle: &GradleBuild, packaging: Packaging) -> Option<String> {
    let blocks: &[&str] = match packaging {
        Packaging::Jar => &["bootJar", "jar"],
        Packaging::War => &["bootWar", "war"],
        Packaging::Ear => &["ear"],
    };
    blocks
        .iter()
        .flat_map(|block| ARCHIVE_NAME_KEYS.iter().map(move |key| (block, key)))
        .filter_map(|(block, key)| gradle.block_value(block, key))
        .find(|value| !value.is_empty() && !value.contains('$'))
        .map(str::to_string)
}
