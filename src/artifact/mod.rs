//! Artifacts: named, typed bags of configuration and paths flowing through the
//! pipeline.
//!
//! Artifacts never reference each other; contributions to the same logical
//! service are correlated by [`Artifact::name`].

#[macro_use]
pub mod tag_enum_macro;

pub mod configs;
pub mod path_mapping;
pub mod types;

pub use configs::{
    ArtifactConfig, ConfigPayload, DeploymentConfig, GradleConfig, ImageName, MavenConfig,
    ServiceConfig, SpringBootConfig,
};
pub use path_mapping::{PathMapping, PathMappingKind};
pub use types::{ArtifactType, ConfigType, Packaging, PathType};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawArtifact")]
pub struct Artifact {
    pub name: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    configs: BTreeMap<ConfigType, ArtifactConfig>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<PathType, Vec<PathBuf>>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, artifact_type: ArtifactType) -> Self {
        Self {
            name: name.into(),
            artifact_type,
            configs: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: impl Into<ArtifactConfig>) -> Self {
        self.set_config(config);
        self
    }

    pub fn with_path(mut self, path_type: PathType, path: impl Into<PathBuf>) -> Self {
        self.paths.entry(path_type).or_default().push(path.into());
        self
    }

    pub fn with_paths(mut self, path_type: PathType, paths: Vec<PathBuf>) -> Self {
        self.paths.insert(path_type, paths);
        self
    }

    /// Stores a payload under its own tag. A payload already stored under the
    /// same tag is replaced.
    pub fn set_config(&mut self, config: impl Into<ArtifactConfig>) {
        let config = config.into();
        let tag = config.config_type();
        if self.configs.insert(tag, config).is_some() {
            debug!(artifact = %self.name, config_type = %tag, "Replaced existing config");
        }
    }

    pub fn config<T: ConfigPayload>(&self) -> Option<&T> {
        self.configs.get(&T::TYPE).and_then(T::from_config)
    }

    pub fn raw_config(&self, tag: ConfigType) -> Option<&ArtifactConfig> {
        self.configs.get(&tag)
    }

    pub fn has_config(&self, tag: ConfigType) -> bool {
        self.configs.contains_key(&tag)
    }

    pub fn configs(&self) -> impl Iterator<Item = &ArtifactConfig> {
        self.configs.values()
    }

    pub fn deployment_config(&self, packaging: Packaging) -> Option<&DeploymentConfig> {
        match (packaging, self.configs.get(&packaging.config_type())?) {
            (Packaging::Jar, ArtifactConfig::Jar(c))
            | (Packaging::War, ArtifactConfig::War(c))
            | (Packaging::Ear, ArtifactConfig::Ear(c)) => Some(c),
            _ => None,
        }
    }

    pub fn first_path(&self, path_type: PathType) -> Option<&Path> {
        self.paths
            .get(&path_type)
            .and_then(|p| p.first())
            .map(PathBuf::as_path)
    }

    /// Service name recorded in the service config, falling back to the
    /// artifact name.
    pub fn service_name(&self) -> &str {
        self.config::<ServiceConfig>()
            .map(|s| s.service_name.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

impl<T: ConfigPayload> From<T> for ArtifactConfig {
    fn from(payload: T) -> Self {
        payload.into_config()
    }
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    artifact_type: ArtifactType,
    #[serde(default)]
    configs: BTreeMap<ConfigType, serde_yaml::Value>,
    #[serde(default)]
    paths: BTreeMap<PathType, Vec<PathBuf>>,
}

impl TryFrom<RawArtifact> for Artifact {
    type Error = String;

    fn try_from(raw: RawArtifact) -> Result<Self, Self::Error> {
        let mut configs = BTreeMap::new();
        for (tag, value) in raw.configs {
            let config = ArtifactConfig::decode(tag, value)
                .map_err(|e| format!("config '{}' of artifact '{}': {}", tag, raw.name, e))?;
            configs.insert(tag, config);
        }
        Ok(Self {
            name: raw.name,
            artifact_type: raw.artifact_type,
            configs,
            paths: raw.paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Ir;

    #[test]
    fn test_typed_config_access() {
        let artifact = Artifact::new("orders", ArtifactType::GradleBuild).with_config(GradleConfig {
            packaging: Packaging::War,
            archive_name: None,
        });

        assert_eq!(
            artifact.config::<GradleConfig>().map(|g| g.packaging),
            Some(Packaging::War)
        );
        assert!(artifact.config::<MavenConfig>().is_none());
        assert!(artifact.has_config(ConfigType::Gradle));
    }

    #[test]
    fn test_same_tag_last_writer_wins() {
        let mut artifact = Artifact::new("orders", ArtifactType::Ir);
        artifact.set_config(ImageName {
            image_name: "first".to_string(),
        });
        artifact.set_config(ImageName {
            image_name: "second".to_string(),
        });

        assert_eq!(
            artifact.config::<ImageName>().map(|i| i.image_name.as_str()),
            Some("second")
        );
        assert_eq!(artifact.configs().count(), 1);
    }

    #[test]
    fn test_deployment_config_by_packaging() {
        let artifact = Artifact::new("shop", ArtifactType::WarPackage).with_config(
            ArtifactConfig::deployment(
                Packaging::War,
                DeploymentConfig {
                    deployment_file: "shop.war".to_string(),
                    ..Default::default()
                },
            ),
        );

        assert!(artifact.deployment_config(Packaging::Jar).is_none());
        assert_eq!(
            artifact
                .deployment_config(Packaging::War)
                .map(|d| d.deployment_file.as_str()),
            Some("shop.war")
        );
    }

    #[test]
    fn test_paths_keep_order() {
        let artifact = Artifact::new("a", ArtifactType::MavenBuild)
            .with_path(PathType::ServiceDirectory, "/src/a")
            .with_path(PathType::ServiceDirectory, "/src/a/sub");

        assert_eq!(
            artifact.first_path(PathType::ServiceDirectory),
            Some(Path::new("/src/a"))
        );
        assert_eq!(artifact.paths[&PathType::ServiceDirectory].len(), 2);
        assert!(artifact.first_path(PathType::MavenPomFile).is_none());
    }

    #[test]
    fn test_service_name_falls_back_to_artifact_name() {
        let unnamed = Artifact::new("dir-name", ArtifactType::Ir);
        assert_eq!(unnamed.service_name(), "dir-name");

        let named = unnamed.with_config(ServiceConfig {
            service_name: "orders".to_string(),
        });
        assert_eq!(named.service_name(), "orders");
    }

    #[test]
    fn test_yaml_round_trip_validates_configs() {
        let artifact = Artifact::new("orders", ArtifactType::Ir)
            .with_config(Ir::new("orders"))
            .with_path(PathType::ServiceDirectory, "/src/orders");
        let yaml = serde_yaml::to_string(&artifact).unwrap();
        assert!(yaml.contains("type: IR"));

        let parsed: Artifact = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, artifact);

        let bad = "name: x\ntype: IR\nconfigs:\n  service:\n    serviceName: [1, 2]\n";
        let err = serde_yaml::from_str::<Artifact>(bad).unwrap_err().to_string();
        assert!(err.contains("config 'service' of artifact 'x'"));
    }
}
