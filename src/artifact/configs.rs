//! Payload shapes stored under each [`ConfigType`] tag.

use super::types::{ConfigType, Packaging};
use crate::ir::Ir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradleConfig {
    #[serde(default)]
    pub packaging: Packaging,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenConfig {
    #[serde(default)]
    pub packaging: Packaging,
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringBootConfig {
    #[serde(default)]
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageName {
    pub image_name: String,
}

/// Everything a packaging converter needs to turn a built archive into a
/// runnable image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub deployment_file: String,
    #[serde(default)]
    pub java_version: String,
    pub build_container_name: String,
    pub deployment_file_dir_in_build_container: String,
    #[serde(default)]
    pub env_variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// A payload together with its tag. The tag is derived from the variant, so a
/// payload can never be stored under a key of a different shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArtifactConfig {
    Ir(Ir),
    Service(ServiceConfig),
    Gradle(GradleConfig),
    Maven(MavenConfig),
    SpringBoot(SpringBootConfig),
    ImageName(ImageName),
    Jar(DeploymentConfig),
    War(DeploymentConfig),
    Ear(DeploymentConfig),
}

impl ArtifactConfig {
    pub fn config_type(&self) -> ConfigType {
        match self {
            ArtifactConfig::Ir(_) => ConfigType::Ir,
            ArtifactConfig::Service(_) => ConfigType::Service,
            ArtifactConfig::Gradle(_) => ConfigType::Gradle,
            ArtifactConfig::Maven(_) => ConfigType::Maven,
            ArtifactConfig::SpringBoot(_) => ConfigType::SpringBoot,
            ArtifactConfig::ImageName(_) => ConfigType::ImageName,
            ArtifactConfig::Jar(_) => ConfigType::Jar,
            ArtifactConfig::War(_) => ConfigType::War,
            ArtifactConfig::Ear(_) => ConfigType::Ear,
        }
    }

    pub fn deployment(packaging: Packaging, config: DeploymentConfig) -> Self {
        match packaging {
            Packaging::Jar => ArtifactConfig::Jar(config),
            Packaging::War => ArtifactConfig::War(config),
            Packaging::Ear => ArtifactConfig::Ear(config),
        }
    }

    /// Decodes a loosely-typed document into the payload shape registered for
    /// `tag`.
    pub fn decode(tag: ConfigType, value: serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        Ok(match tag {
            ConfigType::Ir => ArtifactConfig::Ir(serde_yaml::from_value(value)?),
            ConfigType::Service => ArtifactConfig::Service(serde_yaml::from_value(value)?),
            ConfigType::Gradle => ArtifactConfig::Gradle(serde_yaml::from_value(value)?),
            ConfigType::Maven => ArtifactConfig::Maven(serde_yaml::from_value(value)?),
            ConfigType::SpringBoot => ArtifactConfig::SpringBoot(serde_yaml::from_value(value)?),
            ConfigType::ImageName => ArtifactConfig::ImageName(serde_yaml::from_value(value)?),
            ConfigType::Jar => ArtifactConfig::Jar(serde_yaml::from_value(value)?),
            ConfigType::War => ArtifactConfig::War(serde_yaml::from_value(value)?),
            ConfigType::Ear => ArtifactConfig::Ear(serde_yaml::from_value(value)?),
        })
    }
}

/// Payload types that own a tag of their own, enabling typed access through
/// [`super::Artifact::config`].
pub trait ConfigPayload: Sized {
    const TYPE: ConfigType;

    fn into_config(self) -> ArtifactConfig;

    fn from_config(config: &ArtifactConfig) -> Option<&Self>;
}

macro_rules! impl_config_payload {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ConfigPayload for $ty {
                const TYPE: ConfigType = ConfigType::$variant;

                fn into_config(self) -> ArtifactConfig {
                    ArtifactConfig::$variant(self)
                }

                fn from_config(config: &ArtifactConfig) -> Option<&Self> {
                    match config {
                        ArtifactConfig::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_config_payload! {
    Ir => Ir,
    ServiceConfig => Service,
    GradleConfig => Gradle,
    MavenConfig => Maven,
    SpringBootConfig => SpringBoot,
    ImageName => ImageName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_derived_from_payload() {
        let config = ServiceConfig {
            service_name: "orders".to_string(),
        }
        .into_config();
        assert_eq!(config.config_type(), ConfigType::Service);

        let war = ArtifactConfig::deployment(Packaging::War, DeploymentConfig::default());
        assert_eq!(war.config_type(), ConfigType::War);
    }

    #[test]
    fn test_decode_checks_shape() {
        let value: serde_yaml::Value = serde_yaml::from_str("serviceName: orders").unwrap();
        let decoded = ArtifactConfig::decode(ConfigType::Service, value).unwrap();
        assert_eq!(
            ServiceConfig::from_config(&decoded).map(|s| s.service_name.as_str()),
            Some("orders")
        );

        let wrong: serde_yaml::Value = serde_yaml::from_str("packaging: rar").unwrap();
        assert!(ArtifactConfig::decode(ConfigType::Gradle, wrong).is_err());
    }

    #[test]
    fn test_from_config_rejects_other_variant() {
        let config = ImageName {
            image_name: "api".to_string(),
        }
        .into_config();
        assert!(ServiceConfig::from_config(&config).is_none());
    }
}
