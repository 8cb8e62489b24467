use super::TransformerError;
use crate::artifact::ArtifactType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Declarative description of one transformer instance in a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerSpec {
    pub name: String,
    pub class: String,
    /// Overrides the artifact types the class consumes by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<ArtifactType>>,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

impl TransformerSpec {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            consumes: None,
            config: serde_yaml::Value::Null,
        }
    }

    pub fn with_config(mut self, config: serde_yaml::Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_consumes(mut self, consumes: Vec<ArtifactType>) -> Self {
        self.consumes = Some(consumes);
        self
    }

    /// Decodes the generic config document into a transformer's own record.
    /// Unknown keys are ignored; an absent document decodes like an empty
    /// mapping, so required keys still fail.
    pub fn decode_config<T: DeserializeOwned>(&self) -> Result<T, TransformerError> {
        let value = match &self.config {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
            other => other.clone(),
        };
        serde_yaml::from_value(value).map_err(|e| TransformerError::Config {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Required {
        output_path: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Optional {
        output_path: Option<String>,
    }

    fn spec(yaml: &str) -> TransformerSpec {
        TransformerSpec::new("t", "C").with_config(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let decoded: Required = spec("outputPath: out\nextra: 1").decode_config().unwrap();
        assert_eq!(decoded.output_path, "out");
    }

    #[test]
    fn test_missing_required_key_fails() {
        let err = TransformerSpec::new("t", "C")
            .decode_config::<Required>()
            .unwrap_err();
        assert!(matches!(err, TransformerError::Config { ref name, .. } if name == "t"));
    }

    #[test]
    fn test_absent_config_decodes_defaults() {
        let decoded: Optional = TransformerSpec::new("t", "C").decode_config().unwrap();
        assert!(decoded.output_path.is_none());
    }

    #[test]
    fn test_ill_typed_value_fails() {
        assert!(spec("outputPath: [1]").decode_config::<Required>().is_err());
    }

    #[test]
    fn test_spec_from_yaml() {
        let parsed: TransformerSpec =
            serde_yaml::from_str("name: compose\nclass: ComposeGenerator\nconsumes: [IR]\n")
                .unwrap();
        assert_eq!(parsed.consumes, Some(vec![ArtifactType::Ir]));
        assert!(parsed.config.is_null());
    }
}
