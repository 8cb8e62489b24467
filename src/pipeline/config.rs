use super::PipelineError;
use crate::transformer::TransformerSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_ROUNDS: usize = 32;

/// Standard Java chain: build-file analysers, the packaging converter and both
/// descriptor generators.
pub const DEFAULT_PIPELINE: &str = r#"
maxRounds: 32
copySource: true
transformers:
  - name: gradle
    class: GradleAnalyser
  - name: maven
    class: MavenAnalyser
  - name: java-packager
    class: JavaPackager
  - name: compose
    class: ComposeGenerator
  - name: kubernetes
    class: KubernetesGenerator
"#;

/// Declarative pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default)]
    pub transformers: Vec<TransformerSpec>,

    /// Rounds the scheduler may run before declaring a cycle.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Mirror the source tree into `source/` of the output.
    #[serde(default = "default_copy_source")]
    pub copy_source: bool,
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

fn default_copy_source() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // The embedded document is covered by tests.
        Self::from_yaml(DEFAULT_PIPELINE).unwrap_or_else(|_| Self::empty())
    }
}

impl PipelineConfig {
    pub fn empty() -> Self {
        Self {
            transformers: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            copy_source: true,
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, PipelineError> {
        Self::parse(content, None)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, Some(path))
    }

    fn parse(content: &str, path: Option<&Path>) -> Result<Self, PipelineError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|source| PipelineError::ConfigParse {
                path: path.map(Path::to_path_buf),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_rounds == 0 {
            return Err(PipelineError::InvalidConfig(
                "maxRounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_transformer(mut self, spec: TransformerSpec) -> Self {
        self.transformers.push(spec);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_copy_source(mut self, copy_source: bool) -> Self {
        self.copy_source = copy_source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactType;

    #[test]
    fn test_default_pipeline_parses() {
        let config = PipelineConfig::from_yaml(DEFAULT_PIPELINE).unwrap();
        let classes: Vec<_> = config.transformers.iter().map(|t| t.class.as_str()).collect();
        assert_eq!(
            classes,
            vec![
                "GradleAnalyser",
                "MavenAnalyser",
                "JavaPackager",
                "ComposeGenerator",
                "KubernetesGenerator"
            ]
        );
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
        assert!(config.copy_source);
        assert_eq!(PipelineConfig::default(), config);
    }

    #[test]
    fn test_custom_document() {
        let config = PipelineConfig::from_yaml(
            r#"
maxRounds: 4
copySource: false
transformers:
  - name: k8s
    class: KubernetesGenerator
    consumes: [IR]
    config:
      outputPath: manifests
      replicas: 2
"#,
        )
        .unwrap();
        assert_eq!(config.max_rounds, 4);
        assert!(!config.copy_source);
        assert_eq!(config.transformers[0].consumes, Some(vec![ArtifactType::Ir]));
    }

    #[test]
    fn test_unknown_artifact_type_rejected() {
        let err = PipelineConfig::from_yaml(
            "transformers:\n  - name: x\n    class: JavaPackager\n    consumes: [zip-package]\n",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse { .. }));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml("maxRounds: 0"),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::empty()
            .with_transformer(TransformerSpec::new("compose", "ComposeGenerator"))
            .with_max_rounds(3)
            .with_copy_source(false);
        assert_eq!(config.transformers.len(), 1);
        assert_eq!(config.max_rounds, 3);
        assert!(!config.copy_source);
    }
}
