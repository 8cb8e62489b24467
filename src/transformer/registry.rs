use super::compose::ComposeGenerator;
use super::java::{GradleAnalyser, JavaPackager, MavenAnalyser};
use super::kubernetes::KubernetesGenerator;
use super::{Transformer, TransformerError, TransformerSpec};
use crate::artifact::ArtifactType;
use crate::environment::Environment;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub type TransformerFactory = fn() -> Box<dyn Transformer>;

/// Maps transformer class names to constructors.
pub struct TransformerRegistry {
    factories: BTreeMap<String, TransformerFactory>,
}

/// An initialized transformer instance taking part in the run.
#[derive(Clone)]
pub struct ActiveTransformer {
    pub name: String,
    pub class: String,
    pub consumes: Vec<ArtifactType>,
    pub inner: Arc<dyn Transformer>,
}

impl fmt::Debug for ActiveTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTransformer")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("consumes", &self.consumes)
            .finish()
    }
}

impl ActiveTransformer {
    pub fn consumes_type(&self, artifact_type: ArtifactType) -> bool {
        self.consumes.contains(&artifact_type)
    }
}

/// A transformer instance excluded from the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitFailure {
    pub name: String,
    pub class: String,
    pub cause: String,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("GradleAnalyser", || -> Box<dyn Transformer> {
            Box::new(GradleAnalyser::new())
        });
        registry.register("MavenAnalyser", || -> Box<dyn Transformer> {
            Box::new(MavenAnalyser::new())
        });
        registry.register("JavaPackager", || -> Box<dyn Transformer> {
            Box::new(JavaPackager::new())
        });
        registry.register("ComposeGenerator", || -> Box<dyn Transformer> {
            Box::new(ComposeGenerator::new())
        });
        registry.register("KubernetesGenerator", || -> Box<dyn Transformer> {
            Box::new(KubernetesGenerator::new())
        });
        registry
    }

    pub fn register(&mut self, class: impl Into<String>, factory: TransformerFactory) {
        self.factories.insert(class.into(), factory);
    }

    pub fn classes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Constructs and initializes every spec in order. Instances that fail are
    /// reported and left out; the rest keep the order of `specs`.
    pub fn instantiate(
        &self,
        specs: &[TransformerSpec],
        env: &Environment,
    ) -> (Vec<ActiveTransformer>, Vec<InitFailure>) {
        let mut active = Vec::new();
        let mut failures = Vec::new();
        let mut names = HashSet::new();

        for spec in specs {
            match self.instantiate_one(spec, env, &mut names) {
                Ok(transformer) => {
                    debug!(name = %transformer.name, class = %transformer.class, consumes = ?transformer.consumes, "Initialized transformer");
                    active.push(transformer);
                }
                Err(e) => {
                    warn!(name = %spec.name, class = %spec.class, error = %e, "Disabling transformer");
                    failures.push(InitFailure {
                        name: spec.name.clone(),
                        class: spec.class.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        (active, failures)
    }

    fn instantiate_one(
        &self,
        spec: &TransformerSpec,
        env: &Environment,
        names: &mut HashSet<String>,
    ) -> Result<ActiveTransformer, TransformerError> {
        let config_error = |message: String| TransformerError::Config {
            name: spec.name.clone(),
            message,
        };

        let factory = self.factories.get(&spec.class).ok_or_else(|| {
            let mut message = format!("unknown transformer class '{}'", spec.class);
            if let Some(suggestion) = self.suggest(&spec.class) {
                message.push_str(&format!(", did you mean '{}'?", suggestion));
            }
            config_error(message)
        })?;

        if spec.name.is_empty() {
            return Err(config_error("transformer name must not be empty".to_string()));
        }
        if !names.insert(spec.name.clone()) {
            return Err(config_error(format!(
                "duplicate transformer name '{}'",
                spec.name
            )));
        }

        let scoped = env
            .for_transformer(&spec.name)
            .map_err(|e| config_error(e.to_string()))?;

        let mut transformer = factory();
        transformer.init(spec, scoped)?;
        let consumes = spec
            .consumes
            .clone()
            .unwrap_or_else(|| transformer.default_consumes());

        Ok(ActiveTransformer {
            name: spec.name.clone(),
            class: spec.class.clone(),
            consumes,
            inner: Arc::from(transformer),
        })
    }

    fn suggest(&self, class: &str) -> Option<&str> {
        self.factories
            .keys()
            .map(|k| (k.as_str(), strsim::jaro_winkler(&k.to_lowercase(), &class.to_lowercase())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::QaEngine;
    use tempfile::TempDir;

    fn env(dir: &TempDir) -> Environment {
        Environment::with_scratch_root(
            dir.path(),
            &dir.path().join(".scratch"),
            Arc::new(QaEngine::non_interactive()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_classes() {
        let registry = TransformerRegistry::with_defaults();
        assert_eq!(
            registry.classes(),
            vec![
                "ComposeGenerator",
                "GradleAnalyser",
                "JavaPackager",
                "KubernetesGenerator",
                "MavenAnalyser"
            ]
        );
    }

    #[test]
    fn test_instantiate_keeps_spec_order() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::with_defaults();
        let specs = vec![
            TransformerSpec::new("maven", "MavenAnalyser"),
            TransformerSpec::new("gradle", "GradleAnalyser"),
        ];

        let (active, failures) = registry.instantiate(&specs, &env(&dir));
        assert!(failures.is_empty());
        let names: Vec<_> = active.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["maven", "gradle"]);
        assert!(active[1].consumes_type(ArtifactType::GradleBuild));
    }

    #[test]
    fn test_unknown_class_is_isolated_with_suggestion() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::with_defaults();
        let specs = vec![
            TransformerSpec::new("typo", "ComposeGenerater"),
            TransformerSpec::new("compose", "ComposeGenerator"),
        ];

        let (active, failures) = registry.instantiate(&specs, &env(&dir));
        assert_eq!(active.len(), 1);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].cause.contains("did you mean 'ComposeGenerator'"));
    }

    #[test]
    fn test_bad_config_disables_only_that_instance() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::with_defaults();
        let bad = TransformerSpec::new("compose", "ComposeGenerator")
            .with_config(serde_yaml::from_str("outputPath: [not, a, path]").unwrap());
        let specs = vec![bad, TransformerSpec::new("k8s", "KubernetesGenerator")];

        let (active, failures) = registry.instantiate(&specs, &env(&dir));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "k8s");
        assert_eq!(failures[0].name, "compose");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::with_defaults();
        let specs = vec![
            TransformerSpec::new("gen", "ComposeGenerator"),
            TransformerSpec::new("gen", "KubernetesGenerator"),
        ];

        let (active, failures) = registry.instantiate(&specs, &env(&dir));
        assert_eq!(active.len(), 1);
        assert!(failures[0].cause.contains("duplicate"));
    }

    #[test]
    fn test_consumes_override() {
        let dir = TempDir::new().unwrap();
        let registry = TransformerRegistry::with_defaults();
        let specs = vec![TransformerSpec::new("pkg", "JavaPackager")
            .with_consumes(vec![ArtifactType::JarPackage])];

        let (active, _) = registry.instantiate(&specs, &env(&dir));
        assert_eq!(active[0].consumes, vec![ArtifactType::JarPackage]);
    }
}
