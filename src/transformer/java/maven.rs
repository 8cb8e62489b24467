use super::build::{self, BuildPlan, DEFAULT_APP_PATH};
use super::springboot::{self, SPRING_BOOT_GROUP};
use crate::artifact::{Artifact, ArtifactType, MavenConfig, Packaging, PathType, SpringBootConfig};
use crate::environment::Environment;
use crate::transformer::{
    detected, ArtifactOutput, Binding, DetectedServices, TransformBatch, Transformer,
    TransformerError, TransformerSpec,
};
use roxmltree::{Document, Node};
use serde::Deserialize;
use serde_json::Map;
use std::path::Path;
use tracing::debug;

const POM_FILE: &str = "pom.xml";
const JAVA_VERSION_PROPERTIES: &[&str] = &[
    "maven.compiler.release",
    "maven.compiler.source",
    "java.version",
    "maven.compiler.target",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MavenAnalyserConfig {
    pub default_maven_version: String,
    pub default_java_version: String,
    pub app_path_in_build_container: String,
}

impl Default for MavenAnalyserConfig {
    fn default() -> Self {
        Self {
            default_maven_version: "3.9.6".to_string(),
            default_java_version: "17".to_string(),
            app_path_in_build_container: DEFAULT_APP_PATH.to_string(),
        }
    }
}

/// The parts of a POM the analyser needs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Pom {
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub final_name: Option<String>,
    pub java_version: Option<String>,
    pub spring_boot_version: Option<Option<String>>,
}

impl Pom {
    pub fn parse(content: &str) -> Result<Self, roxmltree::Error> {
        let doc = Document::parse(content)?;
        let project = doc.root_element();
        let mut pom = Pom::default();

        for child in project.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "artifactId" => pom.artifact_id = text(child).unwrap_or_default(),
                "version" => pom.version = text(child),
                "packaging" => pom.packaging = text(child),
                "build" => pom.final_name = child_text(child, "finalName"),
                "properties" => {
                    pom.java_version = JAVA_VERSION_PROPERTIES
                        .iter()
                        .find_map(|p| child_text(child, p))
                        .map(|v| super::versions::normalize(&v));
                }
                "parent" if child_text(child, "groupId").as_deref() == Some(SPRING_BOOT_GROUP) => {
                    pom.spring_boot_version = Some(child_text(child, "version"));
                }
                _ => {}
            }
        }

        if pom.spring_boot_version.is_none() {
            let boot_dependency = project
                .children()
                .filter(|n| n.has_tag_name("dependencies"))
                .flat_map(|deps| deps.children().filter(|n| n.has_tag_name("dependency")))
                .find(|dep| child_text(*dep, "groupId").as_deref() == Some(SPRING_BOOT_GROUP));
            if let Some(dep) = boot_dependency {
                pom.spring_boot_version = Some(child_text(dep, "version"));
            }
        }

        Ok(pom)
    }

    pub fn packaging(&self) -> Packaging {
        self.packaging
            .as_deref()
            .and_then(Packaging::from_name)
            .unwrap_or_default()
    }

    /// Archive file produced by `mvn package`, with the `${project.*}`
    /// references Maven itself would substitute.
    pub fn deployment_file(&self) -> String {
        let packaging = self.packaging();
        let base = match &self.final_name {
            Some(name) => name
                .replace("${project.artifactId}", &self.artifact_id)
                .replace("${artifactId}", &self.artifact_id)
                .replace(
                    "${project.version}",
                    self.version.as_deref().unwrap_or_default(),
                ),
            None => match &self.version {
                Some(version) if !version.contains('$') => {
                    format!("{}-{}", self.artifact_id, version)
                }
                _ => self.artifact_id.clone(),
            },
        };
        format!("{}.{}", base, packaging)
    }
}

fn text(node: Node) -> Option<String> {
    node.text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn child_text(node: Node, name: &str) -> Option<String> {
    node.children().find(|n| n.has_tag_name(name)).and_then(text)
}

/// Detects Maven projects and turns them into packaged-archive artifacts.
pub struct MavenAnalyser {
    binding: Binding<MavenAnalyserConfig>,
}

impl MavenAnalyser {
    pub fn new() -> Self {
        Self {
            binding: Binding::unbound("MavenAnalyser"),
        }
    }

    fn transform_one(
        &self,
        env: &Environment,
        artifact: &Artifact,
    ) -> Result<ArtifactOutput, TransformerError> {
        let pom_file = build::require_path(artifact, PathType::MavenPomFile)?;
        let service_dir = build::require_path(artifact, PathType::ServiceDirectory)?;
        let service = build::require_service(artifact)?;
        let pom = read_pom(pom_file)?;

        let config = &self.binding.config;
        let maven = artifact.config::<MavenConfig>();
        let packaging = maven.map(|m| m.packaging).unwrap_or_else(|| pom.packaging());
        let java_version = maven
            .and_then(|m| m.java_version.clone())
            .or(pom.java_version.clone())
            .unwrap_or_else(|| config.default_java_version.clone());
        let app_path = config.app_path_in_build_container.clone();

        let mut binding = Map::new();
        binding.insert(
            "maven_version".into(),
            config.default_maven_version.clone().into(),
        );

        let plan = BuildPlan {
            packaging,
            deployment_file: pom.deployment_file(),
            java_version,
            deployment_dir: format!("{}/target", app_path.trim_end_matches('/')),
            build_template: "Dockerfile.maven-build",
            binding,
            app_path,
        };
        build::package_artifact(env, artifact, service, service_dir, plan)
    }
}

impl Default for MavenAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for MavenAnalyser {
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError> {
        let config = spec.decode_config()?;
        self.binding.bind(spec, env, config);
        Ok(())
    }

    fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
        (&self.binding.spec, self.binding.env.as_ref())
    }

    fn default_consumes(&self) -> Vec<ArtifactType> {
        vec![ArtifactType::MavenBuild]
    }

    fn directory_detect(&self, dir: &Path) -> Result<DetectedServices, TransformerError> {
        let pom_file = dir.join(POM_FILE);
        if !pom_file.is_file() {
            return Ok(DetectedServices::new());
        }
        let pom = read_pom(&pom_file)?;
        if pom.packaging.as_deref() == Some("pom") {
            debug!(dir = %dir.display(), "Skipping aggregator POM");
            return Ok(DetectedServices::new());
        }

        let mut artifact = Artifact::new(pom.artifact_id.clone(), ArtifactType::MavenBuild)
            .with_config(MavenConfig {
                packaging: pom.packaging(),
                artifact_id: pom.artifact_id.clone(),
                final_name: pom.final_name.clone(),
                java_version: pom.java_version.clone(),
            })
            .with_path(PathType::MavenPomFile, &pom_file)
            .with_path(PathType::ServiceDirectory, dir);

        if let Some(version) = pom.spring_boot_version.clone() {
            let (app_name, profiles) = springboot::app_name_and_profiles(dir);
            if !app_name.is_empty() {
                artifact.name = app_name.clone();
            }
            artifact.set_config(SpringBootConfig {
                app_name,
                version,
                profiles: (!profiles.is_empty()).then_some(profiles),
            });
        }

        debug!(dir = %dir.display(), service = %artifact.name, "Detected Maven project");
        Ok(detected(artifact.name.clone(), artifact))
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

fn read_pom(path: &Path) -> Result<Pom, TransformerError> {
    let content = std::fs::read_to_string(path).map_err(|e| TransformerError::io(path, e))?;
    Pom::parse(&content).map_err(|e| TransformerError::parse(path, e))
}
