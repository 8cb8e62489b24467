use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMappingKind {
    /// Replicate the source file or tree verbatim.
    Copy,
    /// Render the source template with the bound data.
    Template,
}

/// Declarative instruction for materializing one unit of generated content.
///
/// `destination_path` is relative to the output root. Mappings carry no
/// filesystem state; the output writer performs the actual work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMapping {
    pub kind: PathMappingKind,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_binding: Option<serde_json::Value>,
}

impl PathMapping {
    pub fn copy(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: PathMappingKind::Copy,
            source_path: source.into(),
            destination_path: destination.into(),
            template_binding: None,
        }
    }

    pub fn template<B: Serialize>(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        binding: &B,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: PathMappingKind::Template,
            source_path: source.into(),
            destination_path: destination.into(),
            template_binding: Some(serde_json::to_value(binding)?),
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination_path
    }
}
