use crate::artifact::PathMapping;
use serde::Serialize;

/// A path mapping with the round and transformer that produced it. Round 0
/// holds mappings added by the orchestrator before scheduling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMapping {
    pub round: usize,
    pub transformer: String,
    #[serde(flatten)]
    pub mapping: PathMapping,
}

/// Ordered accumulation of every path mapping produced by a run. Nothing is
/// deduplicated; the writer applies mappings in order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OutputPlan {
    entries: Vec<PlannedMapping>,
}

impl OutputPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(
        &mut self,
        round: usize,
        transformer: &str,
        mappings: impl IntoIterator<Item = PathMapping>,
    ) {
        self.entries
            .extend(mappings.into_iter().map(|mapping| PlannedMapping {
                round,
                transformer: transformer.to_string(),
                mapping,
            }));
    }

    pub fn append(&mut self, other: OutputPlan) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[PlannedMapping] {
        &self.entries
    }

    pub fn mappings(&self) -> Vec<PathMapping> {
        self.entries.iter().map(|e| e.mapping.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
