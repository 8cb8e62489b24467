use super::walker::DetectionFailure;
use crate::artifact::Artifact;
use crate::output::WriteFailure;
use crate::transformer::{ArtifactOutcome, InitFailure};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcomes for one service.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport {
    pub succeeded: Vec<ArtifactOutcome>,
    pub skipped: Vec<ArtifactOutcome>,
}

/// Result of a full `transform` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub rounds: usize,
    pub services: BTreeMap<String, ServiceReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_failures: Vec<InitFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detection_failures: Vec<DetectionFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub write_failures: Vec<WriteFailure>,
    pub planned_mappings: usize,
    pub files_written: usize,
}

impl RunReport {
    pub fn new(source: PathBuf, output: PathBuf) -> Self {
        Self {
            source,
            output,
            generated_at: Utc::now(),
            rounds: 0,
            services: BTreeMap::new(),
            init_failures: Vec::new(),
            detection_failures: Vec::new(),
            write_failures: Vec::new(),
            planned_mappings: 0,
            files_written: 0,
        }
    }

    /// Files each outcome under its service.
    pub fn record_outcomes(&mut self, outcomes: impl IntoIterator<Item = ArtifactOutcome>) {
        for outcome in outcomes {
            let service = self.services.entry(outcome.service.clone()).or_default();
            if outcome.is_success() {
                service.succeeded.push(outcome);
            } else {
                service.skipped.push(outcome);
            }
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.services.values().map(|s| s.succeeded.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.services.values().map(|s| s.skipped.len()).sum()
    }

    /// True when nothing was skipped, disabled or dropped.
    pub fn is_clean(&self) -> bool {
        self.skipped_count() == 0
            && self.init_failures.is_empty()
            && self.detection_failures.is_empty()
            && self.write_failures.is_empty()
    }
}

/// Result of a detection-only `plan` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub source: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub directories: usize,
    pub services: BTreeMap<String, Vec<Artifact>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_failures: Vec<InitFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detection_failures: Vec<DetectionFailure>,
}

impl PlanReport {
    pub fn artifact_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }
}
