//! Run orchestration: detection walk, fixpoint scheduling and the output plan.

pub mod config;
mod error;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod scheduler;
pub mod walker;

pub use config::{PipelineConfig, DEFAULT_MAX_ROUNDS, DEFAULT_PIPELINE};
pub use error::PipelineError;
pub use orchestrator::Orchestrator;
pub use plan::{OutputPlan, PlannedMapping};
pub use report::{PlanReport, RunReport, ServiceReport};
pub use scheduler::{ScheduleOutcome, Scheduler};
pub use walker::{DetectionFailure, DetectionResult, IGNORE_FILE};
