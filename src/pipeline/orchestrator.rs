use super::config::PipelineConfig;
use super::plan::OutputPlan;
use super::report::{PlanReport, RunReport};
use super::scheduler::Scheduler;
use super::walker::{self, DetectionResult};
use super::PipelineError;
use crate::artifact::PathMapping;
use crate::environment::Environment;
use crate::output::{OutputWriter, WriteFailure, WriteSummary, SOURCE_DIR};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::qa::{QaEngine, QaResolver};
use crate::transformer::{ActiveTransformer, InitFailure, TransformerRegistry};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const ORCHESTRATOR: &str = "orchestrator";

/// Drives a run: environment, transformer instances, walk, scheduling and
/// output.
pub struct Orchestrator {
    config: PipelineConfig,
    registry: TransformerRegistry,
    qa: Arc<dyn QaResolver>,
    templates_dir: Option<PathBuf>,
    progress: Arc<dyn ProgressHandler>,
}

struct Prepared {
    source: PathBuf,
    env: Environment,
    active: Vec<ActiveTransformer>,
    init_failures: Vec<InitFailure>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            registry: TransformerRegistry::with_defaults(),
            qa: Arc::new(QaEngine::non_interactive()),
            templates_dir: None,
            progress: Arc::new(LoggingHandler),
        }
    }

    pub fn with_registry(mut self, registry: TransformerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_qa(mut self, qa: Arc<dyn QaResolver>) -> Self {
        self.qa = qa;
        self
    }

    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn prepare(&self, source: &Path) -> Result<Prepared, PipelineError> {
        let source = source
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| PipelineError::SourceNotFound(source.to_path_buf()))?;
        self.progress.on_progress(&ProgressEvent::Started {
            source: source.display().to_string(),
        });

        let mut env = Environment::new(&source, Arc::clone(&self.qa))?;
        if let Some(dir) = &self.templates_dir {
            env = env.with_templates_override(dir)?;
        }

        let (active, init_failures) = self.registry.instantiate(&self.config.transformers, &env);
        self.progress.on_progress(&ProgressEvent::TransformersInitialized {
            active: active.len(),
            failed: init_failures.len(),
        });

        Ok(Prepared {
            source,
            env,
            active,
            init_failures,
        })
    }

    async fn walk(&self, prepared: &Prepared, skip: &[PathBuf]) -> DetectionResult {
        let mut detection =
            walker::detect(&prepared.source, &prepared.active, skip, self.progress.as_ref()).await;
        detection.resolve_unnamed(&prepared.source);
        detection
    }

    /// Walks the source tree and reports what was detected, without
    /// transforming or writing anything.
    pub async fn plan(&self, source: &Path) -> Result<PlanReport, PipelineError> {
        let prepared = self.prepare(source)?;
        let skip = vec![prepared.env.scratch_root().to_path_buf()];
        let detection = self.walk(&prepared, &skip).await;
        prepared.env.cleanup();

        Ok(PlanReport {
            source: prepared.source,
            generated_at: Utc::now(),
            directories: detection.directories,
            detection_failures: detection.failures.clone(),
            services: detection.into_services(),
            init_failures: prepared.init_failures,
        })
    }

    /// Full run from `source` into `output`.
    ///
    /// Only a missing source, an environment failure or a cycle end the run
    /// early; every other failure is recorded in the report.
    pub async fn run(&self, source: &Path, output: &Path) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let prepared = self.prepare(source)?;

        let result = self.run_prepared(&prepared, output).await;
        prepared.env.cleanup();

        match &result {
            Ok(report) => self.progress.on_progress(&ProgressEvent::Completed {
                rounds: report.rounds,
                total_time: start.elapsed(),
            }),
            Err(e) => self.progress.on_progress(&ProgressEvent::Failed {
                error: e.to_string(),
            }),
        }
        result
    }

    async fn run_prepared(
        &self,
        prepared: &Prepared,
        output: &Path,
    ) -> Result<RunReport, PipelineError> {
        if let Err(e) = std::fs::create_dir_all(output) {
            warn!(output = %output.display(), error = %e, "Cannot create output directory");
        }
        let output = output.canonicalize().unwrap_or_else(|_| output.to_path_buf());
        let skip = vec![output.clone(), prepared.env.scratch_root().to_path_buf()];

        let mut report = RunReport::new(prepared.source.clone(), output.clone());
        report.init_failures = prepared.init_failures.clone();

        let detection = self.walk(prepared, &skip).await;
        report.detection_failures = detection.failures.clone();
        let initial = detection.into_artifacts();
        debug!(artifacts = initial.len(), "Initial pending set");

        let scheduler = Scheduler::new(prepared.active.clone(), self.config.max_rounds);
        let scheduled = scheduler.run(initial, self.progress.as_ref()).await?;
        report.rounds = scheduled.rounds;
        report.record_outcomes(scheduled.outcomes);

        let mut plan = OutputPlan::new();
        if self.config.copy_source {
            plan.extend(
                0,
                ORCHESTRATOR,
                vec![PathMapping::copy(&prepared.source, SOURCE_DIR)],
            );
        }
        plan.append(scheduled.plan);
        report.planned_mappings = plan.len();

        let summary = self.write(plan, &output, prepared.env.scratch_root()).await;
        self.progress.on_progress(&ProgressEvent::OutputWritten {
            mappings: summary.mappings_written,
            failures: summary.failures.len(),
        });
        report.files_written = summary.files_written;
        report.write_failures = summary.failures;

        info!(
            services = report.services.len(),
            succeeded = report.succeeded_count(),
            skipped = report.skipped_count(),
            files = report.files_written,
            "Run finished"
        );
        Ok(report)
    }

    async fn write(&self, plan: OutputPlan, output: &Path, scratch_root: &Path) -> WriteSummary {
        let writer = OutputWriter::new(output).skipping(scratch_root);
        let mappings = plan.mappings();
        let destinations: Vec<PathBuf> =
            mappings.iter().map(|m| m.destination_path.clone()).collect();

        tokio::task::spawn_blocking(move || writer.write_plan(&mappings))
            .await
            .unwrap_or_else(|e| WriteSummary {
                failures: destinations
                    .into_iter()
                    .map(|destination| WriteFailure {
                        destination,
                        cause: format!("writer task panicked: {}", e),
                    })
                    .collect(),
                ..Default::default()
            })
    }
}
