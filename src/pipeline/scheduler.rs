//! Fixpoint transform scheduling.
//!
//! Each round hands the pending artifacts to every transformer consuming
//! their type. Transformers run concurrently on the blocking pool; their
//! batches are merged in registration order once the whole round has
//! finished, so round N is complete before round N+1 starts.

use super::plan::OutputPlan;
use super::PipelineError;
use crate::artifact::{Artifact, ArtifactType};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::transformer::{
    ActiveTransformer, ArtifactOutcome, OutcomeStatus, TransformBatch, TransformerError,
};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything the scheduler accumulated over a run.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    pub rounds: usize,
    pub plan: OutputPlan,
    pub outcomes: Vec<ArtifactOutcome>,
    pub seen: Vec<Artifact>,
}

pub struct Scheduler {
    transformers: Vec<ActiveTransformer>,
    max_rounds: usize,
}

struct TransformerRun {
    consumed: Vec<Artifact>,
    result: Result<TransformBatch, TransformerError>,
    duration: Duration,
}

impl Scheduler {
    pub fn new(transformers: Vec<ActiveTransformer>, max_rounds: usize) -> Self {
        Self {
            transformers,
            max_rounds,
        }
    }

    fn is_consumed(&self, artifact_type: ArtifactType) -> bool {
        self.transformers
            .iter()
            .any(|t| t.consumes_type(artifact_type))
    }

    /// Runs rounds until no transformer has pending input. Artifacts nobody
    /// consumes are terminal and go straight to the seen set without costing
    /// a round.
    pub async fn run(
        &self,
        initial: Vec<Artifact>,
        progress: &dyn ProgressHandler,
    ) -> Result<ScheduleOutcome, PipelineError> {
        let mut outcome = ScheduleOutcome::default();
        let mut pending = initial;

        loop {
            let (routable, terminal): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|a| self.is_consumed(a.artifact_type));
            if !terminal.is_empty() {
                debug!(count = terminal.len(), "Artifacts with no consumer are terminal");
            }
            outcome.seen.extend(terminal);

            if routable.is_empty() {
                break;
            }
            if outcome.rounds == self.max_rounds {
                return Err(PipelineError::CycleDetected {
                    rounds: self.max_rounds,
                    pending: describe_pending(&routable),
                });
            }
            outcome.rounds += 1;
            pending = self
                .run_round(outcome.rounds, routable, &mut outcome, progress)
                .await;
        }

        info!(rounds = outcome.rounds, mappings = outcome.plan.len(), "Reached fixpoint");
        Ok(outcome)
    }

    async fn run_round(
        &self,
        round: usize,
        routable: Vec<Artifact>,
        outcome: &mut ScheduleOutcome,
        progress: &dyn ProgressHandler,
    ) -> Vec<Artifact> {
        let start = Instant::now();
        progress.on_progress(&ProgressEvent::RoundStarted {
            round,
            pending: routable.len(),
        });

        let seen = Arc::new(outcome.seen.clone());
        let tasks = self.transformers.iter().filter_map(|t| {
            let batch: Vec<Artifact> = routable
                .iter()
                .filter(|a| t.consumes_type(a.artifact_type))
                .cloned()
                .collect();
            if batch.is_empty() {
                return None;
            }
            let transformer = t.inner.clone();
            let seen = Arc::clone(&seen);
            let name = t.name.clone();
            Some(async move {
                let consumed = batch.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let result = transformer.transform(batch, &seen);
                    (result, started.elapsed())
                })
                .await;
                let (result, duration) = joined.unwrap_or_else(|e| {
                    (Err(TransformerError::Panicked(e.to_string())), Duration::ZERO)
                });
                (
                    name,
                    TransformerRun {
                        consumed,
                        result,
                        duration,
                    },
                )
            })
        });

        // join_all keeps registration order regardless of completion order.
        let runs = join_all(tasks).await;

        let mut created = Vec::new();
        let mut mappings = 0;
        for (name, run) in runs {
            let batch = match run.result {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(transformer = %name, round, error = %e, "Transform call failed");
                    failed_batch(&name, &run.consumed, &e)
                }
            };
            let skipped = batch.outcomes.iter().filter(|o| !o.is_success()).count();
            progress.on_progress(&ProgressEvent::TransformerComplete {
                round,
                transformer: name.clone(),
                consumed: run.consumed.len(),
                created: batch.created_artifacts.len(),
                skipped,
                duration: run.duration,
            });
            mappings += batch.path_mappings.len();
            outcome.plan.extend(round, &name, batch.path_mappings);
            outcome.outcomes.extend(batch.outcomes);
            created.extend(batch.created_artifacts);
        }

        outcome.seen.extend(routable);
        progress.on_progress(&ProgressEvent::RoundComplete {
            round,
            created: created.len(),
            mappings,
            duration: start.elapsed(),
        });
        created
    }
}

/// A call-level failure becomes a skip for every artifact in the call.
fn failed_batch(transformer: &str, consumed: &[Artifact], error: &TransformerError) -> TransformBatch {
    let mut batch = TransformBatch::new();
    batch.outcomes = consumed
        .iter()
        .map(|a| ArtifactOutcome {
            transformer: transformer.to_string(),
            service: a.service_name().to_string(),
            artifact_type: a.artifact_type,
            status: OutcomeStatus::Skipped {
                cause: error.to_string(),
            },
        })
        .collect();
    batch
}

fn describe_pending(artifacts: &[Artifact]) -> String {
    let mut counts: BTreeMap<ArtifactType, usize> = BTreeMap::new();
    for artifact in artifacts {
        *counts.entry(artifact.artifact_type).or_default() += 1;
    }
    counts
        .iter()
        .map(|(t, n)| format!("{} x{}", t, n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::progress::NoOpHandler;
    use crate::transformer::{
        ArtifactOutput, DetectedServices, Transformer, TransformerSpec,
    };
    use std::path::Path;

    /// Consumes one type and emits one artifact of another per input.
    struct Relay {
        spec: TransformerSpec,
        from: ArtifactType,
        to: Option<ArtifactType>,
    }

    impl Transformer for Relay {
        fn init(&mut self, _: &TransformerSpec, _: Environment) -> Result<(), TransformerError> {
            Ok(())
        }

        fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
            (&self.spec, None)
        }

        fn default_consumes(&self) -> Vec<ArtifactType> {
            vec![self.from]
        }

        fn directory_detect(&self, _: &Path) -> Result<DetectedServices, TransformerError> {
            Ok(DetectedServices::new())
        }

        fn transform(
            &self,
            new_artifacts: Vec<Artifact>,
            _seen: &[Artifact],
        ) -> Result<TransformBatch, TransformerError> {
            Ok(TransformBatch::collect(&self.spec.name, &new_artifacts, |a| {
                if a.name == "bad" {
                    return Err(TransformerError::Write("bad input".into()));
                }
                let mut output = ArtifactOutput::new()
                    .with_mapping(crate::artifact::PathMapping::copy("/tmp/x", format!("{}.out", a.name)));
                if let Some(to) = self.to {
                    output = output.with_artifact(Artifact::new(a.name.clone(), to));
                }
                Ok(output)
            }))
        }
    }

    fn active(name: &str, from: ArtifactType, to: Option<ArtifactType>) -> ActiveTransformer {
        ActiveTransformer {
            name: name.to_string(),
            class: "Relay".to_string(),
            consumes: vec![from],
            inner: Arc::new(Relay {
                spec: TransformerSpec::new(name, "Relay"),
                from,
                to,
            }),
        }
    }

    #[tokio::test]
    async fn test_unconsumed_output_terminates_after_one_round() {
        let scheduler = Scheduler::new(
            vec![active("a", ArtifactType::MavenBuild, Some(ArtifactType::JarPackage))],
            8,
        );
        let outcome = scheduler
            .run(vec![Artifact::new("svc", ArtifactType::MavenBuild)], &NoOpHandler)
            .await
            .unwrap();

        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.seen.len(), 2);
        assert_eq!(outcome.plan.len(), 1);
    }

    #[tokio::test]
    async fn test_self_feeding_transformer_is_a_cycle() {
        let scheduler = Scheduler::new(vec![active("loop", ArtifactType::Ir, Some(ArtifactType::Ir))], 5);
        let err = scheduler
            .run(vec![Artifact::new("svc", ArtifactType::Ir)], &NoOpHandler)
            .await
            .unwrap_err();

        match err {
            PipelineError::CycleDetected { rounds, pending } => {
                assert_eq!(rounds, 5);
                assert!(pending.contains("IR"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_chain_merges_in_registration_order() {
        let scheduler = Scheduler::new(
            vec![
                active("first", ArtifactType::GradleBuild, None),
                active("second", ArtifactType::GradleBuild, Some(ArtifactType::WarPackage)),
                active("third", ArtifactType::WarPackage, None),
            ],
            8,
        );
        let outcome = scheduler
            .run(
                vec![
                    Artifact::new("a", ArtifactType::GradleBuild),
                    Artifact::new("b", ArtifactType::GradleBuild),
                ],
                &NoOpHandler,
            )
            .await
            .unwrap();

        assert_eq!(outcome.rounds, 2);
        let order: Vec<_> = outcome
            .plan
            .entries()
            .iter()
            .map(|e| (e.round, e.transformer.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, "first"),
                (1, "first"),
                (1, "second"),
                (1, "second"),
                (2, "third"),
                (2, "third")
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_artifact_isolated() {
        let scheduler = Scheduler::new(vec![active("a", ArtifactType::MavenBuild, None)], 4);
        let outcome = scheduler
            .run(
                vec![
                    Artifact::new("one", ArtifactType::MavenBuild),
                    Artifact::new("bad", ArtifactType::MavenBuild),
                    Artifact::new("two", ArtifactType::MavenBuild),
                ],
                &NoOpHandler,
            )
            .await
            .unwrap();

        assert_eq!(outcome.plan.len(), 2);
        let skipped: Vec<_> = outcome.outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].service, "bad");
    }

    #[tokio::test]
    async fn test_call_failure_marks_every_artifact() {
        struct Broken(TransformerSpec);
        impl Transformer for Broken {
            fn init(&mut self, _: &TransformerSpec, _: Environment) -> Result<(), TransformerError> {
                Ok(())
            }
            fn config(&self) -> (&TransformerSpec, Option<&Environment>) {
                (&self.0, None)
            }
            fn default_consumes(&self) -> Vec<ArtifactType> {
                vec![ArtifactType::Ir]
            }
            fn directory_detect(&self, _: &Path) -> Result<DetectedServices, TransformerError> {
                Ok(DetectedServices::new())
            }
            fn transform(&self, _: Vec<Artifact>, _: &[Artifact]) -> Result<TransformBatch, TransformerError> {
                Err(TransformerError::NotInitialized(self.0.name.clone()))
            }
        }

        let scheduler = Scheduler::new(
            vec![ActiveTransformer {
                name: "broken".into(),
                class: "Broken".into(),
                consumes: vec![ArtifactType::Ir],
                inner: Arc::new(Broken(TransformerSpec::new("broken", "Broken"))),
            }],
            4,
        );
        let outcome = scheduler
            .run(
                vec![Artifact::new("a", ArtifactType::Ir), Artifact::new("b", ArtifactType::Ir)],
                &NoOpHandler,
            )
            .await
            .unwrap();
        assert_eq!(outcome.outcomes.len(), 2);
        assert!(outcome.outcomes.iter().all(|o| !o.is_success()));
        assert_eq!(outcome.seen.len(), 2);
    }
}
