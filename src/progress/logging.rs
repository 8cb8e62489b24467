//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { source } => {
                info!(source = %source, "Starting run");
            }
            ProgressEvent::TransformersInitialized { active, failed } => {
                if *failed > 0 {
                    warn!(active, failed, "Some transformers were disabled");
                } else {
                    info!(active, "Transformers initialized");
                }
            }
            ProgressEvent::DetectionComplete {
                directories,
                services,
                artifacts,
                duration,
            } => {
                info!(
                    directories,
                    services,
                    artifacts,
                    duration_ms = duration.as_millis(),
                    "Detection complete"
                );
            }
            ProgressEvent::DetectionFailed {
                transformer,
                directory,
                error,
            } => {
                warn!(
                    transformer = %transformer,
                    directory = %directory,
                    error = %error,
                    "Detector failed"
                );
            }
            ProgressEvent::RoundStarted { round, pending } => {
                info!(round, pending, "Starting round");
            }
            ProgressEvent::TransformerComplete {
                round,
                transformer,
                consumed,
                created,
                skipped,
                duration,
            } => {
                if *skipped > 0 {
                    warn!(
                        round,
                        transformer = %transformer,
                        consumed,
                        created,
                        skipped,
                        "Transformer skipped artifacts"
                    );
                } else {
                    debug!(
                        round,
                        transformer = %transformer,
                        consumed,
                        created,
                        duration_ms = duration.as_millis(),
                        "Transformer complete"
                    );
                }
            }
            ProgressEvent::RoundComplete {
                round,
                created,
                mappings,
                duration,
            } => {
                info!(
                    round,
                    created,
                    mappings,
                    duration_ms = duration.as_millis(),
                    "Round complete"
                );
            }
            ProgressEvent::OutputWritten { mappings, failures } => {
                if *failures > 0 {
                    warn!(mappings, failures, "Output written with failures");
                } else {
                    info!(mappings, "Output written");
                }
            }
            ProgressEvent::Completed { rounds, total_time } => {
                info!(
                    rounds,
                    total_time_ms = total_time.as_millis(),
                    "Run complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Run failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                source: "/src".to_string(),
            },
            ProgressEvent::TransformersInitialized {
                active: 4,
                failed: 1,
            },
            ProgressEvent::DetectionComplete {
                directories: 3,
                services: 2,
                artifacts: 2,
                duration: Duration::from_millis(5),
            },
            ProgressEvent::DetectionFailed {
                transformer: "maven".to_string(),
                directory: "/src/broken".to_string(),
                error: "bad pom".to_string(),
            },
            ProgressEvent::RoundStarted {
                round: 1,
                pending: 2,
            },
            ProgressEvent::TransformerComplete {
                round: 1,
                transformer: "maven".to_string(),
                consumed: 2,
                created: 1,
                skipped: 1,
                duration: Duration::from_millis(3),
            },
            ProgressEvent::RoundComplete {
                round: 1,
                created: 1,
                mappings: 2,
                duration: Duration::from_millis(4),
            },
            ProgressEvent::OutputWritten {
                mappings: 5,
                failures: 0,
            },
            ProgressEvent::Completed {
                rounds: 4,
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::Failed {
                error: "cycle".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
