//! kubeshift - pluggable transformer pipeline for migrating source trees into
//! container deployment artifacts
//!
//! A run walks a source tree, lets every configured transformer detect the
//! services it recognizes, and then routes the resulting artifacts between
//! transformers until no transformer has anything left to consume. Generated
//! files are collected into an output plan and written below one output
//! directory.
//!
//! # Core Concepts
//!
//! - **Artifact**: a named, typed bag of configuration payloads and paths
//! - **Transformer**: a plugin that detects services in a directory and turns
//!   the artifacts it consumes into new artifacts and path mappings
//! - **IR**: the intermediate representation of services and containers that
//!   the deployment generators consume
//! - **QA**: question/answer resolution for decisions a transformer cannot
//!   make alone, optionally cached for replay
//!
//! # Example Usage
//!
//! ```no_run
//! use kubeshift::{Orchestrator, PipelineConfig};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), kubeshift::PipelineError> {
//! let orchestrator = Orchestrator::new(PipelineConfig::default());
//! let report = orchestrator
//!     .run(Path::new("./app"), Path::new("./out"))
//!     .await?;
//! println!("{} files written in {} rounds", report.files_written, report.rounds);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`artifact`]: artifacts, tags, config payloads and path mappings
//! - [`transformer`]: the transformer contract, registry and built-in transformers
//! - [`pipeline`]: detection walk, fixpoint scheduler and run orchestration
//! - [`output`]: template rendering and output plan materialization
//! - [`qa`]: question/answer engine

pub mod artifact;
pub mod cli;
pub mod config;
pub mod environment;
pub mod ir;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod qa;
pub mod transformer;
pub mod util;

pub use artifact::{Artifact, ArtifactType, ConfigType, PathMapping, PathType};
pub use config::{ConfigError, KubeshiftConfig};
pub use environment::{Environment, EnvironmentError};
pub use ir::Ir;
pub use pipeline::{Orchestrator, PipelineConfig, PipelineError, PlanReport, RunReport};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use qa::{QaEngine, QaResolver};
pub use transformer::{Transformer, TransformerError, TransformerRegistry, TransformerSpec};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
