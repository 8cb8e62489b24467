//! The transformer plugin contract and the built-in transformers.

mod batch;
mod error;
mod ir_merge;
pub mod registry;
mod spec;

pub mod compose;
pub mod java;
pub mod kubernetes;

pub use batch::{ArtifactOutcome, ArtifactOutput, OutcomeStatus, TransformBatch};
pub use error::TransformerError;
pub use registry::{ActiveTransformer, InitFailure, TransformerRegistry};
pub use spec::TransformerSpec;

use crate::artifact::{Artifact, ArtifactType};
use crate::environment::Environment;
use std::collections::BTreeMap;
use std::path::Path;

/// Artifacts detected in one directory, keyed by service name. The empty key
/// holds artifacts whose service could not be named yet.
pub type DetectedServices = BTreeMap<String, Vec<Artifact>>;

/// A pipeline plugin.
///
/// `init` runs once before any other call. `directory_detect` and `transform`
/// take `&self` and may be invoked concurrently with other transformers; an
/// instance writes only below its own scratch path.
pub trait Transformer: Send + Sync {
    /// Binds the declarative config and environment. An error disables this
    /// instance for the run.
    fn init(&mut self, spec: &TransformerSpec, env: Environment) -> Result<(), TransformerError>;

    fn config(&self) -> (&TransformerSpec, Option<&Environment>);

    /// Artifact types routed to `transform` unless `TransformerSpec::consumes`
    /// overrides them.
    fn default_consumes(&self) -> Vec<ArtifactType>;

    /// Inspects only the immediate contents of `dir`. Must not write to disk.
    fn directory_detect(&self, dir: &Path) -> Result<DetectedServices, TransformerError>;

    /// Consumes `new_artifacts`; `seen` is available for cross-referencing.
    fn transform(
        &self,
        new_artifacts: Vec<Artifact>,
        seen: &[Artifact],
    ) -> Result<TransformBatch, TransformerError>;
}

/// Config and environment bound by `init`, shared by the built-in
/// transformers.
#[derive(Debug, Clone)]
pub(crate) struct Binding<C> {
    pub spec: TransformerSpec,
    pub env: Option<Environment>,
    pub config: C,
}

impl<C: Default> Binding<C> {
    pub fn unbound(class: &str) -> Self {
        Self {
            spec: TransformerSpec::new(class, class),
            env: None,
            config: C::default(),
        }
    }
}

impl<C> Binding<C> {
    pub fn bind(&mut self, spec: &TransformerSpec, env: Environment, config: C) {
        self.spec = spec.clone();
        self.env = Some(env);
        self.config = config;
    }

    pub fn env(&self) -> Result<&Environment, TransformerError> {
        self.env
            .as_ref()
            .ok_or_else(|| TransformerError::NotInitialized(self.spec.name.clone()))
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Single-entry detection result.
pub(crate) fn detected(name: String, artifact: Artifact) -> DetectedServices {
    let mut services = DetectedServices::new();
    services.insert(name, vec![artifact]);
    services
}
