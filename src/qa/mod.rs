//! Question/answer resolution for decisions a transformer cannot make alone.

mod engine;

pub use engine::{Answer, QaEngine, QaError};

/// Key prefix for per-service questions.
pub const SERVICES_KEY: &str = "kubeshift.services";

/// Builds a dotted question key from segments.
pub fn question_key(segments: &[&str]) -> String {
    segments.join(".")
}

/// Resolver contract. Asking the same `key` twice within a run yields the
/// same answer; in non-interactive mode the default is returned without
/// blocking.
pub trait QaResolver: Send + Sync {
    fn ask_multi_select(
        &self,
        key: &str,
        prompt: &str,
        help: &[String],
        options: &[String],
        default: &[String],
    ) -> Vec<String>;

    fn ask_select(
        &self,
        key: &str,
        prompt: &str,
        help: &[String],
        options: &[String],
        default: &str,
    ) -> String;
}
