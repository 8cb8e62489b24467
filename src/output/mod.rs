//! Materialization of the output plan.

mod render;
mod writer;

pub use render::{render, RenderError};
pub use writer::{OutputError, OutputWriter, WriteFailure, WriteSummary};

/// Output subdirectory that mirrors the source tree.
pub const SOURCE_DIR: &str = "source";
