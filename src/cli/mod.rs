pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, PlanArgs, TransformArgs, TransformersArgs};
pub use output::{OutputFormat, OutputFormatter};
