use kubeshift::cli::commands::{CliArgs, Commands};
use kubeshift::cli::handlers::{handle_plan, handle_transform, handle_transformers};
use kubeshift::util::logging::{init_logging, parse_level, LoggingConfig};
use kubeshift::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("kubeshift v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Plan(plan_args) => handle_plan(plan_args, args.quiet).await,
        Commands::Transform(transform_args) => handle_transform(transform_args, args.quiet).await,
        Commands::Transformers(list_args) => handle_transformers(list_args),
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins over `-v`/`-q`, which win over `KUBESHIFT_LOG_LEVEL`.
fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("KUBESHIFT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("KUBESHIFT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
