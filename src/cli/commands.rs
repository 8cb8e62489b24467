use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Migrates source trees into container and orchestration deployment artifacts
#[derive(Parser, Debug)]
#[command(
    name = "kubeshift",
    about = "Migrates source trees into container and orchestration deployment artifacts",
    version,
    author,
    long_about = "kubeshift walks a source tree, lets a pipeline of transformers detect build \
                  descriptors, and converts them into Dockerfiles, Docker Compose files and \
                  Kubernetes manifests."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect services without generating anything",
        long_about = "Walks the source tree and prints the services and artifacts each \
                      transformer detected.\n\n\
                      Examples:\n  \
                      kubeshift plan ./app\n  \
                      kubeshift plan ./app --format json"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Generate deployment artifacts",
        long_about = "Runs the full pipeline and writes generated files below the output \
                      directory.\n\n\
                      Examples:\n  \
                      kubeshift transform ./app -o ./out\n  \
                      kubeshift transform ./app -o ./out --qa-skip\n  \
                      kubeshift transform ./app -o ./out -c pipeline.yaml --qa-cache answers.yaml"
    )]
    Transform(TransformArgs),

    #[command(about = "List registered transformer classes")]
    Transformers(TransformersArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(value_name = "SOURCE", help = "Source directory to analyze")]
    pub source: PathBuf,

    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        help = "Pipeline document (defaults to the built-in Java pipeline)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct TransformArgs {
    #[arg(value_name = "SOURCE", help = "Source directory to transform")]
    pub source: PathBuf,

    #[arg(short = 'o', long, value_name = "DIR", help = "Output directory")]
    pub output: PathBuf,

    #[arg(
        short = 'c',
        long,
        value_name = "FILE",
        help = "Pipeline document (defaults to the built-in Java pipeline)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Answer every question with its default")]
    pub qa_skip: bool,

    #[arg(
        long,
        value_name = "FILE",
        help = "YAML file replaying earlier answers; updated after the run"
    )]
    pub qa_cache: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Scheduler round limit before a cycle is declared")]
    pub max_rounds: Option<usize>,

    #[arg(long, value_name = "DIR", help = "Directory overriding built-in templates")]
    pub templates: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct TransformersArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_plan_defaults() {
        let args = CliArgs::parse_from(["kubeshift", "plan", "/tmp/app"]);
        match args.command {
            Commands::Plan(plan) => {
                assert_eq!(plan.source, PathBuf::from("/tmp/app"));
                assert_eq!(plan.format, OutputFormatArg::Human);
                assert!(plan.config.is_none());
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_transform_flags() {
        let args = CliArgs::parse_from([
            "kubeshift",
            "transform",
            "/tmp/app",
            "-o",
            "/tmp/out",
            "--qa-skip",
            "--qa-cache",
            "qa.yaml",
            "--max-rounds",
            "5",
            "-f",
            "json",
        ]);
        match args.command {
            Commands::Transform(t) => {
                assert_eq!(t.output, PathBuf::from("/tmp/out"));
                assert!(t.qa_skip);
                assert_eq!(t.qa_cache, Some(PathBuf::from("qa.yaml")));
                assert_eq!(t.max_rounds, Some(5));
                assert_eq!(t.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Transform command"),
        }
    }

    #[test]
    fn test_transform_requires_output() {
        assert!(CliArgs::try_parse_from(["kubeshift", "transform", "/tmp/app"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(CliArgs::try_parse_from(["kubeshift", "-v", "-q", "transformers"]).is_err());
    }

    #[test]
    fn test_global_log_level() {
        let args = CliArgs::parse_from(["kubeshift", "transformers", "--log-level", "debug"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
