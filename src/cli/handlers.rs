use super::commands::{PlanArgs, TransformArgs, TransformersArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::KubeshiftConfig;
use crate::pipeline::{Orchestrator, PipelineConfig};
use crate::progress::{LoggingHandler, NoOpHandler, ProgressHandler};
use crate::qa::{QaEngine, QaResolver};
use crate::transformer::TransformerRegistry;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub async fn handle_plan(args: &PlanArgs, quiet: bool) -> i32 {
    match run_plan(args, quiet).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Plan failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_transform(args: &TransformArgs, quiet: bool) -> i32 {
    match run_transform(args, quiet).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Transform failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_transformers(args: &TransformersArgs) -> i32 {
    let registry = TransformerRegistry::with_defaults();
    match OutputFormatter::new(args.format.into()).format_classes(&registry.classes()) {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn load_pipeline(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading pipeline document");
            PipelineConfig::from_file(path).context("Failed to load pipeline document")
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn progress_handler(quiet: bool) -> Arc<dyn ProgressHandler> {
    if quiet {
        Arc::new(NoOpHandler)
    } else {
        Arc::new(LoggingHandler)
    }
}

fn emit(format: OutputFormat, text: String) {
    if format == OutputFormat::Human {
        println!("{}", text.trim_end());
    } else {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
    }
}

async fn run_plan(args: &PlanArgs, quiet: bool) -> Result<()> {
    let settings = KubeshiftConfig::default();
    settings.validate()?;

    let mut pipeline = load_pipeline(args.config.as_deref())?;
    if let Some(rounds) = settings.max_rounds {
        pipeline = pipeline.with_max_rounds(rounds);
    }

    let mut orchestrator = Orchestrator::new(pipeline).with_progress(progress_handler(quiet));
    if let Some(dir) = &settings.templates_dir {
        orchestrator = orchestrator.with_templates_dir(dir);
    }

    let report = orchestrator.plan(&args.source).await?;
    let format: OutputFormat = args.format.into();
    emit(format, OutputFormatter::new(format).format_plan(&report)?);
    Ok(())
}

/// Flags override `KUBESHIFT_*` settings, which override the pipeline
/// document.
fn resolve_settings(args: &TransformArgs) -> Result<KubeshiftConfig> {
    let mut settings = KubeshiftConfig::default();
    if args.qa_skip {
        settings.qa_skip = true;
    }
    if let Some(cache) = &args.qa_cache {
        settings.qa_cache = Some(cache.clone());
    }
    if let Some(rounds) = args.max_rounds {
        settings.max_rounds = Some(rounds);
    }
    if let Some(dir) = &args.templates {
        settings.templates_dir = Some(dir.clone());
    }
    settings.validate()?;
    Ok(settings)
}

fn build_qa(settings: &KubeshiftConfig) -> Result<Arc<QaEngine>> {
    let interactive = !settings.qa_skip && atty::is(atty::Stream::Stdin);
    let mut engine = if interactive {
        QaEngine::interactive()
    } else {
        QaEngine::non_interactive()
    };
    if let Some(cache) = &settings.qa_cache {
        engine = engine.with_cache_file(cache)?;
    }
    debug!(interactive, cache = ?settings.qa_cache, "QA engine ready");
    Ok(Arc::new(engine))
}

async fn run_transform(args: &TransformArgs, quiet: bool) -> Result<()> {
    let settings = resolve_settings(args)?;
    debug!("{}", settings);

    let mut pipeline = load_pipeline(args.config.as_deref())?;
    if let Some(rounds) = settings.max_rounds {
        pipeline = pipeline.with_max_rounds(rounds);
    }

    let qa = build_qa(&settings)?;
    let resolver: Arc<dyn QaResolver> = qa.clone();
    let mut orchestrator = Orchestrator::new(pipeline)
        .with_qa(resolver)
        .with_progress(progress_handler(quiet));
    if let Some(dir) = &settings.templates_dir {
        orchestrator = orchestrator.with_templates_dir(dir);
    }

    let result = orchestrator.run(&args.source, &args.output).await;

    // Answers given before a failure are still worth replaying.
    if let Err(e) = qa.persist() {
        warn!(error = %e, "Failed to persist QA cache");
    }

    let report = result?;
    info!(
        output = %report.output.display(),
        files = report.files_written,
        "Transformation written"
    );
    let format: OutputFormat = args.format.into();
    emit(format, OutputFormatter::new(format).format_run(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormatArg;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn transform_args(source: PathBuf, output: PathBuf) -> TransformArgs {
        TransformArgs {
            source,
            output,
            config: None,
            qa_skip: true,
            qa_cache: None,
            max_rounds: None,
            templates: None,
            format: OutputFormatArg::Json,
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_source_exits_nonzero() {
        let dir = TempDir::new().unwrap();
        let args = transform_args(dir.path().join("missing"), dir.path().join("out"));
        assert_eq!(handle_transform(&args, true).await, 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_pipeline_document() {
        let dir = TempDir::new().unwrap();
        let mut args = transform_args(dir.path().to_path_buf(), dir.path().join("out"));
        args.config = Some(dir.path().join("nope.yaml"));
        assert_eq!(handle_transform(&args, true).await, 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_source_succeeds_and_persists_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app");
        std::fs::create_dir_all(&source).unwrap();
        let cache = dir.path().join("qa.yaml");

        let mut args = transform_args(source, dir.path().join("out"));
        args.qa_cache = Some(cache.clone());
        assert_eq!(handle_transform(&args, true).await, 0);
        assert!(cache.is_file());
    }

    #[test]
    #[serial]
    fn test_flag_overrides() {
        let mut args = transform_args(PathBuf::from("."), PathBuf::from("out"));
        args.max_rounds = Some(7);
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.max_rounds, Some(7));
        assert!(settings.qa_skip);

        args.max_rounds = Some(0);
        assert!(resolve_settings(&args).is_err());
    }

    #[test]
    fn test_transformers_listing() {
        let args = TransformersArgs {
            format: OutputFormatArg::Human,
        };
        assert_eq!(handle_transformers(&args), 0);
    }
}
