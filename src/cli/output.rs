//! Report formatting for JSON, YAML and human-readable text.
//!
//! ```ignore
//! use kubeshift::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_run(&report)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

use crate::artifact::{Artifact, PathType};
use crate::pipeline::{PlanReport, RunReport};
use crate::transformer::OutcomeStatus;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Formatter for run, plan and registry listings
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_run(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => Ok(human_run(report)),
        }
    }

    pub fn format_plan(&self, report: &PlanReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => Ok(human_plan(report)),
        }
    }

    pub fn format_classes(&self, classes: &[&str]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&classes),
            OutputFormat::Yaml => to_yaml(&classes),
            OutputFormat::Human => Ok(classes.iter().map(|c| format!("{}\n", c)).collect()),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report to JSON")
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize report to YAML")
}

fn connector(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "\u{2514}\u{2500}"
    } else {
        "\u{251C}\u{2500}"
    }
}

fn human_run(report: &RunReport) -> String {
    let mut out = String::new();
    let header = if report.is_clean() {
        "\u{2713} Transformation Complete"
    } else {
        "\u{26A0} Transformation Complete (with skipped items)"
    };
    let _ = writeln!(out, "{}\n{}\n", header, RULE);
    let _ = writeln!(out, "Source:   {}", report.source.display());
    let _ = writeln!(out, "Output:   {}", report.output.display());
    let _ = writeln!(out, "Rounds:   {}", report.rounds);
    let _ = writeln!(
        out,
        "Files:    {} written from {} mappings\n",
        report.files_written, report.planned_mappings
    );

    if report.services.is_empty() {
        out.push_str("No services detected.\n");
    }
    for (name, service) in &report.services {
        let _ = writeln!(out, "{}:", name);
        let entries: Vec<_> = service.succeeded.iter().chain(&service.skipped).collect();
        for (i, outcome) in entries.iter().enumerate() {
            let status = match &outcome.status {
                OutcomeStatus::Succeeded => "\u{2713}".to_string(),
                OutcomeStatus::Skipped { cause } => format!("\u{2717} skipped: {}", cause),
            };
            let _ = writeln!(
                out,
                "{} {} [{}] {}",
                connector(i, entries.len()),
                outcome.transformer,
                outcome.artifact_type,
                status
            );
        }
        out.push('\n');
    }

    if !report.init_failures.is_empty() {
        out.push_str("Disabled transformers:\n");
        for (i, f) in report.init_failures.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {} ({}): {}",
                connector(i, report.init_failures.len()),
                f.name,
                f.class,
                f.cause
            );
        }
        out.push('\n');
    }
    if !report.detection_failures.is_empty() {
        out.push_str("Detection failures:\n");
        for (i, f) in report.detection_failures.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {} in {}: {}",
                connector(i, report.detection_failures.len()),
                f.transformer,
                f.directory.display(),
                f.cause
            );
        }
        out.push('\n');
    }
    if !report.write_failures.is_empty() {
        out.push_str("Write failures:\n");
        for (i, f) in report.write_failures.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {}: {}",
                connector(i, report.write_failures.len()),
                f.destination.display(),
                f.cause
            );
        }
        out.push('\n');
    }
    out
}

fn describe_artifact(artifact: &Artifact) -> String {
    let location = artifact
        .first_path(PathType::ServiceDirectory)
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default();
    let configs: Vec<String> = artifact.configs().map(|c| c.config_type().to_string()).collect();
    if configs.is_empty() {
        format!("{}{}", artifact.artifact_type, location)
    } else {
        format!("{}{} ({})", artifact.artifact_type, location, configs.join(", "))
    }
}

fn human_plan(report: &PlanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Detected Services\n{}\n", RULE);
    let _ = writeln!(out, "Source:       {}", report.source.display());
    let _ = writeln!(out, "Directories:  {}", report.directories);
    let _ = writeln!(
        out,
        "Services:     {} ({} artifacts)\n",
        report.services.len(),
        report.artifact_count()
    );

    for (name, artifacts) in &report.services {
        let _ = writeln!(out, "{}:", name);
        for (i, artifact) in artifacts.iter().enumerate() {
            let _ = writeln!(out, "{} {}", connector(i, artifacts.len()), describe_artifact(artifact));
        }
        out.push('\n');
    }

    for f in &report.init_failures {
        let _ = writeln!(out, "\u{26A0} transformer {} disabled: {}", f.name, f.cause);
    }
    for f in &report.detection_failures {
        let _ = writeln!(
            out,
            "\u{26A0} {} failed in {}: {}",
            f.transformer,
            f.directory.display(),
            f.cause
        );
    }
    out
}
