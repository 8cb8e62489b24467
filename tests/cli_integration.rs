//! CLI integration tests
//!
//! Runs the built binary and checks exit codes, report formats and the files
//! written below the output directory.

mod support;

use std::process::{Command, Output};
use support::*;
use tempfile::TempDir;

fn kubeshift(args: &[&str]) -> Output {
    Command::new(kubeshift_binary())
        .args(args)
        .env_remove("KUBESHIFT_MAX_ROUNDS")
        .env_remove("KUBESHIFT_QA_SKIP")
        .env_remove("KUBESHIFT_QA_CACHE")
        .env_remove("KUBESHIFT_TEMPLATES_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute kubeshift")
}

#[test]
fn test_cli_help() {
    let output = kubeshift(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kubeshift"));
    assert!(stdout.contains("plan"));
    assert!(stdout.contains("transform"));
    assert!(stdout.contains("transformers"));
}

#[test]
fn test_cli_version() {
    let output = kubeshift(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_transformers_lists_builtin_classes() {
    let output = kubeshift(&["transformers", "--format", "json"]);

    assert!(output.status.success());
    let classes: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        classes,
        vec![
            "ComposeGenerator",
            "GradleAnalyser",
            "JavaPackager",
            "KubernetesGenerator",
            "MavenAnalyser"
        ]
    );
}

#[test]
fn test_plan_json_lists_services() {
    let dir = TempDir::new().unwrap();
    maven_service(dir.path(), "orders", "orders");
    gradle_service(dir.path(), "billing");

    let output = kubeshift(&["plan", dir.path().to_str().unwrap(), "-f", "json", "-q"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["services"]["orders"][0]["type"], "maven-build");
    assert_eq!(report["services"]["billing"][0]["type"], "gradle-build");
}

#[test]
fn test_transform_writes_output_and_report() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app");
    let out = dir.path().join("out");
    maven_service(&source, "orders", "orders");

    let output = kubeshift(&[
        "transform",
        source.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--qa-skip",
        "-f",
        "yaml",
        "-q",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_yaml::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(report["rounds"].as_u64(), Some(3));
    assert!(out.join("source/orders/Dockerfile").is_file());
    assert!(out.join("deploy/compose/docker-compose.yaml").is_file());
}

#[test]
fn test_transform_human_summary() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app");
    maven_service(&source, "orders", "orders");

    let output = kubeshift(&[
        "transform",
        source.to_str().unwrap(),
        "-o",
        dir.path().join("out").to_str().unwrap(),
        "--qa-skip",
        "-q",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Transformation Complete"));
    assert!(stdout.contains("orders:"));
}

#[test]
fn test_qa_cache_replays_answers() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app");
    let out = dir.path().join("out");
    let cache = dir.path().join("answers.yaml");
    spring_service(&source, "inventory", "inventory", &["dev", "prod"]);
    write(
        dir.path(),
        "answers.yaml",
        "answers:\n  kubeshift.services.inventory.activespringbootprofiles:\n    - dev\n",
    );

    let output = kubeshift(&[
        "transform",
        source.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--qa-skip",
        "--qa-cache",
        cache.to_str().unwrap(),
        "-q",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let dockerfile = read(out.join("source/inventory/Dockerfile"));
    assert!(dockerfile.contains("ENV SPRING_PROFILES_ACTIVE=dev\n"));

    let persisted = read(&cache);
    assert!(persisted.contains("kubeshift.services.inventory.port"));
}

#[test]
fn test_missing_source_fails() {
    let dir = TempDir::new().unwrap();
    let output = kubeshift(&[
        "transform",
        dir.path().join("missing").to_str().unwrap(),
        "-o",
        dir.path().join("out").to_str().unwrap(),
        "--qa-skip",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_cycle_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app");
    maven_service(&source, "orders", "orders");

    // One round is not enough for the Java chain to settle.
    let output = kubeshift(&[
        "transform",
        source.to_str().unwrap(),
        "-o",
        dir.path().join("out").to_str().unwrap(),
        "--qa-skip",
        "--max-rounds",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No fixpoint after 1 rounds"));
}

#[test]
fn test_custom_pipeline_document() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app");
    let out = dir.path().join("out");
    maven_service(&source, "orders", "orders");
    write(
        dir.path(),
        "pipeline.yaml",
        "copySource: false\ntransformers:\n  - name: maven\n    class: MavenAnalyser\n  - name: packager\n    class: JavaPackager\n  - name: kube\n    class: KubernetesGenerator\n    config:\n      outputPath: k8s\n      replicas: 2\n",
    );

    let output = kubeshift(&[
        "transform",
        source.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-c",
        dir.path().join("pipeline.yaml").to_str().unwrap(),
        "--qa-skip",
        "-q",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!out.join("source/orders/pom.xml").exists());
    assert!(!out.join("deploy/compose").exists());
    let deployment: serde_yaml::Value =
        serde_yaml::from_str(&read(out.join("k8s/orders-deployment.yaml"))).unwrap();
    assert_eq!(deployment["spec"]["replicas"].as_u64(), Some(2));
}
