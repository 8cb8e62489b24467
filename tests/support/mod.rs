//! Shared fixtures for integration tests: small Maven and Gradle projects
//! written into temporary directories.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn kubeshift_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_kubeshift"))
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn maven_pom(artifact_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>{}</artifactId>
  <version>1.0.0</version>
  <properties>
    <java.version>17</java.version>
  </properties>
</project>
"#,
        artifact_id
    )
}

pub fn spring_pom(artifact_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
    <version>3.2.1</version>
  </parent>
  <artifactId>{}</artifactId>
  <version>0.0.1</version>
</project>
"#,
        artifact_id
    )
}

/// A plain Maven service in `<root>/<dir>`.
pub fn maven_service(root: &Path, dir: &str, artifact_id: &str) {
    write(root, &format!("{}/pom.xml", dir), &maven_pom(artifact_id));
    write(
        root,
        &format!("{}/src/main/java/App.java", dir),
        "public class App {}\n",
    );
}

/// A Spring Boot Maven service named `name` with one resource file per profile.
pub fn spring_service(root: &Path, dir: &str, name: &str, profiles: &[&str]) {
    write(root, &format!("{}/pom.xml", dir), &spring_pom(name));
    write(
        root,
        &format!("{}/src/main/resources/application.properties", dir),
        &format!("spring.application.name={}\n", name),
    );
    for profile in profiles {
        write(
            root,
            &format!("{}/src/main/resources/application-{}.properties", dir, profile),
            "",
        );
    }
}

/// A plain Gradle service in `<root>/<dir>`; it carries no service name.
pub fn gradle_service(root: &Path, dir: &str) {
    gradle_service_for_java(root, dir, "11");
}

/// A plain Gradle service compiled for `java_version`.
pub fn gradle_service_for_java(root: &Path, dir: &str, java_version: &str) {
    write(
        root,
        &format!("{}/build.gradle", dir),
        &format!(
            "plugins {{\n    id 'java'\n}}\n\nsourceCompatibility = '{}'\n",
            java_version
        ),
    );
}

/// Every regular file below `root`, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.as_ref().display(), e))
}
