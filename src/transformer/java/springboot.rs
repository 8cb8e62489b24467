//! Spring Boot application metadata read from a service's resources.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

pub const SPRING_BOOT_GROUP: &str = "org.springframework.boot";

const RESOURCES_DIR: &str = "src/main/resources";
const EXTENSIONS: &[&str] = &["properties", "yml", "yaml"];

/// Application name (`spring.application.name`, empty when unset) and the
/// profiles that have an `application-<profile>` file, sorted.
pub fn app_name_and_profiles(service_dir: &Path) -> (String, Vec<String>) {
    let resources = service_dir.join(RESOURCES_DIR);
    let Ok(entries) = std::fs::read_dir(&resources) else {
        return (String::new(), Vec::new());
    };

    let mut app_name = String::new();
    let mut profiles = BTreeSet::new();
    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();

    for file in files {
        let Some((stem, ext)) = file.rsplit_once('.') else {
            continue;
        };
        if !EXTENSIONS.contains(&ext) {
            continue;
        }
        if stem == "application" && app_name.is_empty() {
            if let Ok(content) = std::fs::read_to_string(resources.join(&file)) {
                app_name = application_name(&content, ext).unwrap_or_default();
            }
        } else if let Some(profile) = stem.strip_prefix("application-") {
            if !profile.is_empty() {
                profiles.insert(profile.to_string());
            }
        }
    }

    debug!(dir = %service_dir.display(), app_name = %app_name, profiles = ?profiles, "Read Spring Boot metadata");
    (app_name, profiles.into_iter().collect())
}

fn application_name(content: &str, ext: &str) -> Option<String> {
    let name = if ext == "properties" {
        content.lines().find_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            (key.trim() == "spring.application.name").then(|| value.trim().to_string())
        })
    } else {
        let doc: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
        doc.get("spring")
            .and_then(|s| s.get("application"))
            .and_then(|a| a.get("name"))
            .or_else(|| doc.get("spring.application.name"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    name.filter(|n| !n.is_empty() && !n.contains("${"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resources(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join(RESOURCES_DIR);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_properties_name_and_profiles() {
        let dir = TempDir::new().unwrap();
        let res = resources(&dir);
        std::fs::write(
            res.join("application.properties"),
            "server.port=8081\nspring.application.name = orders\n",
        )
        .unwrap();
        std::fs::write(res.join("application-prod.properties"), "").unwrap();
        std::fs::write(res.join("application-dev.yml"), "").unwrap();
        std::fs::write(res.join("application-dev.properties"), "").unwrap();
        std::fs::write(res.join("logback.xml"), "").unwrap();

        let (name, profiles) = app_name_and_profiles(dir.path());
        assert_eq!(name, "orders");
        assert_eq!(profiles, vec!["dev", "prod"]);
    }

    #[test]
    fn test_yaml_name() {
        let dir = TempDir::new().unwrap();
        let res = resources(&dir);
        std::fs::write(
            res.join("application.yaml"),
            "spring:\n  application:\n    name: billing\n",
        )
        .unwrap();

        assert_eq!(app_name_and_profiles(dir.path()).0, "billing");
    }

    #[test]
    fn test_placeholder_name_ignored() {
        let dir = TempDir::new().unwrap();
        let res = resources(&dir);
        std::fs::write(
            res.join("application.properties"),
            "spring.application.name=${APP_NAME}\n",
        )
        .unwrap();

        assert_eq!(app_name_and_profiles(dir.path()).0, "");
    }

    #[test]
    fn test_no_resources() {
        let dir = TempDir::new().unwrap();
        assert_eq!(app_name_and_profiles(dir.path()), (String::new(), Vec::new()));
    }
}
