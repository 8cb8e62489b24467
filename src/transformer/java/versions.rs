use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub const VERSION_MAPPING_FILE: &str = "java-versions.yaml";
pub const FALLBACK_JAVA_PACKAGE: &str = "java-1.8.0-openjdk-devel";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionMapping {
    #[serde(default)]
    java_package_versions: BTreeMap<String, String>,
}

/// JDK package installed in the build container for `java_version`, looked up
/// in the mapping file under `templates_root`.
pub fn java_package(templates_root: &Path, java_version: &str) -> String {
    let path = templates_root.join(VERSION_MAPPING_FILE);
    let mapping = match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_yaml::from_str::<VersionMapping>(&content).map_err(|e| e.to_string())
        }) {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to load Java version mapping");
            return FALLBACK_JAVA_PACKAGE.to_string();
        }
    };

    mapping
        .java_package_versions
        .get(java_version)
        .or_else(|| mapping.java_package_versions.get(&normalize(java_version)))
        .cloned()
        .unwrap_or_else(|| {
            warn!(java_version, "No JDK package mapped for Java version, using fallback");
            FALLBACK_JAVA_PACKAGE.to_string()
        })
}

/// Feature-release number of a Java version string: `1.8` becomes `8`,
/// `VERSION_11` and `JavaVersion.VERSION_11` become `11`.
pub fn normalize(version: &str) -> String {
    let v = version
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_start_matches("JavaVersion.")
        .trim_start_matches("VERSION_")
        .replace('_', ".");
    match v.strip_prefix("1.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => v,
    }
}
