use std::path::Path;

const FALLBACK_NAME: &str = "service";

/// Lowercases and replaces anything outside `[a-z0-9.-]` so the result can be
/// used as a container image or DNS-1123 style resource name.
pub fn make_container_name_compliant(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '.' {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Name derived from the final component of a directory path.
pub fn name_from_directory(dir: &Path) -> String {
    let base = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    make_container_name_compliant(&base)
}
