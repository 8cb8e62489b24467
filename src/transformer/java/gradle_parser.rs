//! Tolerant reader for Groovy and Kotlin Gradle build scripts.
//!
//! Gradle scripts are programs, so this only recovers the declarative parts
//! the analyser needs: applied plugins, dependency coordinates, simple
//! `key = 'value'` assignments per block, and the Java language version.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleDependency {
    pub configuration: String,
    pub group: String,
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GradleBuild {
    pub plugins: BTreeMap<String, Option<String>>,
    pub dependencies: Vec<GradleDependency>,
    /// Assignments keyed by the innermost enclosing block; top-level
    /// assignments live under the empty key.
    pub blocks: BTreeMap<String, BTreeMap<String, String>>,
    pub java_version: Option<String>,
}

impl GradleBuild {
    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn block_value(&self, block: &str, key: &str) -> Option<&str> {
        self.blocks.get(block)?.get(key).map(String::as_str)
    }

    pub fn dependency_in_group(&self, group: &str) -> Option<&GradleDependency> {
        self.dependencies.iter().find(|d| d.group == group)
    }
}

struct Patterns {
    plugin_id: Regex,
    apply_plugin: Regex,
    bare_plugin: Regex,
    string_dependency: Regex,
    map_dependency: Regex,
    assignment: Regex,
    java_version: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        plugin_id: Regex::new(
            r#"^id\s*\(?\s*["']([^"']+)["'](?:\s*\))?(?:\s+version\s*\(?\s*["']([^"']+)["'])?"#,
        )
        .expect("valid regex"),
        apply_plugin: Regex::new(r#"apply\s*\(?\s*plugin\s*[:=]\s*["']([^"']+)["']"#)
            .expect("valid regex"),
        bare_plugin: Regex::new(r"^`?([A-Za-z][\w\-]*)`?$").expect("valid regex"),
        string_dependency: Regex::new(
            r#"^(\w+)\s*\(?\s*["']([^:"'\s]+):([^:"'\s]+)(?::([^:"'@\s]+))?[^"']*["']"#,
        )
        .expect("valid regex"),
        map_dependency: Regex::new(
            r#"^(\w+)\s*\(?\s*group\s*[:=]\s*["']([^"']+)["']\s*,\s*name\s*[:=]\s*["']([^"']+)["'](?:\s*,\s*version\s*[:=]\s*["']([^"']+)["'])?"#,
        )
        .expect("valid regex"),
        assignment: Regex::new(
            r#"^([A-Za-z_]\w*)\s*(?:=\s*|\.set\(\s*|\(\s*|\s+)["']([^"']*)["']"#,
        )
        .expect("valid regex"),
        java_version: Regex::new(
            r#"(?:sourceCompatibility|targetCompatibility|languageVersion|jvmTarget)\b[^0-9A-Z]*(?:JavaVersion\.|JavaLanguageVersion\.of\(\s*)?["']?((?:VERSION_)?[0-9][0-9._]*)"#,
        )
        .expect("valid regex"),
    })
}

pub fn parse(content: &str) -> GradleBuild {
    let p = patterns();
    let mut build = GradleBuild::default();
    let mut stack: Vec<String> = Vec::new();

    for statement in statements(content) {
        match statement {
            Statement::Open(header) => stack.push(block_name(&header)),
            Statement::Close => {
                stack.pop();
            }
            Statement::Line(line) => {
                let block = stack.last().map(String::as_str).unwrap_or("");

                if build.java_version.is_none() {
                    if let Some(caps) = p.java_version.captures(&line) {
                        build.java_version = Some(super::versions::normalize(&caps[1]));
                    }
                }
                if let Some(caps) = p.apply_plugin.captures(&line) {
                    build.plugins.insert(caps[1].to_string(), None);
                    continue;
                }

                match block {
                    "plugins" => {
                        if let Some(caps) = p.plugin_id.captures(&line) {
                            build.plugins.insert(
                                caps[1].to_string(),
                                caps.get(2).map(|m| m.as_str().to_string()),
                            );
                        } else if let Some(caps) = p.bare_plugin.captures(&line) {
                            build.plugins.insert(caps[1].to_string(), None);
                        }
                    }
                    "dependencies" => {
                        let caps = p
                            .map_dependency
                            .captures(&line)
                            .or_else(|| p.string_dependency.captures(&line));
                        if let Some(caps) = caps {
                            build.dependencies.push(GradleDependency {
                                configuration: caps[1].to_string(),
                                group: caps[2].to_string(),
                                name: caps[3].to_string(),
                                version: caps.get(4).map(|m| m.as_str().to_string()),
                            });
                        }
                    }
                    _ => {
                        if let Some(caps) = p.assignment.captures(&line) {
                            build
                                .blocks
                                .entry(block.to_string())
                                .or_default()
                                .insert(caps[1].to_string(), caps[2].to_string());
                        }
                    }
                }
            }
        }
    }

    build
}

/// Block identifier from its header: `war`, `bootJar`,
/// `tasks.named('bootJar')` and `tasks.named<Jar>("jar")` name the task.
fn block_name(header: &str) -> String {
    let header = header.trim();
    if let Some(start) = header.find(['\'', '"']) {
        let rest = &header[start + 1..];
        if let Some(end) = rest.find(['\'', '"']) {
            if header.starts_with("tasks.") {
                return rest[..end].to_string();
            }
        }
    }
    header
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .next()
        .unwrap_or("")
        .to_string()
}

#[derive(Debug, PartialEq, Eq)]
enum Statement {
    Open(String),
    Close,
    Line(String),
}

/// Splits a script into block openings, closings and single statements,
/// ignoring braces inside string literals and comments.
fn statements(content: &str) -> Vec<Statement> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;

    let flush = |current: &mut String, out: &mut Vec<Statement>| {
        let line = current.trim();
        if !line.is_empty() {
            out.push(Statement::Line(line.to_string()));
        }
        current.clear();
    };

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                flush(&mut current, &mut out);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '{' => {
                out.push(Statement::Open(current.trim().to_string()));
                current.clear();
            }
            '}' => {
                flush(&mut current, &mut out);
                out.push(Statement::Close);
            }
            '\n' | ';' => flush(&mut current, &mut out),
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut out);
    out
}
