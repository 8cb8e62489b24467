use super::QaResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Failed to access QA cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse QA cache {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize QA cache: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    answers: BTreeMap<String, Answer>,
}

/// Resolver that caches every answer for the run, optionally backed by a YAML
/// file so a later run can replay the same decisions.
pub struct QaEngine {
    interactive: bool,
    answers: Mutex<BTreeMap<String, Answer>>,
    // Serializes prompting so concurrent transformers never interleave on the terminal
    // and a key is only ever asked once.
    prompt_lock: Mutex<()>,
    cache_file: Option<PathBuf>,
}

impl QaEngine {
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            answers: Mutex::new(BTreeMap::new()),
            prompt_lock: Mutex::new(()),
            cache_file: None,
        }
    }

    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::non_interactive()
        }
    }

    pub fn with_answer(self, key: impl Into<String>, answer: Answer) -> Self {
        lock(&self.answers).insert(key.into(), answer);
        self
    }

    /// Pre-seeds answers from `path` when it exists and remembers it for
    /// [`QaEngine::persist`].
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Result<Self, QaError> {
        let path = path.into();
        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| QaError::Io {
                path: path.clone(),
                source,
            })?;
            let document: CacheDocument =
                serde_yaml::from_str(&content).map_err(|source| QaError::Parse {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), answers = document.answers.len(), "Loaded QA cache");
            lock(&self.answers).extend(document.answers);
        }
        self.cache_file = Some(path);
        Ok(self)
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn answers(&self) -> BTreeMap<String, Answer> {
        lock(&self.answers).clone()
    }

    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    /// Writes all answers to the cache file, if one was configured.
    pub fn persist(&self) -> Result<(), QaError> {
        let Some(path) = &self.cache_file else {
            return Ok(());
        };
        let document = CacheDocument {
            answers: self.answers(),
        };
        let yaml = serde_yaml::to_string(&document)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| QaError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| QaError::Io {
            path: path.clone(),
            source,
        })
    }

    fn resolve(&self, key: &str, ask: impl FnOnce() -> Answer) -> Answer {
        let _prompting = lock(&self.prompt_lock);
        if let Some(answer) = lock(&self.answers).get(key) {
            debug!(key, "Using cached answer");
            return answer.clone();
        }
        let answer = ask();
        lock(&self.answers).insert(key.to_string(), answer.clone());
        answer
    }
}

impl QaResolver for QaEngine {
    fn ask_multi_select(
        &self,
        key: &str,
        prompt: &str,
        help: &[String],
        options: &[String],
        default: &[String],
    ) -> Vec<String> {
        let answer = self.resolve(key, || {
            if !self.interactive || options.is_empty() {
                return Answer::Multi(default.to_vec());
            }
            let selected = prompt_indices(prompt, help, options, default, true)
                .map(|indices| indices.into_iter().map(|i| options[i].clone()).collect())
                .unwrap_or_else(|| default.to_vec());
            Answer::Multi(selected)
        });

        match answer {
            Answer::Multi(values) => values
                .into_iter()
                .filter(|v| options.contains(v))
                .collect(),
            Answer::Single(value) if options.contains(&value) => vec![value],
            Answer::Single(value) => {
                warn!(key, value = %value, "Cached answer is not a valid option, using default");
                default.to_vec()
            }
        }
    }

    fn ask_select(
        &self,
        key: &str,
        prompt: &str,
        help: &[String],
        options: &[String],
        default: &str,
    ) -> String {
        let answer = self.resolve(key, || {
            if !self.interactive || options.is_empty() {
                return Answer::Single(default.to_string());
            }
            let default_vec = vec![default.to_string()];
            let selected = prompt_indices(prompt, help, options, &default_vec, false)
                .and_then(|indices| indices.first().map(|&i| options[i].clone()))
                .unwrap_or_else(|| default.to_string());
            Answer::Single(selected)
        });

        match answer {
            Answer::Single(value) if options.is_empty() || options.contains(&value) => value,
            Answer::Multi(values) if values.len() == 1 && options.contains(&values[0]) => {
                values[0].clone()
            }
            other => {
                warn!(key, answer = ?other, "Cached answer is not a valid option, using default");
                default.to_string()
            }
        }
    }
}

/// Prompts on stderr and reads a comma-separated list of 1-based indices from
/// stdin. Returns `None` on a blank line, read failure, or invalid input.
fn prompt_indices(
    prompt: &str,
    help: &[String],
    options: &[String],
    default: &[String],
    multi: bool,
) -> Option<Vec<usize>> {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "? {}", prompt);
    for line in help {
        let _ = writeln!(stderr, "  {}", line);
    }
    for (i, option) in options.iter().enumerate() {
        let marker = if default.contains(option) { "*" } else { " " };
        let _ = writeln!(stderr, "  {}[{}] {}", marker, i + 1, option);
    }
    let hint = if multi {
        "comma-separated numbers"
    } else {
        "a number"
    };
    let _ = write!(stderr, "Enter {} (blank for default): ", hint);
    let _ = stderr.flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return None;
    }
    parse_indices(&line, options.len(), multi)
}

fn parse_indices(line: &str, option_count: usize, multi: bool) -> Option<Vec<usize>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut indices = Vec::new();
    for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<usize>() {
            Ok(n) if n >= 1 && n <= option_count => {
                if !indices.contains(&(n - 1)) {
                    indices.push(n - 1);
                }
            }
            _ => {
                warn!(input = %part, "Ignoring invalid selection");
                return None;
            }
        }
    }

    if !multi && indices.len() != 1 {
        return None;
    }
    Some(indices)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
