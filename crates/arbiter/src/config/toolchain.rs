use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_SOURCE_NAME_CHARS: [char; 2] = ['/', '\\'];

/// How one language is compiled (or syntax-checked) and launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Human-readable name for the language (e.g., "C++ 17 (GCC)")
    pub name: String,

    /// Compilation or syntax-check step
    pub compile: CompileConfig,

    /// Execution step
    pub run: RunConfig,
}

impl Toolchain {
    /// Canonical source file name inside the working directory
    pub fn source_name(&self) -> &str {
        self.compile.source_name.as_str()
    }

    /// Expand placeholders in the given command
    ///
    /// `{source}` becomes the source file name, `{workdir}` the absolute
    /// working directory.
    pub fn expand_command(command: &[String], source: &str, work_dir: &Path) -> Vec<String> {
        let work_dir = work_dir.to_string_lossy();
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{workdir}", &work_dir)
            })
            .collect()
    }

    /// Expand placeholders in environment values
    pub fn expand_env(
        env: &HashMap<String, String>,
        source: &str,
        work_dir: &Path,
    ) -> Vec<(String, String)> {
        let work_dir = work_dir.to_string_lossy();
        let mut vars: Vec<(String, String)> = env
            .iter()
            .map(|(key, value)| {
                let value = value
                    .replace("{source}", source)
                    .replace("{workdir}", &work_dir);
                (key.clone(), value)
            })
            .collect();
        vars.sort();
        vars
    }
}

/// Source file name without directory components (e.g., "Main.java")
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceName(String);

impl SourceName {
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let contains_invalid = name
            .chars()
            .any(|c| INVALID_SOURCE_NAME_CHARS.contains(&c));
        if contains_invalid || name.contains("..") {
            return Err(ConfigError::InvalidSourceName(name.to_owned()));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SourceName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SourceName::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file name without path separators or '..'",
            )
        })
    }
}

impl std::fmt::Display for SourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Source file name in the working directory (e.g., "solution.cpp")
    pub source_name: SourceName,

    /// Command and arguments with placeholders
    /// Placeholders: {source}, {workdir}
    pub command: Vec<String>,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {workdir}
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Extra sandbox arguments placed between the sandbox flags and the
    /// program (ignored when the sandbox is disabled)
    #[serde(default)]
    pub sandbox_args: Vec<String>,
}
