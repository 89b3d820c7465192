use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::toolchain::{CompileConfig, RunConfig, SourceName, Toolchain};
use crate::compare::CompareOptions;
use crate::language::Language;
use crate::types::{ExecutionLimits, ExecutionPolicy};

mod loader;
pub mod toolchain;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../arbiter.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid source file name '{0}'")]
    InvalidSourceName(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("no toolchain configured for language '{0}'")]
    ToolchainNotFound(Language),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the judging engine
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Scheduling of test cases within one judge call
    #[serde(default)]
    pub execution_policy: ExecutionPolicy,

    /// Name prefix of per-call working directories
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// Parent directory for working directories (system temp dir if unset)
    #[serde(default)]
    pub temp_root: Option<PathBuf>,

    /// Wall clock bound on a compile step in milliseconds
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,

    /// Per-stream cap on captured stdout/stderr in kilobytes
    #[serde(default = "default_max_output_kb")]
    pub max_output_kb: u64,

    /// Interval between memory samples while a test case runs.
    ///
    /// 0 takes a single sample right after spawn.
    #[serde(default = "default_memory_sample_interval_ms")]
    pub memory_sample_interval_ms: u64,

    /// Limits used when a call's limits are below their minimum
    #[serde(default)]
    pub default_limits: ExecutionLimits,

    /// External sandbox wrapping every test case
    #[serde(default)]
    pub sandbox: SandboxPolicy,

    /// Worker pool for aggregate execution
    #[serde(default)]
    pub pool: PoolConfig,

    /// Output comparison settings
    #[serde(default)]
    pub compare: CompareOptions,

    /// Source screening settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Toolchains keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Toolchain>,
}

impl Config {
    /// Create a new config with the embedded default toolchains
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with no toolchains
    pub fn empty() -> Self {
        Self {
            execution_policy: ExecutionPolicy::default(),
            temp_prefix: default_temp_prefix(),
            temp_root: None,
            compile_timeout_ms: default_compile_timeout_ms(),
            max_output_kb: default_max_output_kb(),
            memory_sample_interval_ms: default_memory_sample_interval_ms(),
            default_limits: ExecutionLimits::default(),
            sandbox: SandboxPolicy::default(),
            pool: PoolConfig::default(),
            compare: CompareOptions::default(),
            validation: ValidationConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Get the toolchain for a language
    pub fn toolchain(&self, language: Language) -> Result<&Toolchain, ConfigError> {
        self.languages
            .get(language.id())
            .ok_or(ConfigError::ToolchainNotFound(language))
    }

    /// Register or replace the toolchain for a language
    pub fn set_toolchain(&mut self, language: Language, toolchain: Toolchain) {
        self.languages.insert(language.id().to_owned(), toolchain);
    }

    /// Languages that have a toolchain configured, sorted
    pub fn supported_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .languages
            .keys()
            .filter_map(|id| id.parse().ok())
            .collect();
        languages.sort();
        languages
    }

    /// Per-stream output cap in bytes
    pub fn max_output_bytes(&self) -> usize {
        usize::try_from(self.max_output_kb.saturating_mul(1024)).unwrap_or(usize::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

/// Sandbox invocation policy
///
/// When `enabled` is false programs run directly on the host, which is only
/// suitable for trusted local testing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    pub enabled: bool,

    /// Sandbox binary, resolved through PATH
    pub command: String,

    pub options: SandboxOptions,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "firejail".to_owned(),
            options: SandboxOptions::default(),
        }
    }
}

impl SandboxPolicy {
    /// A policy that runs programs unwrapped
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Individually switchable sandbox flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxOptions {
    pub quiet: bool,
    pub seccomp: bool,
    pub net_none: bool,
    pub no_groups: bool,
    pub no_new_privs: bool,

    /// Capabilities to drop; empty keeps them
    pub caps_drop: String,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            quiet: true,
            seccomp: true,
            net_none: true,
            no_groups: true,
            no_new_privs: true,
            caps_drop: "all".to_owned(),
        }
    }
}

/// Bounded worker pool settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of test cases that may run at once
    pub workers: usize,

    /// Test cases that may wait for a worker before submissions are rejected
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1000,
        }
    }
}

/// Source screening settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Additional case-insensitive regexes rejected in source code
    pub extra_patterns: Vec<String>,
}

fn default_temp_prefix() -> String {
    "judge_".to_owned()
}

fn default_compile_timeout_ms() -> u64 {
    30_000
}

fn default_max_output_kb() -> u64 {
    65536
}

fn default_memory_sample_interval_ms() -> u64 {
    10
}
