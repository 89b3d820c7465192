//! Configuration file loading
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};
use regex::RegexBuilder;

use crate::config::{Config, ConfigError};
use crate::language::Language;

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "temp_prefix '{}' must not contain path separators",
                self.temp_prefix
            )));
        }
        if self.compile_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "compile_timeout_ms must be positive".to_owned(),
            ));
        }
        if !self.default_limits.in_bounds() {
            return Err(ConfigError::Invalid(format!(
                "default_limits out of range: {}ms, {}KB",
                self.default_limits.time_limit_ms, self.default_limits.memory_limit_kb
            )));
        }
        if self.pool.workers == 0 {
            return Err(ConfigError::Invalid(
                "pool.workers must be at least 1".to_owned(),
            ));
        }
        if self.sandbox.enabled && self.sandbox.command.is_empty() {
            return Err(ConfigError::Invalid(
                "sandbox.command is empty but the sandbox is enabled".to_owned(),
            ));
        }
        if !self.compare.epsilon.is_finite() || self.compare.epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "compare.epsilon must be a finite non-negative number, got {}",
                self.compare.epsilon
            )));
        }
        for pattern in &self.validation.extra_patterns {
            if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
                return Err(ConfigError::Invalid(format!(
                    "validation pattern '{pattern}' does not compile: {e}"
                )));
            }
        }

        for (id, toolchain) in &self.languages {
            if id.parse::<Language>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "unknown language '{id}' in toolchain table"
                )));
            }
            if toolchain.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty name"
                )));
            }
            if toolchain.compile.source_name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty source name"
                )));
            }
            if toolchain.compile.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty compile command"
                )));
            }
            if toolchain.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty run command"
                )));
            }
        }

        Ok(())
    }
}
