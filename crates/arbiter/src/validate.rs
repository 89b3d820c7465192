//! Submission screening before any process is started
//!
//! Bounds are checked in a fixed order and the first violation wins. The
//! dangerous-construct scan is a cheap heuristic in front of the sandbox,
//! not a replacement for it.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::language::Language;
use crate::types::{ExecutionLimits, JudgeResult, TestCase, Verdict};

pub const MAX_SOURCE_LENGTH: usize = 65_536;
pub const MAX_TEST_CASES: usize = 1000;
pub const MAX_TEST_CASE_SIZE: usize = 102_400;

/// Constructs rejected in any language, matched case-insensitively
const DANGEROUS_PATTERN: &str = concat!(
    r"Runtime\.getRuntime\(\)|ProcessBuilder|ProcessImpl|System\.exit|exec\(|loadLibrary|",
    r"class\.forName|reflect\.|Unsafe\.|FileInputStream|FileOutputStream|RandomAccessFile|",
    r"ServerSocket|Socket|URLClassLoader|\.\./|\.\.\\",
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Source code cannot be empty")]
    EmptySource,

    #[error("Source code exceeds maximum length of {} characters", MAX_SOURCE_LENGTH)]
    SourceTooLong,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(Language),

    #[error("Test cases cannot be empty")]
    NoTestCases,

    #[error("Too many test cases, maximum is {}", MAX_TEST_CASES)]
    TooManyTestCases,

    #[error(
        "Test case input at index {0} exceeds maximum size of {max}",
        max = MAX_TEST_CASE_SIZE
    )]
    InputTooLarge(usize),

    #[error(
        "Test case expected output at index {0} exceeds maximum size of {max}",
        max = MAX_TEST_CASE_SIZE
    )]
    ExpectedOutputTooLarge(usize),

    #[error(
        "Time limit must be between {}ms and {}ms",
        ExecutionLimits::MIN_TIME_LIMIT_MS,
        ExecutionLimits::MAX_TIME_LIMIT_MS
    )]
    TimeLimitOutOfRange,

    #[error(
        "Memory limit must be between {}KB and {}KB",
        ExecutionLimits::MIN_MEMORY_LIMIT_KB,
        ExecutionLimits::MAX_MEMORY_LIMIT_KB
    )]
    MemoryLimitOutOfRange,

    #[error("Code contains potentially dangerous operations")]
    DangerousCode,
}

impl ValidationError {
    /// Verdict reported for this rejection
    pub fn verdict(&self) -> Verdict {
        match self {
            ValidationError::DangerousCode => Verdict::RuntimeError,
            _ => Verdict::SystemError,
        }
    }

    /// Early-rejection result for this error
    pub fn into_result(self) -> JudgeResult {
        JudgeResult::rejected(self.verdict(), self.to_string())
    }
}

/// Input bounds and safety checks
#[derive(Debug, Clone)]
pub struct Validator {
    supported: HashSet<Language>,
    dangerous: Vec<Regex>,
}

impl Validator {
    /// Validator accepting `supported` languages, with additional
    /// case-insensitive dangerous patterns
    pub fn new(
        supported: impl IntoIterator<Item = Language>,
        extra_patterns: &[String],
    ) -> Result<Self, ConfigError> {
        let dangerous = std::iter::once(DANGEROUS_PATTERN)
            .chain(extra_patterns.iter().map(String::as_str))
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConfigError::Invalid(format!("validation pattern '{pattern}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            supported: supported.into_iter().collect(),
            dangerous,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.supported_languages(),
            &config.validation.extra_patterns,
        )
    }

    /// Check a submission, returning the first violation
    pub fn validate(
        &self,
        source_code: &str,
        language: Language,
        test_cases: &[TestCase],
        limits: ExecutionLimits,
    ) -> Result<(), ValidationError> {
        if source_code.is_empty() {
            return Err(ValidationError::EmptySource);
        }
        if source_code.chars().count() > MAX_SOURCE_LENGTH {
            return Err(ValidationError::SourceTooLong);
        }
        if !self.supported.contains(&language) {
            return Err(ValidationError::UnsupportedLanguage(language));
        }

        if test_cases.is_empty() {
            return Err(ValidationError::NoTestCases);
        }
        if test_cases.len() > MAX_TEST_CASES {
            return Err(ValidationError::TooManyTestCases);
        }
        for (index, case) in test_cases.iter().enumerate() {
            if case.input.chars().count() > MAX_TEST_CASE_SIZE {
                return Err(ValidationError::InputTooLarge(index));
            }
            if case.expected_output.chars().count() > MAX_TEST_CASE_SIZE {
                return Err(ValidationError::ExpectedOutputTooLarge(index));
            }
        }

        if !(ExecutionLimits::MIN_TIME_LIMIT_MS..=ExecutionLimits::MAX_TIME_LIMIT_MS)
            .contains(&limits.time_limit_ms)
        {
            return Err(ValidationError::TimeLimitOutOfRange);
        }
        if !(ExecutionLimits::MIN_MEMORY_LIMIT_KB..=ExecutionLimits::MAX_MEMORY_LIMIT_KB)
            .contains(&limits.memory_limit_kb)
        {
            return Err(ValidationError::MemoryLimitOutOfRange);
        }

        if self.is_dangerous(source_code) {
            return Err(ValidationError::DangerousCode);
        }

        Ok(())
    }

    /// Whether any dangerous pattern occurs anywhere in `source_code`
    pub fn is_dangerous(&self, source_code: &str) -> bool {
        self.dangerous.iter().any(|re| re.is_match(source_code))
    }
}
