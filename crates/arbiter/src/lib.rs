//! A judging engine for untrusted submissions.
//!
//! Arbiter compiles a submission with the configured toolchain for its
//! language, runs it against input/expected-output test cases under wall clock
//! and memory limits inside an external OS sandbox, compares its output and
//! rolls the per-case outcomes up into one verdict.
//!
//! # Features
//!
//! - **Eight languages**: C, C++, Java, Kotlin, Python, Rust, Go and PHP, each
//!   defined by a TOML toolchain entry.
//! - **Sandboxed execution**: every run is wrapped by firejail (or another
//!   configured wrapper) with a private working directory.
//! - **Verdicts**: accepted, wrong answer, time and memory limits, runtime,
//!   compilation and system errors, with a fixed precedence.
//! - **Tolerant comparison**: newline normalization and epsilon comparison of
//!   numeric output.
//! - **Two schedules**: stop at the first failing case, or run every case on a
//!   bounded worker pool.
//!
//! Memory usage is sampled while a program runs, so reported values are
//! estimates and short spikes can be missed.

pub use compare::{CompareOptions, CompareResult, OutputComparator};
pub use compiler::{CompileError, CompileOutcome, CompilerRegistry};
pub use config::{Config, ConfigError, EXAMPLE_CONFIG, SandboxPolicy};
pub use judge::{
    ExecutionPolicy, Judge, JudgeContext, JudgeMetrics, JudgeRequest, MetricsSnapshot, TestOutcome,
    TestReport,
};
pub use language::{Language, UnknownLanguage};
pub use sandbox::{MemoryProbe, SandboxCommand, SandboxExecutor};
pub use types::{CaseResult, ExecutionLimits, JudgeResult, TestCase, Verdict};
pub use validate::{ValidationError, Validator};

pub mod compare;
pub mod compiler;
pub mod config;
pub mod judge;
pub mod language;
pub mod sandbox;
pub mod types;
pub mod validate;
