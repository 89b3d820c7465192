use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of judging a single test case or a whole submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompilationError,
    SystemError,
}

impl Verdict {
    /// Rank used to pick one overall verdict when cases disagree.
    ///
    /// Higher wins: system error > compilation error > runtime error >
    /// memory limit > time limit > wrong answer > accepted.
    pub fn severity(self) -> u8 {
        match self {
            Verdict::Accepted => 0,
            Verdict::WrongAnswer => 1,
            Verdict::TimeLimitExceeded => 2,
            Verdict::MemoryLimitExceeded => 3,
            Verdict::RuntimeError => 4,
            Verdict::CompilationError => 5,
            Verdict::SystemError => 6,
        }
    }

    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::CompilationError => "Compilation Error",
            Verdict::SystemError => "System Error",
        }
    }

    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// Roll a set of verdicts up into the most severe one.
    ///
    /// An empty set is `Accepted`.
    pub fn worst(verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
        verdicts
            .into_iter()
            .max_by_key(|v| v.severity())
            .unwrap_or(Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How test cases of one submission are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPolicy {
    /// Run cases one at a time in submission order, stopping at the first failure
    #[default]
    Sequential,

    /// Run every case on the worker pool and roll the verdicts up by severity
    Aggregate,
}

impl std::str::FromStr for ExecutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionPolicy::Sequential),
            "aggregate" => Ok(ExecutionPolicy::Aggregate),
            other => Err(format!("unknown execution policy '{other}'")),
        }
    }
}

/// One input / expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Result of running one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub status: Verdict,

    /// Error output or diagnostic, if any
    pub message: Option<String>,

    /// Wall clock time from spawn to exit in milliseconds
    pub execution_time_ms: u64,

    /// Sampled resident memory in kilobytes.
    ///
    /// This is the largest of a handful of point samples, not a
    /// kernel-tracked peak, so short-lived spikes can be missed. On Linux it
    /// is the full resident set (`VmRSS`), shared library pages included.
    pub memory_used_kb: u64,

    /// Normalized program output, if any was collected
    pub actual_output: Option<String>,

    pub expected_output: String,

    pub input: String,
}

impl CaseResult {
    /// Start a result for `case` with the given status and zeroed measurements
    pub fn new(case: &TestCase, status: Verdict) -> Self {
        Self {
            status,
            message: None,
            execution_time_ms: 0,
            memory_used_kb: 0,
            actual_output: None,
            expected_output: case.expected_output.clone(),
            input: case.input.clone(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = ms;
        self
    }

    pub fn with_memory(mut self, kb: u64) -> Self {
        self.memory_used_kb = kb;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.actual_output = Some(output.into());
        self
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status.is_accepted()
    }

    /// Message to surface for this case, falling back to the verdict description
    pub fn failure_message(&self) -> String {
        match self.message.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_owned(),
            _ => self.status.description().to_owned(),
        }
    }
}

/// Final verdict for a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub status: Verdict,

    pub message: String,

    /// Sum of execution times over the cases that actually ran
    pub total_execution_time_ms: u64,

    /// Largest sampled memory over the cases that actually ran
    pub max_memory_used_kb: u64,

    /// First failing case (in submission order) carrying the final status
    pub failed_case: Option<CaseResult>,

    /// Every case that ran, in submission order
    pub case_results: Vec<CaseResult>,
}

impl JudgeResult {
    /// A result that never reached execution (validation, compilation, infrastructure)
    pub fn rejected(status: Verdict, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            total_execution_time_ms: 0,
            max_memory_used_kb: 0,
            failed_case: None,
            case_results: Vec::new(),
        }
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::rejected(Verdict::SystemError, message)
    }

    /// Roll executed case results up into one result.
    ///
    /// The status is the most severe case status; the representative case is
    /// the first one in submission order carrying that status.
    pub fn from_cases(case_results: Vec<CaseResult>) -> Self {
        let total_execution_time_ms = case_results.iter().map(|r| r.execution_time_ms).sum();
        let max_memory_used_kb = case_results
            .iter()
            .map(|r| r.memory_used_kb)
            .max()
            .unwrap_or(0);
        let status = Verdict::worst(case_results.iter().map(|r| r.status));

        let failed_case = if status.is_accepted() {
            None
        } else {
            case_results.iter().find(|r| r.status == status).cloned()
        };

        let message = match failed_case {
            Some(ref case) => case.failure_message(),
            None => "All test cases passed".to_owned(),
        };

        Self {
            status,
            message,
            total_execution_time_ms,
            max_memory_used_kb,
            failed_case,
            case_results,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status.is_accepted()
    }
}

/// Resource bounds for one judge call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Wall clock limit per test case in milliseconds
    pub time_limit_ms: u64,

    /// Memory limit per test case in kilobytes
    pub memory_limit_kb: u64,
}

impl ExecutionLimits {
    pub const MIN_TIME_LIMIT_MS: u64 = 100;
    pub const MAX_TIME_LIMIT_MS: u64 = 60_000;
    pub const MIN_MEMORY_LIMIT_KB: u64 = 1024;
    pub const MAX_MEMORY_LIMIT_KB: u64 = 536_870_912;

    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;

    pub fn new(time_limit_ms: u64, memory_limit_kb: u64) -> Self {
        Self {
            time_limit_ms,
            memory_limit_kb,
        }
    }

    /// Replace values below their minimum with the corresponding default.
    ///
    /// Values above the maximum are left alone so validation can reject them.
    pub fn or_defaults(self, defaults: &ExecutionLimits) -> ExecutionLimits {
        ExecutionLimits {
            time_limit_ms: if self.time_limit_ms < Self::MIN_TIME_LIMIT_MS {
                defaults.time_limit_ms
            } else {
                self.time_limit_ms
            },
            memory_limit_kb: if self.memory_limit_kb < Self::MIN_MEMORY_LIMIT_KB {
                defaults.memory_limit_kb
            } else {
                self.memory_limit_kb
            },
        }
    }

    /// Whether both limits fall inside their legal ranges
    #[must_use]
    pub fn in_bounds(&self) -> bool {
        (Self::MIN_TIME_LIMIT_MS..=Self::MAX_TIME_LIMIT_MS).contains(&self.time_limit_ms)
            && (Self::MIN_MEMORY_LIMIT_KB..=Self::MAX_MEMORY_LIMIT_KB)
                .contains(&self.memory_limit_kb)
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            time_limit_ms: 1000,
            memory_limit_kb: 256 * Self::MB,
        }
    }
}
