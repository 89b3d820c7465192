//! Full per-case reports for practice runs

use serde::{Deserialize, Serialize};

use crate::types::{CaseResult, Verdict};

/// Summary of a practice run over every case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestOutcome {
    AllPassed,
    PartiallyPassed,
    AllFailed,
    /// Rejected or failed to compile; no case ran
    NotRun,
}

/// Every case result of a run, without stopping at the first failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub outcome: TestOutcome,

    /// Rejection or compiler message when nothing ran
    pub message: Option<String>,

    /// Verdict of the rejection when nothing ran
    pub rejection: Option<Verdict>,

    pub passed: usize,
    pub total: usize,
    pub total_execution_time_ms: u64,
    pub max_memory_used_kb: u64,
    pub case_results: Vec<CaseResult>,
}

impl TestReport {
    pub fn from_cases(case_results: Vec<CaseResult>) -> Self {
        let total = case_results.len();
        let passed = case_results.iter().filter(|r| r.is_accepted()).count();
        let outcome = match passed {
            _ if total == 0 => TestOutcome::NotRun,
            p if p == total => TestOutcome::AllPassed,
            0 => TestOutcome::AllFailed,
            _ => TestOutcome::PartiallyPassed,
        };

        Self {
            outcome,
            message: None,
            rejection: None,
            passed,
            total,
            total_execution_time_ms: case_results.iter().map(|r| r.execution_time_ms).sum(),
            max_memory_used_kb: case_results
                .iter()
                .map(|r| r.memory_used_kb)
                .max()
                .unwrap_or(0),
            case_results,
        }
    }

    /// A run that never reached execution
    pub fn not_run(status: Verdict, message: impl Into<String>) -> Self {
        Self {
            outcome: TestOutcome::NotRun,
            message: Some(message.into()),
            rejection: Some(status),
            passed: 0,
            total: 0,
            total_execution_time_ms: 0,
            max_memory_used_kb: 0,
            case_results: Vec::new(),
        }
    }
}
