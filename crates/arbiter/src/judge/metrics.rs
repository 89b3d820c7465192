//! Process-wide judging counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::{CaseResult, JudgeResult};

/// Atomic counters shared by every judge call in a context
#[derive(Debug, Default)]
pub struct JudgeMetrics {
    judge_calls: AtomicU64,
    cases_run: AtomicU64,
    cases_accepted: AtomicU64,
    cases_failed: AtomicU64,
    total_execution_time_ms: AtomicU64,
    peak_memory_kb: AtomicU64,
}

/// Point-in-time copy of [`JudgeMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub judge_calls: u64,
    pub cases_run: u64,
    pub cases_accepted: u64,
    pub cases_failed: u64,
    pub total_execution_time_ms: u64,
    pub peak_memory_kb: u64,
}

impl MetricsSnapshot {
    /// Mean execution time over all cases run, in milliseconds
    pub fn average_execution_time_ms(&self) -> f64 {
        if self.cases_run == 0 {
            0.0
        } else {
            self.total_execution_time_ms as f64 / self.cases_run as f64
        }
    }
}

impl JudgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.judge_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_case(&self, case: &CaseResult) {
        self.cases_run.fetch_add(1, Ordering::Relaxed);
        if case.is_accepted() {
            self.cases_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cases_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_execution_time_ms
            .fetch_add(case.execution_time_ms, Ordering::Relaxed);
        self.peak_memory_kb
            .fetch_max(case.memory_used_kb, Ordering::Relaxed);
    }

    /// Record every case of a finished judge call
    pub fn record_result(&self, result: &JudgeResult) {
        for case in &result.case_results {
            self.record_case(case);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            judge_calls: self.judge_calls.load(Ordering::Relaxed),
            cases_run: self.cases_run.load(Ordering::Relaxed),
            cases_accepted: self.cases_accepted.load(Ordering::Relaxed),
            cases_failed: self.cases_failed.load(Ordering::Relaxed),
            total_execution_time_ms: self.total_execution_time_ms.load(Ordering::Relaxed),
            peak_memory_kb: self.peak_memory_kb.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.judge_calls.store(0, Ordering::Relaxed);
        self.cases_run.store(0, Ordering::Relaxed);
        self.cases_accepted.store(0, Ordering::Relaxed);
        self.cases_failed.store(0, Ordering::Relaxed);
        self.total_execution_time_ms.store(0, Ordering::Relaxed);
        self.peak_memory_kb.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TestCase, Verdict};

    fn case(status: Verdict, time: u64, memory: u64) -> CaseResult {
        CaseResult::new(&TestCase::new("", ""), status)
            .with_time(time)
            .with_memory(memory)
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = JudgeMetrics::new();
        metrics.record_call();
        metrics.record_case(&case(Verdict::Accepted, 10, 500));
        metrics.record_case(&case(Verdict::WrongAnswer, 30, 200));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.judge_calls, 1);
        assert_eq!(snapshot.cases_run, 2);
        assert_eq!(snapshot.cases_accepted, 1);
        assert_eq!(snapshot.cases_failed, 1);
        assert_eq!(snapshot.total_execution_time_ms, 40);
        assert_eq!(snapshot.peak_memory_kb, 500);
        assert_eq!(snapshot.average_execution_time_ms(), 20.0);
    }

    #[test]
    fn test_record_result() {
        let metrics = JudgeMetrics::new();
        let result = JudgeResult::from_cases(vec![
            case(Verdict::Accepted, 1, 1),
            case(Verdict::Accepted, 2, 2),
        ]);
        metrics.record_result(&result);
        assert_eq!(metrics.snapshot().cases_accepted, 2);
    }

    #[test]
    fn test_reset() {
        let metrics = JudgeMetrics::new();
        metrics.record_call();
        metrics.record_case(&case(Verdict::RuntimeError, 5, 5));
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
        assert_eq!(metrics.snapshot().average_execution_time_ms(), 0.0);
    }
}
