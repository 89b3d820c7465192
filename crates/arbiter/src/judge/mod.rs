//! End-to-end judging
//!
//! [`Judge`] sequences validation, compilation and per-case execution for one
//! submission and folds the case results into a single verdict. Everything a
//! call needs beyond its request lives in a shared [`JudgeContext`], built
//! once from a [`Config`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

pub use crate::judge::metrics::{JudgeMetrics, MetricsSnapshot};
pub use crate::judge::pool::{PoolError, WorkerPool};
pub use crate::judge::report::{TestOutcome, TestReport};
pub use crate::judge::workdir::{WorkDir, WorkDirError};
pub use crate::types::ExecutionPolicy;

mod metrics;
mod pool;
mod report;
mod workdir;

use crate::compare::OutputComparator;
use crate::compiler::{CompileOutcome, CompilerRegistry};
use crate::config::{Config, ConfigError};
use crate::language::Language;
use crate::sandbox::{RunCommand, SandboxExecutor};
use crate::types::{CaseResult, ExecutionLimits, JudgeResult, TestCase, Verdict};
use crate::validate::Validator;

/// One submission to judge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub test_cases: Vec<TestCase>,
    pub source_code: String,
    pub language: Language,

    /// Limits below their minimum are replaced by the configured defaults
    #[serde(default)]
    pub limits: ExecutionLimits,
}

impl JudgeRequest {
    pub fn new(
        source_code: impl Into<String>,
        language: Language,
        test_cases: Vec<TestCase>,
    ) -> Self {
        Self {
            test_cases,
            source_code: source_code.into(),
            language,
            limits: ExecutionLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Shared state for every judge call: configuration, toolchains, the case
/// executor, the worker pool and the counters
#[derive(Debug)]
pub struct JudgeContext {
    config: Config,
    registry: CompilerRegistry,
    validator: Validator,
    executor: SandboxExecutor,
    pool: WorkerPool,
    metrics: JudgeMetrics,
}

impl JudgeContext {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let validator = Validator::from_config(&config)?;
        let registry = CompilerRegistry::from_config(&config);
        let executor = SandboxExecutor::new(OutputComparator::new(config.compare))
            .max_output_bytes(config.max_output_bytes())
            .sample_interval(Duration::from_millis(config.memory_sample_interval_ms));
        let pool = WorkerPool::new(config.pool);

        Ok(Self {
            config,
            registry,
            validator,
            executor,
            pool,
            metrics: JudgeMetrics::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CompilerRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn metrics(&self) -> &JudgeMetrics {
        &self.metrics
    }
}

/// How far a call should run its cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    /// One at a time, stopping at the first failure
    StopOnFailure,
    /// Every case on the worker pool
    All,
}

impl From<ExecutionPolicy> for Schedule {
    fn from(policy: ExecutionPolicy) -> Self {
        match policy {
            ExecutionPolicy::Sequential => Schedule::StopOnFailure,
            ExecutionPolicy::Aggregate => Schedule::All,
        }
    }
}

/// The judging orchestrator
///
/// Cheap to clone; clones share one [`JudgeContext`].
#[derive(Debug, Clone)]
pub struct Judge {
    ctx: Arc<JudgeContext>,
}

impl Judge {
    /// Build a judge and its context from `config`
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Ok(Self::with_context(Arc::new(JudgeContext::new(config)?)))
    }

    pub fn with_context(ctx: Arc<JudgeContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<JudgeContext> {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// Judge a submission under the configured execution policy
    pub async fn judge(&self, request: JudgeRequest) -> JudgeResult {
        let policy = self.ctx.config.execution_policy;
        self.judge_with_policy(request, policy).await
    }

    /// Judge a submission under an explicit execution policy
    ///
    /// Never fails: rejections, compile failures and infrastructure problems
    /// all come back as a [`JudgeResult`] with the matching verdict.
    #[instrument(skip(self, request), fields(language = %request.language, cases = request.test_cases.len()))]
    pub async fn judge_with_policy(
        &self,
        request: JudgeRequest,
        policy: ExecutionPolicy,
    ) -> JudgeResult {
        self.ctx.metrics.record_call();

        let result = match self.contained(request, policy.into()).await {
            Ok(cases) => JudgeResult::from_cases(cases),
            Err(rejection) => rejection,
        };
        self.ctx.metrics.record_result(&result);

        info!(
            status = ?result.status,
            time_ms = result.total_execution_time_ms,
            memory_kb = result.max_memory_used_kb,
            ran = result.case_results.len(),
            "judging complete"
        );
        result
    }

    /// Run every case regardless of failures and report each one
    #[instrument(skip(self, request), fields(language = %request.language, cases = request.test_cases.len()))]
    pub async fn run_tests(&self, request: JudgeRequest) -> TestReport {
        self.ctx.metrics.record_call();

        let report = match self.contained(request, Schedule::All).await {
            Ok(cases) => {
                for case in &cases {
                    self.ctx.metrics.record_case(case);
                }
                TestReport::from_cases(cases)
            }
            Err(rejection) => TestReport::not_run(rejection.status, rejection.message),
        };

        info!(
            outcome = ?report.outcome,
            passed = report.passed,
            total = report.total,
            "test run complete"
        );
        report
    }

    /// Run one call on its own task so a panic becomes a system error
    async fn contained(
        &self,
        request: JudgeRequest,
        schedule: Schedule,
    ) -> Result<Vec<CaseResult>, JudgeResult> {
        let ctx = Arc::clone(&self.ctx);
        match tokio::spawn(process(ctx, request, schedule)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "judge task failed");
                Err(JudgeResult::system_error(format!("System error: {e}")))
            }
        }
    }
}

/// Validate, then compile and run inside a fresh working directory
async fn process(
    ctx: Arc<JudgeContext>,
    request: JudgeRequest,
    schedule: Schedule,
) -> Result<Vec<CaseResult>, JudgeResult> {
    let limits = request.limits.or_defaults(&ctx.config.default_limits);

    if let Err(e) = ctx.validator.validate(
        &request.source_code,
        request.language,
        &request.test_cases,
        limits,
    ) {
        warn!(error = %e, "submission rejected");
        return Err(e.into_result());
    }

    let work_dir = WorkDir::create(&ctx.config.temp_prefix, ctx.config.temp_root.as_deref())
        .map_err(|e| {
            error!(error = %e, "no working directory");
            JudgeResult::system_error(format!("System error: {e}"))
        })?;

    let outcome = compile_and_run(&ctx, &request, limits, schedule, work_dir.path()).await;
    work_dir.cleanup().await;
    outcome
}

async fn compile_and_run(
    ctx: &Arc<JudgeContext>,
    request: &JudgeRequest,
    limits: ExecutionLimits,
    schedule: Schedule,
    work_dir: &Path,
) -> Result<Vec<CaseResult>, JudgeResult> {
    match ctx
        .registry
        .compile(request.language, &request.source_code, work_dir)
        .await
    {
        Ok(CompileOutcome::Success { .. }) => {}
        Ok(CompileOutcome::Failed { diagnostics }) => {
            debug!("compilation failed");
            return Err(JudgeResult::rejected(
                Verdict::CompilationError,
                diagnostics,
            ));
        }
        Err(e) => return Err(system_error(e)),
    }

    let run = ctx
        .registry
        .run_command(request.language, work_dir, &ctx.config.sandbox)
        .map_err(system_error)?;
    debug!(argv = ?run.argv, "resolved run command");

    match schedule {
        Schedule::StopOnFailure => {
            Ok(run_sequential(ctx, &request.test_cases, work_dir, &run, limits).await)
        }
        Schedule::All => {
            run_on_pool(ctx, &request.test_cases, work_dir, run, limits)
                .await
                .map_err(system_error)
        }
    }
}

fn system_error(e: impl std::fmt::Display) -> JudgeResult {
    error!(error = %e, "judging failed");
    JudgeResult::system_error(format!("System error: {e}"))
}

/// Submission order, stopping after the first case that is not accepted
async fn run_sequential(
    ctx: &JudgeContext,
    cases: &[TestCase],
    work_dir: &Path,
    run: &RunCommand,
    limits: ExecutionLimits,
) -> Vec<CaseResult> {
    let mut results = Vec::with_capacity(cases.len());
    for (index, case) in cases.iter().enumerate() {
        let result = ctx
            .executor
            .execute(case, work_dir, &run.argv, &run.env, limits)
            .await;
        let stop = !result.is_accepted();
        results.push(result);
        if stop {
            debug!(index, "stopping at first failed case");
            break;
        }
    }
    results
}

/// Every case on the worker pool; results come back in submission order
async fn run_on_pool(
    ctx: &Arc<JudgeContext>,
    cases: &[TestCase],
    work_dir: &Path,
    run: RunCommand,
    limits: ExecutionLimits,
) -> Result<Vec<CaseResult>, PoolError> {
    let mut reservation = ctx.pool.try_reserve(cases.len())?;
    let run = Arc::new(run);
    let work_dir = Arc::new(work_dir.to_path_buf());

    let mut tasks = JoinSet::new();
    for (index, case) in cases.iter().enumerate() {
        let Some(ticket) = reservation.ticket() else {
            break;
        };
        let ctx = Arc::clone(ctx);
        let run = Arc::clone(&run);
        let work_dir = Arc::clone(&work_dir);
        let case = case.clone();

        tasks.spawn(async move {
            let result = match ticket.start().await {
                Ok(_permit) => {
                    ctx.executor
                        .execute(&case, &work_dir, &run.argv, &run.env, limits)
                        .await
                }
                Err(e) => CaseResult::new(&case, Verdict::SystemError).with_message(e.to_string()),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<CaseResult>> = vec![None; cases.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!(error = %e, "test case task failed"),
        }
    }

    Ok(slots
        .into_iter()
        .zip(cases)
        .map(|(slot, case)| {
            slot.unwrap_or_else(|| {
                CaseResult::new(case, Verdict::SystemError).with_message("test case task failed")
            })
        })
        .collect())
}
