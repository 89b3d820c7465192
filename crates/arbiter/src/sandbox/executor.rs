//! Running one test case against a prepared program
//!
//! The executor spawns the program, feeds the case input, drains both output
//! streams, samples memory while the program runs and waits for exit under a
//! wall clock deadline. Outcomes are classified in a fixed order: timeout,
//! nonzero exit, memory, time, then output comparison.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::compare::{OutputComparator, normalize};
use crate::sandbox::capture::Capture;
use crate::sandbox::memory::MemoryProbe;
use crate::types::{CaseResult, ExecutionLimits, TestCase, Verdict};

/// Failures that prevent a test case from running at all
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("empty run command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} pipe was not captured")]
    PipeUnavailable(&'static str),

    #[error("failed to wait for program: {0}")]
    Wait(#[source] std::io::Error),
}

/// Per-case executor
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    probe: MemoryProbe,
    comparator: OutputComparator,
    max_output_bytes: usize,
    sample_interval: Option<Duration>,
}

/// Raw observations of one run, before classification
#[derive(Debug)]
struct RunOutcome {
    /// `None` if the deadline elapsed
    status: Option<ExitStatus>,
    elapsed: Duration,
    memory_kb: u64,
    stdout: String,
    stderr: String,
}

impl SandboxExecutor {
    pub fn new(comparator: OutputComparator) -> Self {
        Self {
            probe: MemoryProbe::new(),
            comparator,
            max_output_bytes: 64 * 1024 * 1024,
            sample_interval: Some(Duration::from_millis(10)),
        }
    }

    /// Cap on bytes kept per output stream; the rest is read and discarded
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Interval between memory samples; zero takes a single sample
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Run `argv` in `work_dir` against one test case
    ///
    /// Never fails: problems launching the program are reported as
    /// [`Verdict::SystemError`].
    #[instrument(skip(self, case, argv, env), fields(program = argv.first().map(String::as_str)))]
    pub async fn execute(
        &self,
        case: &TestCase,
        work_dir: &Path,
        argv: &[String],
        env: &[(String, String)],
        limits: ExecutionLimits,
    ) -> CaseResult {
        match self.run(case, work_dir, argv, env, limits).await {
            Ok(outcome) => self.classify(case, outcome, limits),
            Err(e) => {
                warn!(error = %e, "test case could not run");
                CaseResult::new(case, Verdict::SystemError).with_message(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        case: &TestCase,
        work_dir: &Path,
        argv: &[String],
        env: &[(String, String)],
        limits: ExecutionLimits,
    ) -> Result<RunOutcome, ExecuteError> {
        let (program, args) = argv.split_first().ok_or(ExecuteError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(work_dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        debug!(?argv, "spawning test case");
        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| ExecuteError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let outcome = self.supervise(&mut child, pid, started, case, limits).await;
        release(&mut child, pid).await;
        outcome
    }

    async fn supervise(
        &self,
        child: &mut Child,
        pid: Option<u32>,
        started: Instant,
        case: &TestCase,
        limits: ExecutionLimits,
    ) -> Result<RunOutcome, ExecuteError> {
        let mut stdin = child.stdin.take().ok_or(ExecuteError::PipeUnavailable("stdin"))?;
        let stdout = child.stdout.take().ok_or(ExecuteError::PipeUnavailable("stdout"))?;
        let stderr = child.stderr.take().ok_or(ExecuteError::PipeUnavailable("stderr"))?;

        let input = case.input.clone().into_bytes();
        let writer = tokio::spawn(async move {
            // Programs may exit without reading their input
            if let Err(e) = stdin.write_all(&input).await {
                debug!(error = %e, "stdin closed early");
            }
            drop(stdin);
        });
        let stdout = Capture::spawn(stdout, self.max_output_bytes);
        let stderr = Capture::spawn(stderr, self.max_output_bytes);

        let sampler = MemorySampler::start(self.probe, pid, self.sample_interval);

        let deadline = Duration::from_millis(limits.time_limit_ms);
        let waited = tokio::time::timeout(deadline, child.wait()).await;
        let elapsed = started.elapsed();

        let status = match waited {
            Ok(Ok(status)) => {
                // Background descendants would otherwise hold the pipes open
                kill_group(pid);
                Some(status)
            }
            Ok(Err(e)) => {
                sampler.finish().await;
                writer.abort();
                stdout.abort();
                stderr.abort();
                return Err(ExecuteError::Wait(e));
            }
            Err(_) => {
                debug!(?pid, ?elapsed, "deadline elapsed, killing program");
                kill_tree(child, pid).await;
                None
            }
        };

        let memory_kb = sampler.finish().await;
        writer.abort();
        let stdout = stdout.finish().await;
        let stderr = stderr.finish().await;

        Ok(RunOutcome {
            status,
            elapsed,
            memory_kb,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    fn classify(&self, case: &TestCase, outcome: RunOutcome, limits: ExecutionLimits) -> CaseResult {
        let time_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX);
        let actual = normalize(&outcome.stdout, self.comparator.options().ignore_whitespace);
        let base = |status| {
            CaseResult::new(case, status)
                .with_time(time_ms)
                .with_memory(outcome.memory_kb)
                .with_output(actual.clone())
        };

        let Some(status) = outcome.status else {
            return base(Verdict::TimeLimitExceeded).with_message(outcome.stderr);
        };

        if !status.success() {
            let message = if outcome.stderr.trim().is_empty() {
                describe_exit(status)
            } else {
                outcome.stderr
            };
            return base(Verdict::RuntimeError).with_message(message);
        }

        if outcome.memory_kb > limits.memory_limit_kb {
            return base(Verdict::MemoryLimitExceeded);
        }
        if time_ms > limits.time_limit_ms {
            return base(Verdict::TimeLimitExceeded);
        }

        if self
            .comparator
            .compare(Some(&case.expected_output), Some(&outcome.stdout))
        {
            base(Verdict::Accepted)
        } else {
            base(Verdict::WrongAnswer)
        }
    }
}

impl Default for SandboxExecutor {
    fn default() -> Self {
        Self::new(OutputComparator::default())
    }
}

/// Background memory sampling for one process
struct MemorySampler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
    peak: Arc<AtomicU64>,
}

impl MemorySampler {
    fn start(probe: MemoryProbe, pid: Option<u32>, interval: Option<Duration>) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let peak = Arc::new(AtomicU64::new(0));
        let recorded = Arc::clone(&peak);

        let handle = tokio::spawn(async move {
            let Some(pid) = pid else { return };
            loop {
                let kb = probe.sample(pid).await;
                recorded.fetch_max(kb, Ordering::Relaxed);

                let Some(interval) = interval else { break };
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stopped.changed() => break,
                }
            }
        });

        Self { stop, handle, peak }
    }

    /// Stop sampling and return the largest sample.
    ///
    /// Waits for the sample in progress so at least one is always taken.
    async fn finish(self) -> u64 {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            debug!(error = %e, "memory sampler did not finish");
        }
        self.peak.load(Ordering::Relaxed)
    }
}

/// Kill the program and everything in its process group, then reap it
async fn kill_tree(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "failed to kill program");
    }
}

/// Make sure nothing from this run survives
async fn release(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    match child.try_wait() {
        Ok(Some(_)) => {}
        Ok(None) => {
            if let Err(e) = child.kill().await {
                warn!(?pid, error = %e, "failed to release program");
            }
        }
        Err(e) => debug!(?pid, error = %e, "failed to poll program"),
    }
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
pub(crate) fn kill_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; callers spawn with process_group(0)
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_group(_pid: Option<u32>) {}

fn describe_exit(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Program terminated by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("Program exited with code {code}"),
        None => "Program terminated abnormally".to_string(),
    }
}
