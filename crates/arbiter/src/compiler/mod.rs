//! Compilation step
//!
//! Each language writes the submission under its canonical file name in the
//! working directory and runs its compile command there. Interpreted
//! languages run a syntax check instead. Compiler diagnostics are stdout
//! followed by stderr, each capped like program output.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::{Config, SandboxPolicy, Toolchain};
use crate::language::Language;
use crate::sandbox::{Capture, RunCommand, kill_group};

/// Diagnostic reported when the compile step exceeds its deadline
pub const COMPILE_TIMEOUT_MESSAGE: &str = "compilation timed out";

/// Infrastructure failures of the compile step.
///
/// A program that fails to compile is not an error; see [`CompileOutcome`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no toolchain configured for language '{0}'")]
    ToolchainNotFound(Language),

    #[error("toolchain for '{0}' has an empty compile command")]
    EmptyCommand(Language),

    #[error("failed to write source file {}: {source}", path.display())]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler {0} pipe was not captured")]
    PipeUnavailable(&'static str),
}

/// Result of compiling one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Artifact ready; `output` holds any warnings
    Success { output: String },

    /// The toolchain rejected the source
    Failed { diagnostics: String },
}

impl CompileOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success { .. })
    }
}

/// Language to toolchain table, populated once at startup
#[derive(Debug, Clone)]
pub struct CompilerRegistry {
    toolchains: HashMap<Language, Toolchain>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CompilerRegistry {
    /// Build the registry from every toolchain in `config`
    pub fn from_config(config: &Config) -> Self {
        let toolchains = config
            .languages
            .iter()
            .filter_map(|(id, toolchain)| Some((id.parse().ok()?, toolchain.clone())))
            .collect();
        Self {
            toolchains,
            timeout: Duration::from_millis(config.compile_timeout_ms),
            max_output_bytes: config.max_output_bytes(),
        }
    }

    pub fn toolchain(&self, language: Language) -> Result<&Toolchain, CompileError> {
        self.toolchains
            .get(&language)
            .ok_or(CompileError::ToolchainNotFound(language))
    }

    /// Whether `language` has a toolchain
    pub fn supports(&self, language: Language) -> bool {
        self.toolchains.contains_key(&language)
    }

    /// Write `source` into `work_dir` and compile it there
    #[instrument(skip(self, source, work_dir))]
    pub async fn compile(
        &self,
        language: Language,
        source: &str,
        work_dir: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        let toolchain = self.toolchain(language)?;
        let source_name = toolchain.source_name();

        let path = work_dir.join(source_name);
        tokio::fs::write(&path, source)
            .await
            .map_err(|source| CompileError::WriteSource {
                path: path.clone(),
                source,
            })?;
        debug!(source_name, "wrote source file");

        let argv = Toolchain::expand_command(&toolchain.compile.command, source_name, work_dir);
        let env = Toolchain::expand_env(&toolchain.compile.env, source_name, work_dir);
        let (program, args) = argv
            .split_first()
            .ok_or(CompileError::EmptyCommand(language))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(work_dir)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        debug!(?argv, "running compile command");
        let mut child = command.spawn().map_err(|source| CompileError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let stdout = child.stdout.take().ok_or(CompileError::PipeUnavailable("stdout"))?;
        let stderr = child.stderr.take().ok_or(CompileError::PipeUnavailable("stderr"))?;
        let stdout = Capture::spawn(stdout, self.max_output_bytes);
        let stderr = Capture::spawn(stderr, self.max_output_bytes);

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                kill_group(pid);
                stdout.abort();
                stderr.abort();
                return Err(CompileError::Spawn {
                    program: program.clone(),
                    source: e,
                });
            }
            Err(_) => {
                kill_group(pid);
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "failed to kill compiler");
                }
                stdout.abort();
                stderr.abort();
                debug!(timeout = ?self.timeout, "compilation timed out");
                return Ok(CompileOutcome::Failed {
                    diagnostics: COMPILE_TIMEOUT_MESSAGE.to_string(),
                });
            }
        };
        // Helpers left behind by the compiler would keep the pipes open
        kill_group(pid);

        let mut diagnostics = String::from_utf8_lossy(&stdout.finish().await).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&stderr.finish().await));

        debug!(
            success = status.success(),
            exit_code = ?status.code(),
            "compilation complete"
        );

        if status.success() {
            return Ok(CompileOutcome::Success {
                output: diagnostics,
            });
        }

        if diagnostics.trim().is_empty() {
            diagnostics = match status.code() {
                Some(code) => format!("Compilation failed with exit code {code}"),
                None => "Compilation failed".to_string(),
            };
        }
        Ok(CompileOutcome::Failed { diagnostics })
    }

    /// Resolve the launch of a compiled submission in `work_dir`
    pub fn run_command(
        &self,
        language: Language,
        work_dir: &Path,
        policy: &SandboxPolicy,
    ) -> Result<RunCommand, CompileError> {
        let toolchain = self.toolchain(language)?;
        Ok(RunCommand::for_toolchain(toolchain, policy, work_dir))
    }
}
