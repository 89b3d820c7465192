//! Command builder for sandboxed program launches
//!
//! Builds the argv used to start a submission, prefixed with the sandbox
//! wrapper's flags when the sandbox is enabled.

use std::path::{Path, PathBuf};

use crate::config::{SandboxPolicy, Toolchain};

/// Fully resolved launch of a submission, built once per judge call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommand {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl RunCommand {
    /// Resolve the toolchain's run step for `work_dir` under `policy`
    pub fn for_toolchain(toolchain: &Toolchain, policy: &SandboxPolicy, work_dir: &Path) -> Self {
        Self {
            argv: SandboxCommand::for_toolchain(toolchain, policy, work_dir).build(),
            env: Toolchain::expand_env(&toolchain.run.env, toolchain.source_name(), work_dir),
        }
    }
}

/// Builder for the run argv of one submission
#[derive(Debug)]
pub struct SandboxCommand {
    /// Wrapper invocation; `None` runs the program directly
    policy: Option<SandboxPolicy>,
    /// --private=<dir>
    work_dir: PathBuf,
    /// Per-language wrapper flags, placed after the policy flags
    extra_args: Vec<String>,
    program: Vec<String>,
}

impl SandboxCommand {
    /// Create a builder for a program run from `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            policy: None,
            work_dir: work_dir.into(),
            extra_args: Vec::new(),
            program: Vec::new(),
        }
    }

    /// Builder for the toolchain's run step, placeholders already expanded
    pub fn for_toolchain(toolchain: &Toolchain, policy: &SandboxPolicy, work_dir: &Path) -> Self {
        let program =
            Toolchain::expand_command(&toolchain.run.command, toolchain.source_name(), work_dir);
        Self::new(work_dir)
            .policy(policy)
            .extra_args(toolchain.run.sandbox_args.iter().cloned())
            .program(program)
    }

    /// Wrap the program according to `policy` (no-op if it is disabled)
    pub fn policy(mut self, policy: &SandboxPolicy) -> Self {
        self.policy = policy.enabled.then(|| policy.clone());
        self
    }

    /// Add wrapper arguments
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the program and its arguments
    pub fn program(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.program = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the built argv starts with the sandbox wrapper
    pub fn is_sandboxed(&self) -> bool {
        self.policy.is_some()
    }

    /// Build the command-line arguments
    ///
    /// Consumes self to avoid cloning the program vector.
    pub fn build(self) -> Vec<String> {
        let Some(policy) = self.policy else {
            return self.program;
        };

        let options = &policy.options;
        let mut args = vec![policy.command];

        if options.quiet {
            args.push("--quiet".to_string());
        }
        if options.seccomp {
            args.push("--seccomp".to_string());
        }
        if options.net_none {
            args.push("--net=none".to_string());
        }
        if options.no_groups {
            args.push("--nogroups".to_string());
        }
        if options.no_new_privs {
            args.push("--nonewprivs".to_string());
        }
        if !options.caps_drop.is_empty() {
            args.push(format!("--caps.drop={}", options.caps_drop));
        }

        args.push(format!("--private={}", self.work_dir.display()));
        args.extend(self.extra_args);
        args.extend(self.program);

        args
    }
}
