//! Sandboxed program execution
//!
//! The isolation itself is delegated to an external wrapper (firejail by
//! default). This module builds the wrapped invocation, runs it against test
//! cases and samples its memory.

pub use crate::sandbox::command::{RunCommand, SandboxCommand};
pub use crate::sandbox::executor::{ExecuteError, SandboxExecutor};
pub use crate::sandbox::memory::MemoryProbe;
pub(crate) use crate::sandbox::capture::Capture;
pub(crate) use crate::sandbox::executor::kill_group;

mod capture;
mod command;
mod executor;
mod memory;
