//! Integration tests for arbiter
//!
//! Shell-based tests need only a POSIX `sh` and run by default on unix.
//! Tests that need real compilers, interpreters or the sandbox binary are
//! gated behind the `toolchain-tests` feature and marked `#[ignore]`:
//!   cargo test -p arbiter --features toolchain-tests -- --include-ignored

#![cfg(unix)]

use std::collections::HashMap;
use std::fs;

use arbiter::config::{CompileConfig, RunConfig, SourceName, Toolchain};
use arbiter::{Config, Language, SandboxPolicy};

mod config_loading;
mod judging;
#[cfg(feature = "toolchain-tests")]
mod toolchains;
mod validation;
mod working_directory;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Unsandboxed config whose Python toolchain is a POSIX shell script
pub(crate) fn shell_config() -> Config {
    let mut config = Config::empty();
    config.sandbox = SandboxPolicy::disabled();
    config.set_toolchain(
        Language::Python,
        Toolchain {
            name: "POSIX sh".to_string(),
            compile: CompileConfig {
                source_name: SourceName::new("solution.sh").unwrap(),
                command: vec!["sh".into(), "-n".into(), "{source}".into()],
                env: HashMap::new(),
            },
            run: RunConfig {
                command: vec!["sh".into(), "{workdir}/{source}".into()],
                env: HashMap::new(),
                sandbox_args: Vec::new(),
            },
        },
    );
    config
}
