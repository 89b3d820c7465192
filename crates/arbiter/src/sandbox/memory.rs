//! Best-effort resident memory sampling
//!
//! Every estimate is a point-in-time reading in kilobytes. Failures and
//! unsupported platforms read as 0; sampling never returns an error.

use std::time::Duration;

use tracing::debug;

/// Attempts made before a probe gives up on an unpopulated counter
const PROBE_ATTEMPTS: usize = 5;

/// Pause between attempts
const PROBE_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Resident memory sampler for running processes
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryProbe;

impl MemoryProbe {
    pub fn new() -> Self {
        Self
    }

    /// Estimate resident memory of `pid` in KB
    ///
    /// On Linux the estimate covers the process and its live descendants, so
    /// a program started through a sandbox wrapper is still accounted for.
    pub async fn sample(&self, pid: u32) -> u64 {
        if pid == 0 {
            return 0;
        }
        platform::sample(pid).await
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::path::PathBuf;

    use super::{PROBE_ATTEMPTS, PROBE_RETRY_DELAY, debug};

    pub(super) async fn sample(pid: u32) -> u64 {
        let mut total = process_rss(pid).await;
        for child in descendants(pid).await {
            total += read_status_rss(child).await.unwrap_or(0);
        }
        total
    }

    /// RSS of one process: `status` first, `statm` as fallback, with retries
    async fn process_rss(pid: u32) -> u64 {
        for attempt in 0..PROBE_ATTEMPTS {
            if let Some(kb) = read_status_rss(pid).await.filter(|kb| *kb > 0) {
                return kb;
            }
            if let Some(kb) = read_statm_rss(pid).await.filter(|kb| *kb > 0) {
                return kb;
            }
            if attempt + 1 < PROBE_ATTEMPTS {
                tokio::time::sleep(PROBE_RETRY_DELAY).await;
            }
        }
        debug!(pid, "memory counters never populated");
        0
    }

    /// `VmRSS` from `/proc/<pid>/status`, shared and file-backed pages included
    async fn read_status_rss(pid: u32) -> Option<u64> {
        let content = tokio::fs::read_to_string(format!("/proc/{pid}/status"))
            .await
            .ok()?;
        status_rss(&content)
    }

    pub(super) fn status_rss(content: &str) -> Option<u64> {
        parse_status_field(content, "VmRSS:")
    }

    /// Resident pages from `/proc/<pid>/statm`, converted to KB
    async fn read_statm_rss(pid: u32) -> Option<u64> {
        let content = tokio::fs::read_to_string(format!("/proc/{pid}/statm"))
            .await
            .ok()?;
        let pages = parse_statm_resident(&content)?;
        Some(pages * page_size_kb())
    }

    pub(super) fn parse_status_field(content: &str, field: &str) -> Option<u64> {
        content
            .lines()
            .find_map(|line| line.strip_prefix(field))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|value| value.parse().ok())
    }

    pub(super) fn parse_statm_resident(content: &str) -> Option<u64> {
        content.split_whitespace().nth(1)?.parse().ok()
    }

    fn page_size_kb() -> u64 {
        // SAFETY: sysconf has no preconditions
        let bytes = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if bytes > 0 { bytes as u64 / 1024 } else { 4 }
    }

    /// Live descendants of `pid`, breadth first
    async fn descendants(pid: u32) -> Vec<u32> {
        let mut found = Vec::new();
        let mut frontier = vec![pid];
        while let Some(parent) = frontier.pop() {
            for child in children(parent).await {
                if !found.contains(&child) && child != pid {
                    found.push(child);
                    frontier.push(child);
                }
            }
        }
        found
    }

    async fn children(pid: u32) -> Vec<u32> {
        let task_dir = PathBuf::from(format!("/proc/{pid}/task"));
        let Ok(mut entries) = tokio::fs::read_dir(&task_dir).await else {
            return Vec::new();
        };
        let mut children = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(list) = tokio::fs::read_to_string(entry.path().join("children")).await else {
                continue;
            };
            children.extend(list.split_whitespace().filter_map(|id| id.parse::<u32>().ok()));
        }
        children
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use tokio::process::Command;

    use super::{PROBE_ATTEMPTS, PROBE_RETRY_DELAY, debug};

    /// `ps -o rss=` reports kilobytes
    pub(super) async fn sample(pid: u32) -> u64 {
        for attempt in 0..PROBE_ATTEMPTS {
            match Command::new("ps")
                .args(["-o", "rss=", "-p", &pid.to_string()])
                .output()
                .await
            {
                Ok(output) => {
                    let text = String::from_utf8_lossy(&output.stdout);
                    if let Some(kb) = text.trim().parse::<u64>().ok().filter(|kb| *kb > 0) {
                        return kb;
                    }
                }
                Err(e) => debug!(pid, error = %e, "ps failed"),
            }
            if attempt + 1 < PROBE_ATTEMPTS {
                tokio::time::sleep(PROBE_RETRY_DELAY).await;
            }
        }
        0
    }
}

#[cfg(windows)]
mod platform {
    use tokio::process::Command;

    use super::{PROBE_ATTEMPTS, PROBE_RETRY_DELAY, debug};

    /// `wmic` reports the working set in bytes
    pub(super) async fn sample(pid: u32) -> u64 {
        for attempt in 0..PROBE_ATTEMPTS {
            match Command::new("wmic")
                .args([
                    "process",
                    "where",
                    &format!("ProcessId={pid}"),
                    "get",
                    "WorkingSetSize",
                ])
                .output()
                .await
            {
                Ok(output) => {
                    let bytes = String::from_utf8_lossy(&output.stdout)
                        .lines()
                        .filter_map(|line| line.trim().parse::<u64>().ok())
                        .max()
                        .unwrap_or(0);
                    if bytes > 0 {
                        return bytes / 1024;
                    }
                }
                Err(e) => debug!(pid, error = %e, "wmic failed"),
            }
            if attempt + 1 < PROBE_ATTEMPTS {
                tokio::time::sleep(PROBE_RETRY_DELAY).await;
            }
        }
        0
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod platform {
    pub(super) async fn sample(_pid: u32) -> u64 {
        0
    }
}
