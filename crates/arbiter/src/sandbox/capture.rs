//! Capped background capture of a child's output pipe
//!
//! Bytes land in a shared buffer as they are read, so a reader that has to be
//! abandoned still yields everything it saw.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::debug;

/// How long a reader may keep running after the process is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Size of each read from a pipe
const READ_CHUNK: usize = 8192;

/// One output pipe being read on its own task
#[derive(Debug)]
pub(crate) struct Capture {
    kept: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl Capture {
    /// Start reading `reader` to EOF, keeping at most `cap` bytes
    pub(crate) fn spawn<R>(reader: R, cap: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let kept = Arc::new(Mutex::new(Vec::new()));
        let handle = tokio::spawn(drain(reader, cap, Arc::clone(&kept)));
        Self { kept, handle }
    }

    /// Wait for EOF for at most [`DRAIN_GRACE`], then return what was read
    pub(crate) async fn finish(mut self) -> Vec<u8> {
        match tokio::time::timeout(DRAIN_GRACE, &mut self.handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => debug!(error = %e, "output pipe read failed"),
            Ok(Err(e)) => debug!(error = %e, "output reader panicked"),
            Err(_) => {
                // Something outside the process group still holds the pipe
                debug!("output pipe still open, keeping partial output");
                self.handle.abort();
            }
        }
        self.take()
    }

    /// Stop reading without waiting
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }

    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.kept.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Read a pipe to EOF; bytes past `cap` are read and discarded
async fn drain<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
    kept: Arc<Mutex<Vec<u8>>>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let mut kept = kept.lock().unwrap_or_else(PoisonError::into_inner);
        let room = cap.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
}
