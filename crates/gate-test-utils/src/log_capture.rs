//! In-memory log capture
//!
//! Installs a thread-local `fmt` subscriber that writes into a shared
//! buffer, so tests can assert on what operators would see.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Buffer collecting formatted log lines.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Install a subscriber with `filter` for the current thread.
    ///
    /// Events are captured until the returned guard is dropped. Use with the
    /// default current-thread `#[tokio::test]` runtime.
    ///
    /// # Example
    /// ```rust,ignore
    /// let (logs, _guard) = CapturedLogs::install(default_env_filter());
    /// gate.authorize(&event).await.unwrap_err();
    /// assert!(logs.contents().contains("missing_credential"));
    /// ```
    pub fn install(filter: EnvFilter) -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    /// Everything logged so far.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
