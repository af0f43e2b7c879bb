//! Logging setup.
//!
//! Events go to two sinks: the console (with ANSI colors) and a log file
//! opened in append mode (plain text). The filter comes from `RUST_LOG`
//! when set, otherwise from the `--debug` flag.

// ============================================================================
// Imports
// ============================================================================

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Crates whose events are shown by default.
const TARGETS: [&str; 2] = ["discord_voice_connector", "voice_connector"];

// ============================================================================
// Functions
// ============================================================================

/// Installs the global subscriber.
///
/// # Errors
///
/// - [`Error::Io`] if the log file cannot be opened
/// - [`Error::Runtime`] if a global subscriber is already installed
pub fn init_logging(debug: bool, log_file: &Path) -> Result<()> {
    let file = open_log_file(log_file)?;
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(build_filter(debug, env.as_deref()))
        .with(fmt::layer().with_target(true))
        .with(file_layer(file))
        .try_init()
        .map_err(|e| Error::runtime(format!("failed to install logger: {e}")))
}

/// Builds the event filter. A valid `env` directive wins over `debug`.
fn build_filter(debug: bool, env: Option<&str>) -> EnvFilter {
    if let Some(directives) = env
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return filter;
    }

    let level = if debug { "debug" } else { "info" };
    let directives = TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Opens the log file for appending, creating it and its parent directory.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
}

// ============================================================================
// Test Capture
// ============================================================================

/// In-memory log sink for tests that assert on emitted events.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::{Level, Subscriber};

    #[derive(Debug, Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Plain-text subscriber writing into this buffer.
        pub(crate) fn subscriber(&self, level: Level) -> impl Subscriber + Send + Sync + 'static {
            let logs = self.clone();
            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_max_level(level)
                .with_writer(move || logs.clone())
                .finish()
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }

        pub(crate) fn count(&self, needle: &str) -> usize {
            self.contents().matches(needle).count()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
