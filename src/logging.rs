//! Diagnostic log setup.
//!
//! The engine only emits `tracing` events. Applications decide where they go
//! by installing a subscriber, usually with [`init`]:
//!
//! ```no_run
//! use modbus_bitsync::logging::{self, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Keep the guard alive; dropping it flushes the file.
//!     let _guard = logging::init(LogConfig::default())?;
//!     tracing::info!("started");
//!     Ok(())
//! }
//! ```
//!
//! `RUST_LOG` overrides [`LogConfig::level`] when set.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default diagnostic log file.
pub const DEFAULT_LOG_FILE: &str = "trackcircuit.log";

/// Error returned by [`init`].
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: Level,
    /// Append-only log file. `None` disables file output.
    pub file_path: Option<PathBuf>,
    /// Also log to stderr.
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            stderr: true,
        }
    }
}

impl LogConfig {
    /// Stderr only, no file.
    pub fn stderr_only() -> Self {
        Self {
            file_path: None,
            ..Self::default()
        }
    }

    /// Sets the default level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the log file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Enables or disables stderr output.
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Installs the global subscriber.
///
/// Returns the file writer's guard when a file is configured. Events still
/// buffered are flushed when the guard is dropped.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init(config: LogConfig) -> Result<Option<WorkerGuard>, InitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let (file_layer, guard) = match config.file_path {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(&path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn file_appender(path: &Path) -> std::io::Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let file = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
    Ok(tracing_appender::rolling::never(dir, file))
}
