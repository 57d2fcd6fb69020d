//! Tracing subscriber setup for rowmirror binaries.
//!
//! Library crates only emit events through `tracing`. A binary installs the
//! subscriber once, at startup, and picks the destination.
//!
//! # Output
//!
//! - Compact text on stderr by default
//! - JSON lines on stderr with [`LogFormat::Json`]
//! - JSON lines appended to a file when `log_path` is set
//!
//! `RUST_LOG` always overrides the configured default level.
//!
//! # Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("rowmirror");
//!     tracing::info!("ready");
//! }
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Line format for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to compact output.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Compact,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, logged once at startup.
    pub service_name: String,

    /// Filter directive used when `RUST_LOG` is unset.
    pub default_level: String,

    /// Output format on stderr.
    pub format: LogFormat,

    /// Optional file that receives JSON lines instead of stderr.
    pub log_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "rowmirror".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
        }
    }
}

/// Compact stderr output at `info`.
///
/// Returns false if a global subscriber was already installed.
pub fn init(service_name: &str) -> bool {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
///
/// Returns false if a global subscriber was already installed or the log file
/// could not be opened; in the latter case stderr is used instead.
pub fn init_with_config(config: LogConfig) -> bool {
    if let Some(path) = &config.log_path {
        match open_log_file(path) {
            Ok(file) => {
                let installed = tracing_subscriber::fmt()
                    .with_env_filter(env_filter(&config.default_level))
                    .with_writer(Mutex::new(file))
                    .json()
                    .try_init()
                    .is_ok();
                if installed {
                    tracing::info!(service = %config.service_name, path = %path.display(), "Logging initialized");
                }
                return installed;
            }
            Err(e) => {
                eprintln!("failed to open log file {}: {}", path.display(), e);
            }
        }
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.default_level))
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::debug!(service = %config.service_name, "Logging initialized");
    }
    installed
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
