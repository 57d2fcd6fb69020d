//! Tracing setup for the `rowmirror` binary.
//!
//! Output goes to stderr, compact by default or JSON lines when
//! `ROWMIRROR_LOG_FORMAT=json`. `RUST_LOG` overrides the level.

use std::path::PathBuf;

use observability::{LogConfig, LogFormat};
use tracing::Level;

const FORMAT_ENV: &str = "ROWMIRROR_LOG_FORMAT";

/// Installs the global subscriber. Later calls are ignored.
///
/// With `log_file` set, events are appended there as JSON lines instead.
pub fn init_logging(level: &str, log_file: Option<PathBuf>) {
    let format = match std::env::var(FORMAT_ENV) {
        Ok(name) => LogFormat::from_name(&name),
        Err(_) => LogFormat::default(),
    };

    let config = LogConfig {
        service_name: "rowmirror".into(),
        default_level: filter_directive(parse_level(level)).to_string(),
        format,
        log_path: log_file,
    };
    observability::init_with_config(config);
}

/// Maps a level name to a tracing level. Unknown names mean INFO.
pub fn parse_level(level: &str) -> Level {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn filter_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names() {
        for (name, level) in [
            ("trace", Level::TRACE),
            ("debug", Level::DEBUG),
            ("info", Level::INFO),
            ("warn", Level::WARN),
            ("warning", Level::WARN),
            ("error", Level::ERROR),
        ] {
            assert_eq!(parse_level(name), level, "{name}");
        }
    }

    #[test]
    fn names_ignore_case_and_padding() {
        assert_eq!(parse_level(" Debug "), Level::DEBUG);
        assert_eq!(parse_level("WARNING"), Level::WARN);
    }

    #[test]
    fn unknown_names_fall_back_to_info() {
        assert_eq!(parse_level(""), Level::INFO);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }

    #[test]
    fn warning_becomes_a_valid_directive() {
        assert_eq!(filter_directive(parse_level("warning")), "warn");
    }
}
