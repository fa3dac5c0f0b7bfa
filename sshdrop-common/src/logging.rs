//! Logging setup shared by the sshdrop binaries and tests.
//!
//! Logs go to stderr (stdout is reserved for command output such as
//! `--json` reports) and optionally to a JSON file through a non-blocking
//! `tracing-appender` writer.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Output format for the stderr layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("log file path has no file name: {0}")]
    InvalidFile(PathBuf),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub stderr: bool,
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Read `SSHDROP_LOG_LEVEL`, `SSHDROP_LOG_FORMAT` and `SSHDROP_LOG_FILE`,
    /// falling back to `default_level` and compact output.
    pub fn from_env(default_level: &str) -> Self {
        let level = std::env::var("SSHDROP_LOG_LEVEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_level.to_string());
        let format = std::env::var("SSHDROP_LOG_FORMAT")
            .ok()
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Compact);
        let file = std::env::var("SSHDROP_LOG_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| PathBuf::from(shellexpand::tilde(&v).into_owned()));

        Self {
            level,
            format,
            stderr: false,
            file,
        }
    }

    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Filter directive. A bare level applies to the sshdrop crates only so
    /// dependencies stay quiet; anything else is used verbatim.
    fn filter_directive(&self) -> String {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => format!(
                "warn,sshdrop={lvl},sshdrop_common={lvl}",
                lvl = self.level
            ),
            other => other.to_string(),
        }
    }
}

/// Keeps non-blocking writers alive; drop flushes them.
#[must_use = "dropping the guards stops file logging"]
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards, LoggingError> {
    let directive = config.filter_directive();
    let filter = EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.clone(),
        message: e.to_string(),
    })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guards = Vec::new();

    if config.stderr {
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };
        layers.push(layer);
    }

    if let Some(ref path) = config.file {
        let file_name = path
            .file_name()
            .ok_or_else(|| LoggingError::InvalidFile(path.clone()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuards { _guards: guards })
}

/// Best-effort subscriber for unit and integration tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("sshdrop_common=debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scopes_to_crates() {
        let config = LogConfig {
            level: "debug".into(),
            format: LogFormat::Compact,
            stderr: true,
            file: None,
        };
        assert_eq!(
            config.filter_directive(),
            "warn,sshdrop=debug,sshdrop_common=debug"
        );
    }

    #[test]
    fn test_custom_directive_passes_through() {
        let config = LogConfig {
            level: "sshdrop_common::remote=trace".into(),
            format: LogFormat::Json,
            stderr: false,
            file: None,
        };
        assert_eq!(config.filter_directive(), "sshdrop_common::remote=trace");
    }

    #[test]
    fn test_builder_methods() {
        let config = LogConfig {
            level: "info".into(),
            format: LogFormat::Compact,
            stderr: false,
            file: None,
        }
        .with_stderr()
        .with_level("warn")
        .with_format(LogFormat::Json)
        .with_file("/tmp/sshdrop.log");

        assert!(config.stderr);
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/sshdrop.log")));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
