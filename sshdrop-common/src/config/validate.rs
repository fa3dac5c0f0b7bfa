//! Configuration validation.

use serde::Serialize;
use std::fmt;

use crate::types::DropConfig;

/// Chunks above this size risk hitting remote `ARG_MAX` limits.
pub const LARGE_CHUNK_WARNING: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One finding from [`validate_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field,
            message: message.into(),
        }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", label, self.field, self.message)
    }
}

/// Check `config` for an upload to `dest_path`.
///
/// `dest_path` is optional so the same checks can run from `config show`.
pub fn validate_config(config: &DropConfig, dest_path: Option<&str>) -> Vec<ConfigWarning> {
    let mut findings = Vec::new();

    if config.remote.host.trim().is_empty() {
        findings.push(ConfigWarning::error("remote.host", "host is not set"));
    }
    if config.remote.port == 0 {
        findings.push(ConfigWarning::error("remote.port", "port must be non-zero"));
    }

    let chunk_size = config.transfer.chunk_size;
    if chunk_size == 0 {
        findings.push(ConfigWarning::error(
            "transfer.chunk_size",
            "chunk size must be greater than zero",
        ));
    } else if chunk_size > LARGE_CHUNK_WARNING {
        findings.push(ConfigWarning::warning(
            "transfer.chunk_size",
            format!(
                "{} characters per command may exceed the remote argument limit",
                chunk_size
            ),
        ));
    }

    let temp = config.transfer.temp_path.trim();
    if temp.is_empty() {
        findings.push(ConfigWarning::error(
            "transfer.temp_path",
            "temporary path is empty",
        ));
    } else if dest_path.is_some_and(|dest| dest.trim() == temp) {
        findings.push(ConfigWarning::error(
            "transfer.temp_path",
            "temporary path must differ from the destination",
        ));
    }

    if let Some(var) = config.remote.password_env.as_deref()
        && !var.is_empty()
        && std::env::var(var).map(|v| v.is_empty()).unwrap_or(true)
    {
        findings.push(ConfigWarning::warning(
            "remote.password_env",
            format!("{} is not set in the environment", var),
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DropConfig {
        let mut config = DropConfig::default();
        config.remote.host = "example.com".to_string();
        config
    }

    #[test]
    fn test_valid_config_has_no_findings() {
        assert!(validate_config(&valid_config(), Some("/var/www/app.js")).is_empty());
    }

    #[test]
    fn test_missing_host_is_error() {
        let findings = validate_config(&DropConfig::default(), None);
        assert!(findings.iter().any(|f| f.field == "remote.host" && f.is_error()));
    }

    #[test]
    fn test_zero_chunk_size_is_error() {
        let mut config = valid_config();
        config.transfer.chunk_size = 0;
        let findings = validate_config(&config, None);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
    }

    #[test]
    fn test_large_chunk_is_warning() {
        let mut config = valid_config();
        config.transfer.chunk_size = 500_000;
        let findings = validate_config(&config, None);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].to_string().starts_with("warning: transfer.chunk_size"));
    }

    #[test]
    fn test_temp_equal_to_destination_is_error() {
        let config = valid_config();
        let findings = validate_config(&config, Some("/tmp/sshdrop.b64"));
        assert!(findings.iter().any(|f| f.field == "transfer.temp_path"));
    }

    #[test]
    fn test_unset_password_variable_is_warning() {
        let mut config = valid_config();
        config.remote.password_env = Some("SSHDROP_TEST_UNSET_PASSWORD_VAR".to_string());
        let findings = validate_config(&config, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }
}
