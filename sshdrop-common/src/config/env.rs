//! `SSHDROP_*` environment overrides.
//!
//! Every getter returns a [`Sourced`] value so callers can tell an explicit
//! override from a fallback. Bad values fall back to the default and are
//! collected, so one run reports every broken variable together.

use std::env;

use thiserror::Error;

use super::source::Sourced;

const PREFIX: &str = "SSHDROP_";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("{var}='{value}' is not a valid {expected}")]
    Invalid {
        var: String,
        expected: &'static str,
        value: String,
    },

    #[error("{var}={value} is outside {min}..={max}")]
    OutOfRange {
        var: String,
        value: u64,
        min: u64,
        max: u64,
    },
}

#[derive(Debug, Default)]
pub struct EnvParser {
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// `HOST` -> `SSHDROP_HOST`.
    pub fn var_name(name: &str) -> String {
        format!("{}{}", PREFIX, name)
    }

    /// Variable name and raw value, if the variable is set.
    fn lookup(name: &str) -> Option<(String, String)> {
        let var = Self::var_name(name);
        env::var(&var).ok().map(|value| (var, value))
    }

    fn invalid(&mut self, var: &str, expected: &'static str, value: String) {
        self.errors.push(EnvError::Invalid {
            var: var.to_string(),
            expected,
            value,
        });
    }

    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        match Self::lookup(name) {
            Some((_, value)) => Sourced::from_env(value),
            None => Sourced::default_value(default.to_string()),
        }
    }

    /// Set-but-empty counts as an explicit `None`.
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        match Self::lookup(name) {
            Some((_, value)) => Sourced::from_env(Some(value).filter(|v| !v.is_empty())),
            None => Sourced::default_value(None),
        }
    }

    /// Accepts 1/true/yes/on and 0/false/no/off/empty, case-insensitively.
    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let Some((var, value)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        let parsed = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                self.invalid(&var, "boolean", value);
                return Sourced::default_value(default);
            }
        };
        Sourced::from_env(parsed)
    }

    pub fn get_u64_range(&mut self, name: &str, default: u64, min: u64, max: u64) -> Sourced<u64> {
        let Some((var, value)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        match value.trim().parse::<u64>() {
            Ok(n) if (min..=max).contains(&n) => Sourced::from_env(n),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var,
                    value: n,
                    min,
                    max,
                });
                Sourced::default_value(default)
            }
            Err(_) => {
                self.invalid(&var, "unsigned integer", value);
                Sourced::default_value(default)
            }
        }
    }

    /// One of `trace`, `debug`, `info`, `warn`, `error`, `off`, lowercased.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let Some((var, value)) = Self::lookup(name) else {
            return Sourced::default_value(default.to_string());
        };
        let level = value.trim().to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Sourced::from_env(level)
        } else {
            self.invalid(&var, "log level", value);
            Sourced::default_value(default.to_string())
        }
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    fn cleanup_env(vars: &[&str]) {
        for var in vars {
            // SAFETY: env access is serialised by env_test_lock.
            unsafe { env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env access is serialised by env_test_lock.
        unsafe { env::set_var(key, value) };
    }

    #[test]
    fn test_get_bool_true_values() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_BOOL_TRUE"];
        cleanup_env(&vars);

        for val in &["1", "true", "yes", "on", "TRUE", "Yes"] {
            set_env("SSHDROP_TEST_BOOL_TRUE", val);
            let mut parser = EnvParser::new();
            let result = parser.get_bool("TEST_BOOL_TRUE", false);
            assert!(result.value, "Expected true for '{}'", val);
            assert!(!parser.has_errors());
        }

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_bool_invalid_uses_default() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_BAD_BOOL"];
        cleanup_env(&vars);

        set_env("SSHDROP_BAD_BOOL", "maybe");
        let mut parser = EnvParser::new();
        let result = parser.get_bool("BAD_BOOL", false);
        assert!(!result.value);
        assert!(parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_u64_range_valid() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_U64"];
        cleanup_env(&vars);

        set_env("SSHDROP_TEST_U64", "50");
        let mut parser = EnvParser::new();
        let result = parser.get_u64_range("TEST_U64", 10, 0, 100);
        assert_eq!(result.value, 50);
        assert!(result.is_from_env());
        assert!(!parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_u64_range_out_of_range() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_U64_OOR"];
        cleanup_env(&vars);

        set_env("SSHDROP_TEST_U64_OOR", "200");
        let mut parser = EnvParser::new();
        let result = parser.get_u64_range("TEST_U64_OOR", 10, 0, 100);
        assert_eq!(result.value, 10);
        assert!(!result.is_from_env());
        let errors = parser.take_errors();
        assert!(matches!(errors[0], EnvError::OutOfRange { value: 200, .. }));
        assert_eq!(errors[0].to_string(), "SSHDROP_TEST_U64_OOR=200 is outside 0..=100");

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_u64_not_a_number() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_U64_NAN"];
        cleanup_env(&vars);

        set_env("SSHDROP_TEST_U64_NAN", "lots");
        let mut parser = EnvParser::new();
        let result = parser.get_u64_range("TEST_U64_NAN", 7, 0, 100);
        assert_eq!(result.value, 7);
        let errors = parser.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("SSHDROP_TEST_U64_NAN"));
        assert!(!parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_log_level() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_LEVEL"];
        cleanup_env(&vars);

        set_env("SSHDROP_TEST_LEVEL", "DEBUG");
        let mut parser = EnvParser::new();
        assert_eq!(parser.get_log_level("TEST_LEVEL", "info").value, "debug");

        set_env("SSHDROP_TEST_LEVEL", "loud");
        let mut parser = EnvParser::new();
        assert_eq!(parser.get_log_level("TEST_LEVEL", "info").value, "info");
        assert!(parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_optional_string_empty_is_none() {
        let _guard = env_test_lock();
        let vars = ["SSHDROP_TEST_OPT"];
        cleanup_env(&vars);

        let mut parser = EnvParser::new();
        assert_eq!(parser.get_optional_string("TEST_OPT").value, None);

        set_env("SSHDROP_TEST_OPT", "");
        assert_eq!(parser.get_optional_string("TEST_OPT").value, None);

        set_env("SSHDROP_TEST_OPT", "deploy");
        assert_eq!(
            parser.get_optional_string("TEST_OPT").value.as_deref(),
            Some("deploy")
        );

        cleanup_env(&vars);
    }
}
