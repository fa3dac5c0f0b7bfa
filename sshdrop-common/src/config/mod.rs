//! Configuration system for sshdrop.
//!
//! Values are layered: built-in defaults, the TOML config file, `SSHDROP_*`
//! environment variables, then command-line flags. Each tracked value keeps
//! its [`ConfigSource`] so `sshdrop config show` can explain where it came
//! from.

pub mod env;
pub mod load;
pub mod source;
pub mod validate;

pub use env::{EnvError, EnvParser};
pub use load::{LoadedConfig, default_config_path, load_config, load_file, parse_config_str};
pub use source::{ConfigSource, Sourced};
pub use validate::{ConfigWarning, Severity, validate_config};

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
