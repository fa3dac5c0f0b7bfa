//! Layered configuration loading: defaults, TOML file, then environment.
//!
//! Command-line overrides are applied by the binary on top of the result and
//! recorded with [`LoadedConfig::mark`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::env::EnvParser;
use super::source::ConfigSource;
use crate::errors::DropError;
use crate::types::DropConfig;

/// Keys whose origin is tracked for `config show`.
pub const TRACKED_KEYS: &[&str] = &[
    "general.log_level",
    "remote.host",
    "remote.user",
    "remote.port",
    "remote.identity_file",
    "remote.password_env",
    "remote.command_timeout_secs",
    "transfer.chunk_size",
    "transfer.temp_path",
    "transfer.verify_checksum",
    "transfer.cleanup",
];

/// Effective configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DropConfig,
    /// Config file that was read, if any.
    pub path: Option<PathBuf>,
    pub sources: BTreeMap<&'static str, ConfigSource>,
}

impl LoadedConfig {
    /// Defaults only, no file and no environment.
    pub fn defaults() -> Self {
        Self {
            config: DropConfig::default(),
            path: None,
            sources: TRACKED_KEYS
                .iter()
                .map(|k| (*k, ConfigSource::Default))
                .collect(),
        }
    }

    /// Record that `key` was set from `source`.
    pub fn mark(&mut self, key: &'static str, source: ConfigSource) {
        self.sources.insert(key, source);
    }

    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.sources
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }
}

/// `<config_dir>/sshdrop/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sshdrop").join("config.toml"))
}

/// Load configuration.
///
/// An explicit path (argument or `SSHDROP_CONFIG`) must exist; the default
/// location is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, DropError> {
    let env_path = std::env::var("SSHDROP_CONFIG")
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()));

    let mut loaded = match explicit.map(Path::to_path_buf).or(env_path) {
        Some(path) => load_file(&path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_file(&path)?,
            _ => LoadedConfig::defaults(),
        },
    };

    apply_env_overrides(&mut loaded)?;
    Ok(loaded)
}

/// Read and parse one TOML file.
pub fn load_file(path: &Path) -> Result<LoadedConfig, DropError> {
    let text = std::fs::read_to_string(path).map_err(|source| DropError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut loaded = parse_config_str(&text, path)?;
    loaded.path = Some(path.to_path_buf());
    debug!(path = %path.display(), "Loaded config file");
    Ok(loaded)
}

/// Parse TOML text, marking every tracked key present in it as file-sourced.
pub fn parse_config_str(text: &str, path: &Path) -> Result<LoadedConfig, DropError> {
    let parse_err = |e: toml::de::Error| DropError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let config: DropConfig = toml::from_str(text).map_err(parse_err)?;
    let table: toml::Table = toml::from_str(text).map_err(parse_err)?;

    let mut loaded = LoadedConfig::defaults();
    loaded.config = config;
    for key in TRACKED_KEYS {
        if let Some((section, field)) = key.split_once('.')
            && table
                .get(section)
                .and_then(|v| v.as_table())
                .is_some_and(|t| t.contains_key(field))
        {
            loaded.mark(key, ConfigSource::File);
        }
    }
    Ok(loaded)
}

/// Overlay `SSHDROP_*` variables. All invalid variables are reported together.
pub fn apply_env_overrides(loaded: &mut LoadedConfig) -> Result<(), DropError> {
    let mut parser = EnvParser::new();
    let cfg = &mut loaded.config;
    let mut touched: Vec<&'static str> = Vec::new();

    let level = parser.get_log_level("LOG_LEVEL", &cfg.general.log_level);
    if level.is_from_env() {
        cfg.general.log_level = level.value;
        touched.push("general.log_level");
    }

    let host = parser.get_optional_string("HOST");
    if let (true, Some(value)) = (host.is_from_env(), host.value) {
        cfg.remote.host = value;
        touched.push("remote.host");
    }

    let user = parser.get_optional_string("USER");
    if user.is_from_env() {
        cfg.remote.user = user.value;
        touched.push("remote.user");
    }

    let port = parser.get_u64_range("PORT", u64::from(cfg.remote.port), 1, 65_535);
    if port.is_from_env() {
        cfg.remote.port = u16::try_from(port.value).unwrap_or(cfg.remote.port);
        touched.push("remote.port");
    }

    let identity = parser.get_optional_string("IDENTITY_FILE");
    if identity.is_from_env() {
        cfg.remote.identity_file = identity.value;
        touched.push("remote.identity_file");
    }

    let password_env = parser.get_optional_string("PASSWORD_ENV");
    if password_env.is_from_env() {
        cfg.remote.password_env = password_env.value;
        touched.push("remote.password_env");
    }

    let timeout = parser.get_u64_range(
        "COMMAND_TIMEOUT",
        cfg.remote.command_timeout_secs,
        0,
        86_400,
    );
    if timeout.is_from_env() {
        cfg.remote.command_timeout_secs = timeout.value;
        touched.push("remote.command_timeout_secs");
    }

    let chunk = parser.get_u64_range(
        "CHUNK_SIZE",
        cfg.transfer.chunk_size as u64,
        1,
        10_000_000,
    );
    if chunk.is_from_env() {
        cfg.transfer.chunk_size = usize::try_from(chunk.value).unwrap_or(cfg.transfer.chunk_size);
        touched.push("transfer.chunk_size");
    }

    let temp = parser.get_string("TEMP_PATH", &cfg.transfer.temp_path);
    if temp.is_from_env() {
        cfg.transfer.temp_path = temp.value;
        touched.push("transfer.temp_path");
    }

    let verify = parser.get_bool("VERIFY", cfg.transfer.verify_checksum);
    if verify.is_from_env() {
        cfg.transfer.verify_checksum = verify.value;
        touched.push("transfer.verify_checksum");
    }

    let cleanup = parser.get_bool("CLEANUP", cfg.transfer.cleanup);
    if cleanup.is_from_env() {
        cfg.transfer.cleanup = cleanup.value;
        touched.push("transfer.cleanup");
    }

    if parser.has_errors() {
        let messages: Vec<String> = parser
            .take_errors()
            .iter()
            .map(ToString::to_string)
            .collect();
        return Err(DropError::Env(messages.join("; ")));
    }

    for key in touched {
        loaded.mark(key, ConfigSource::Environment);
    }
    Ok(())
}
