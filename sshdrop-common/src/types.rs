//! Configuration types shared by the library and the CLI.

use serde::{Deserialize, Serialize};

use crate::encoding::DEFAULT_CHUNK_SIZE;

/// Default remote scratch file the chunks are appended to.
pub const DEFAULT_TEMP_PATH: &str = "/tmp/sshdrop.b64";

/// sshdrop configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where and how to open remote shell sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// SSH hostname or IP address.
    #[serde(default)]
    pub host: String,
    /// SSH username. Falls back to the ssh client's default when unset.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to SSH private key (`~` is expanded).
    #[serde(default)]
    pub identity_file: Option<String>,
    /// Name of an environment variable holding the SSH password.
    ///
    /// The password itself never appears in config files or argv; it is
    /// handed to `sshpass -e` through its environment.
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound for a single remote command, including session setup.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: None,
            port: default_port(),
            identity_file: None,
            password_env: None,
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl RemoteConfig {
    /// `user@host`, or just `host` when no user is configured.
    pub fn destination(&self) -> String {
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => format!("{}@{}", user, self.host),
            _ => self.host.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Encoded characters per remote append.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Remote scratch file that chunks are appended to.
    #[serde(default = "default_temp_path")]
    pub temp_path: String,
    /// Create the destination's parent directory before decoding.
    #[serde(default)]
    pub create_dirs: bool,
    /// Compare the remote SHA-256 with the source after decoding.
    #[serde(default)]
    pub verify_checksum: bool,
    /// Remove the remote scratch file after a successful decode.
    #[serde(default)]
    pub cleanup: bool,
    /// Log failed steps and keep going instead of aborting.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            temp_path: default_temp_path(),
            create_dirs: false,
            verify_checksum: false,
            cleanup: false,
            continue_on_error: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per remote command, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    120
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_temp_path() -> String {
    DEFAULT_TEMP_PATH.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_jitter() -> f64 {
    0.2
}
