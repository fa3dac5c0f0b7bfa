//! Error catalog for sshdrop.
//!
//! Every failure the upload pipeline can report maps to a stable code in the
//! `SSHDROP-Exxx` format, with a message and remediation steps.
//!
//! | Range      | Category    | Description                          |
//! |------------|-------------|--------------------------------------|
//! | E001-E099  | Config      | Configuration and setup errors       |
//! | E100-E199  | Network     | SSH connectivity and sessions        |
//! | E200-E299  | Transfer    | Chunk upload and remote decode       |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering all sshdrop error scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML syntax
    ConfigParseError,
    /// Configuration contains invalid values
    ConfigValidationError,
    /// Environment variable has invalid value
    ConfigEnvError,
    /// Chunk size is zero
    ConfigInvalidChunkSize,
    /// Local source file could not be read
    SourceReadError,

    // =========================================================================
    // Network Errors (E100-E199)
    // =========================================================================
    /// The ssh (or sshpass) client could not be started
    SshSpawnFailed,
    /// SSH command execution timed out
    SshTimeout,
    /// SSH session failed before the remote command ran
    SshConnectionFailed,

    // =========================================================================
    // Transfer Errors (E200-E299)
    // =========================================================================
    /// A remote step exited with a failure status
    TransferRemoteCommandFailed,
    /// Remote file size differs from the source
    TransferSizeMismatch,
    /// Remote SHA-256 differs from the source
    TransferChecksumMismatch,
    /// Encoded text could not be decoded
    TransferDecodeFailed,
    /// Remote output could not be interpreted
    TransferUnexpectedOutput,
}

impl ErrorCode {
    /// All known error codes.
    pub fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigValidationError,
            Self::ConfigEnvError,
            Self::ConfigInvalidChunkSize,
            Self::SourceReadError,
            Self::SshSpawnFailed,
            Self::SshTimeout,
            Self::SshConnectionFailed,
            Self::TransferRemoteCommandFailed,
            Self::TransferSizeMismatch,
            Self::TransferChecksumMismatch,
            Self::TransferDecodeFailed,
            Self::TransferUnexpectedOutput,
        ]
    }

    /// Returns the numeric part of the code.
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ConfigReadError => 1,
            Self::ConfigParseError => 2,
            Self::ConfigValidationError => 3,
            Self::ConfigEnvError => 4,
            Self::ConfigInvalidChunkSize => 5,
            Self::SourceReadError => 6,
            Self::SshSpawnFailed => 100,
            Self::SshTimeout => 101,
            Self::SshConnectionFailed => 102,
            Self::TransferRemoteCommandFailed => 200,
            Self::TransferSizeMismatch => 201,
            Self::TransferChecksumMismatch => 202,
            Self::TransferDecodeFailed => 203,
            Self::TransferUnexpectedOutput => 204,
        }
    }

    /// Returns the formatted code, e.g. `SSHDROP-E100`.
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("SSHDROP-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Network,
            _ => ErrorCategory::Transfer,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Returns the error message template.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML syntax",
            Self::ConfigValidationError => "Configuration contains invalid values",
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::ConfigInvalidChunkSize => "Chunk size must be greater than zero",
            Self::SourceReadError => "Failed to read the local source file",
            Self::SshSpawnFailed => "Failed to start the SSH client",
            Self::SshTimeout => "Remote command timed out",
            Self::SshConnectionFailed => "SSH session could not be established",
            Self::TransferRemoteCommandFailed => "Remote command exited with an error",
            Self::TransferSizeMismatch => "Remote file size does not match the source",
            Self::TransferChecksumMismatch => "Remote file checksum does not match the source",
            Self::TransferDecodeFailed => "Encoded data could not be decoded",
            Self::TransferUnexpectedOutput => "Remote command produced unexpected output",
        }
    }

    /// Returns the remediation steps for this error.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigReadError => &[
                "Check that the config file exists and is readable",
                "Pass --config <path> to point at a different file",
            ],
            Self::ConfigParseError => &[
                "Validate the TOML syntax of the config file",
                "Run 'sshdrop config show' to see the effective configuration",
            ],
            Self::ConfigValidationError => &[
                "Run 'sshdrop config show' and fix the reported values",
            ],
            Self::ConfigEnvError => &[
                "Check SSHDROP_* environment variables for typos or bad values",
            ],
            Self::ConfigInvalidChunkSize => &[
                "Set transfer.chunk_size (or --chunk-size) to a positive value",
            ],
            Self::SourceReadError => &[
                "Check that the source path exists and is readable",
            ],
            Self::SshSpawnFailed => &[
                "Install the OpenSSH client and make sure 'ssh' is on PATH",
                "When using password_env, install 'sshpass'",
            ],
            Self::SshTimeout => &[
                "Increase remote.command_timeout_secs",
                "Check network latency to the remote host",
            ],
            Self::SshConnectionFailed => &[
                "Run 'sshdrop check' to test connectivity",
                "Verify host, port, user and identity file",
                "Check that the remote host key is accepted",
            ],
            Self::TransferRemoteCommandFailed => &[
                "Inspect the remote stderr in the log output",
                "Check free disk space and permissions on the remote host",
            ],
            Self::TransferSizeMismatch | Self::TransferChecksumMismatch => &[
                "Re-run the upload; the temporary file is always cleared first",
                "Check that nothing else writes to the remote temporary path",
            ],
            Self::TransferDecodeFailed => &[
                "Check that the remote 'base64' utility supports '-d'",
            ],
            Self::TransferUnexpectedOutput => &[
                "Check that the remote shell is POSIX compatible",
                "Make sure login scripts do not print to stdout",
            ],
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration and setup errors (E001-E099)
    Config,
    /// SSH connectivity errors (E100-E199)
    Network,
    /// Chunk upload and decode errors (E200-E299)
    Transfer,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Network => "Network",
            Self::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Error code string (e.g., "SSHDROP-E001")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("\nRemediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// One-line form: `[CODE] message`.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}
