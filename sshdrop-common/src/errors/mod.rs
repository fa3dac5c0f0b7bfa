//! Error types for sshdrop.
//!
//! [`DropError`] is the single error type returned by the library. Each
//! variant maps onto a catalog entry (see [`catalog`]) so the CLI can print a
//! stable code plus remediation steps.

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryableError;

/// Exit status ssh uses for its own failures (connection, auth, host key).
pub const SSH_CLIENT_FAILURE_STATUS: i32 = 255;

/// Which step of the upload a remote command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Prepare,
    Clear,
    Append,
    Decode,
    Verify,
    Cleanup,
    Probe,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::Clear => "clear",
            Self::Append => "append",
            Self::Decode => "decode",
            Self::Verify => "verify",
            Self::Cleanup => "cleanup",
            Self::Probe => "probe",
        };
        f.write_str(name)
    }
}

/// Errors produced while configuring or running an upload.
#[derive(Debug, Error)]
pub enum DropError {
    #[error("failed to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid environment: {0}")]
    Env(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} timed out after {}s", .after.as_secs())]
    Timeout { step: Step, after: Duration },

    #[error("{step} failed (status {status:?}): {stderr}")]
    RemoteCommandFailed {
        step: Step,
        status: Option<i32>,
        stderr: String,
    },

    #[error("unexpected output from {step}: {output}")]
    UnexpectedOutput { step: Step, output: String },

    #[error("remote size {remote} bytes does not match source size {local} bytes")]
    SizeMismatch { local: u64, remote: u64 },

    #[error("remote checksum {remote} does not match source checksum {local}")]
    ChecksumMismatch { local: String, remote: String },

    #[error("decode failed: {0}")]
    Decode(String),
}

impl DropError {
    /// Catalog code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SourceRead { .. } => ErrorCode::SourceReadError,
            Self::ConfigRead { .. } => ErrorCode::ConfigReadError,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
            Self::Config(_) => ErrorCode::ConfigValidationError,
            Self::InvalidChunkSize(_) => ErrorCode::ConfigInvalidChunkSize,
            Self::Spawn { .. } => ErrorCode::SshSpawnFailed,
            Self::Timeout { .. } => ErrorCode::SshTimeout,
            Self::RemoteCommandFailed { status, .. } if is_client_failure(*status) => {
                ErrorCode::SshConnectionFailed
            }
            Self::RemoteCommandFailed { .. } => ErrorCode::TransferRemoteCommandFailed,
            Self::UnexpectedOutput { .. } => ErrorCode::TransferUnexpectedOutput,
            Self::SizeMismatch { .. } => ErrorCode::TransferSizeMismatch,
            Self::ChecksumMismatch { .. } => ErrorCode::TransferChecksumMismatch,
            Self::Decode(_) => ErrorCode::TransferDecodeFailed,
        }
    }

    /// Whether the command that produced this error is worth re-issuing.
    ///
    /// ssh reports its own failures with status 255. That includes a
    /// connection dropped after the remote command already ran, so the
    /// commands themselves must tolerate being repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Spawn { .. } => true,
            Self::RemoteCommandFailed { status, .. } => is_client_failure(*status),
            _ => false,
        }
    }
}

impl RetryableError for DropError {
    fn is_retryable(&self) -> bool {
        DropError::is_retryable(self)
    }
}

fn is_client_failure(status: Option<i32>) -> bool {
    status == Some(SSH_CLIENT_FAILURE_STATUS)
}
