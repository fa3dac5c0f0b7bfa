//! Core library for sshdrop: push a file to a remote host as base64 text,
//! one shell command per chunk, then decode it in place.
//!
//! The binary crate only parses arguments and renders output; everything
//! that touches the remote goes through [`Uploader`] and a [`RemoteShell`].

pub mod commands;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod logging;
pub mod remote;
pub mod retry;
pub mod types;
pub mod upload;
pub mod util;

pub use config::{
    ConfigSource, ConfigWarning, LoadedConfig, Severity, Sourced, load_config, validate_config,
};
pub use encoding::{Chunk, DEFAULT_CHUNK_SIZE, EncodedPayload, chunk_count, last_chunk_len};
pub use errors::{DropError, ErrorCategory, ErrorCode, ErrorEntry, Step};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use remote::{LocalShell, MockReply, MockShell, RemoteOutput, RemoteShell, SshShell};
pub use retry::RetryPolicy;
pub use types::{DropConfig, RemoteConfig, RetrySettings, TransferSettings};
pub use upload::{
    NoopObserver, StepFailure, UploadObserver, UploadOptions, UploadPlan, UploadReport, Uploader,
    plan_upload, probe,
};
pub use util::{format_bytes, mask_sensitive_command};
