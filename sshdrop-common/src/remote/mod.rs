//! Remote shell transports.
//!
//! A [`RemoteShell`] runs one shell command per call, in a fresh session, and
//! waits for it to finish. The upload pipeline never has more than one
//! command in flight.

pub mod local;
pub mod mock;
pub mod ssh;

pub use local::LocalShell;
pub use mock::{MockCall, MockReply, MockShell};
pub use ssh::SshShell;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::errors::{DropError, Step};

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteOutput {
    /// Exit status, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Convert a failed status into [`DropError::RemoteCommandFailed`].
    pub fn into_result(self, step: Step) -> Result<RemoteOutput, DropError> {
        if self.success() {
            Ok(self)
        } else {
            Err(DropError::RemoteCommandFailed {
                step,
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    pub(crate) fn from_process(output: std::process::Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Something that can execute a shell command on the target host.
pub trait RemoteShell: Send + Sync {
    /// Run `command` in a new session and wait for it to complete.
    ///
    /// Returns `Ok` with the captured output whatever the exit status; only
    /// failures to run the command at all (spawn, timeout) are errors.
    fn run(
        &self,
        step: Step,
        command: &str,
    ) -> impl Future<Output = Result<RemoteOutput, DropError>> + Send;

    /// Short description of the target for logs, e.g. `ssh deploy@host:22`.
    fn describe(&self) -> String;
}

/// Await a child process with an optional upper bound.
pub(crate) async fn output_with_timeout(
    mut cmd: tokio::process::Command,
    program: &str,
    step: Step,
    timeout: Option<Duration>,
) -> Result<RemoteOutput, DropError> {
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);

    let fut = cmd.output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| DropError::Timeout { step, after: limit })?,
        None => fut.await,
    }
    .map_err(|source| DropError::Spawn {
        program: program.to_string(),
        source,
    })?;

    Ok(RemoteOutput::from_process(output))
}
