//! Local transport: runs the remote commands with `sh -c` on this machine.
//!
//! Useful for staging an upload into a local directory and for exercising
//! the real command strings in tests.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::{RemoteOutput, RemoteShell, output_with_timeout};
use crate::errors::{DropError, Step};
use crate::util::truncate_for_log;

#[derive(Debug, Clone, Default)]
pub struct LocalShell {
    workdir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl LocalShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from `dir` instead of the current directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl RemoteShell for LocalShell {
    async fn run(&self, step: Step, command: &str) -> Result<RemoteOutput, DropError> {
        debug!(%step, command = %truncate_for_log(command, 120), "Running local command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }
        output_with_timeout(cmd, "sh", step, self.timeout).await
    }

    fn describe(&self) -> String {
        match self.workdir {
            Some(ref dir) => format!("local sh ({})", dir.display()),
            None => "local sh".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_status() {
        let shell = LocalShell::new();
        let out = shell.run(Step::Probe, "echo ok").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "ok");

        let out = shell.run(Step::Probe, "echo nope >&2; exit 3").await.unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stderr.trim(), "nope");
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let shell = LocalShell::new().with_timeout(Duration::from_millis(50));
        let err = shell.run(Step::Append, "sleep 5").await.unwrap_err();
        assert!(matches!(err, DropError::Timeout { step: Step::Append, .. }));
    }

    #[tokio::test]
    async fn test_workdir_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let shell = LocalShell::new().with_workdir(dir.path());
        shell.run(Step::Clear, ": > marker").await.unwrap();
        assert!(dir.path().join("marker").exists());
        assert!(shell.describe().starts_with("local sh ("));
    }
}
