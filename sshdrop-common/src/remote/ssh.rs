//! SSH transport backed by the system `ssh` client.

use std::fmt;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::{RemoteOutput, RemoteShell, output_with_timeout};
use crate::errors::{DropError, Step};
use crate::types::RemoteConfig;
use crate::util::{mask_sensitive_command, truncate_for_log};

/// Password read from the environment. Never printed.
#[derive(Clone)]
struct Password(String);

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Runs each command through a new `ssh` invocation.
#[derive(Debug, Clone)]
pub struct SshShell {
    remote: RemoteConfig,
    identity_file: Option<String>,
    password: Option<Password>,
}

impl SshShell {
    /// Build a shell from config, resolving the password variable if one is
    /// named.
    pub fn from_config(remote: &RemoteConfig) -> Result<Self, DropError> {
        if remote.host.trim().is_empty() {
            return Err(DropError::Config("remote host is not set".to_string()));
        }

        let password = match remote.password_env.as_deref() {
            Some(var) if !var.is_empty() => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Some(Password(value)),
                _ => {
                    return Err(DropError::Config(format!(
                        "password variable {} is not set",
                        var
                    )));
                }
            },
            _ => None,
        };

        let identity_file = remote
            .identity_file
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| shellexpand::tilde(p).into_owned());

        Ok(Self {
            remote: remote.clone(),
            identity_file,
            password,
        })
    }

    /// Program to execute: `sshpass` when a password is in use, else `ssh`.
    fn program(&self) -> &'static str {
        if self.password.is_some() { "sshpass" } else { "ssh" }
    }

    /// Build the argument list, ending with the destination and command.
    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();
        if self.password.is_some() {
            // sshpass reads the password from $SSHPASS.
            args.push("-e".to_string());
            args.push("ssh".to_string());
        } else {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={}", self.remote.connect_timeout_secs));
        args.push("-o".to_string());
        args.push("StrictHostKeyChecking=accept-new".to_string());
        args.push("-p".to_string());
        args.push(self.remote.port.to_string());
        if let Some(ref identity) = self.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }
        args.push(self.remote.destination());
        args.push(command.to_string());
        args
    }

    fn command_timeout(&self) -> Option<Duration> {
        match self.remote.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl RemoteShell for SshShell {
    async fn run(&self, step: Step, command: &str) -> Result<RemoteOutput, DropError> {
        debug!(
            host = %self.remote.host,
            %step,
            command = %mask_sensitive_command(&truncate_for_log(command, 120)),
            "Running remote command"
        );

        let program = self.program();
        let mut cmd = Command::new(program);
        cmd.args(self.ssh_args(command));
        if let Some(ref password) = self.password {
            cmd.env("SSHPASS", &password.0);
        }

        let output = output_with_timeout(cmd, program, step, self.command_timeout()).await?;
        debug!(%step, status = ?output.status, "Remote command finished");
        Ok(output)
    }

    fn describe(&self) -> String {
        format!("ssh {}:{}", self.remote.destination(), self.remote.port)
    }
}
