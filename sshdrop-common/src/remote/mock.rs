//! Scripted transport for tests.
//!
//! Records every command it is asked to run and answers from a per-step
//! queue of replies. Steps with an empty queue succeed with empty output.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::{RemoteOutput, RemoteShell};
use crate::errors::{DropError, Step};

/// A canned answer for one command.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Exit 0 with the given stdout.
    Ok(String),
    /// Non-zero exit with the given stderr.
    Exit { status: i32, stderr: String },
    /// The ssh client itself failed (exit 255), e.g. connection reset.
    ConnectionFailed,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub step: Step,
    pub command: String,
}

#[derive(Debug, Default)]
pub struct MockShell {
    replies: Mutex<HashMap<Step, VecDeque<MockReply>>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next command of `step`.
    pub fn reply(self, step: Step, reply: MockReply) -> Self {
        lock(&self.replies).entry(step).or_default().push_back(reply);
        self
    }

    /// All commands run so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Commands run for one step, in order.
    pub fn commands_for(&self, step: Step) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.step == step)
            .map(|c| c.command.clone())
            .collect()
    }
}

impl RemoteShell for MockShell {
    async fn run(&self, step: Step, command: &str) -> Result<RemoteOutput, DropError> {
        lock(&self.calls).push(MockCall {
            step,
            command: command.to_string(),
        });

        let reply = lock(&self.replies)
            .get_mut(&step)
            .and_then(VecDeque::pop_front);

        Ok(match reply {
            None => RemoteOutput::ok(""),
            Some(MockReply::Ok(stdout)) => RemoteOutput::ok(stdout),
            Some(MockReply::Exit { status, stderr }) => RemoteOutput {
                status: Some(status),
                stdout: String::new(),
                stderr,
            },
            Some(MockReply::ConnectionFailed) => RemoteOutput {
                status: Some(crate::errors::SSH_CLIENT_FAILURE_STATUS),
                stdout: String::new(),
                stderr: "ssh: connect to host mock port 22: Connection refused".to_string(),
            },
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_are_consumed_in_order() {
        let shell = MockShell::new()
            .reply(Step::Append, MockReply::ConnectionFailed)
            .reply(Step::Append, MockReply::Ok("done".into()));

        let first = shell.run(Step::Append, "a").await.unwrap();
        assert_eq!(first.status, Some(255));
        let second = shell.run(Step::Append, "b").await.unwrap();
        assert_eq!(second.stdout, "done");
        let third = shell.run(Step::Append, "c").await.unwrap();
        assert!(third.success());

        assert_eq!(shell.commands_for(Step::Append), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_steps_have_separate_queues() {
        let shell = MockShell::new().reply(
            Step::Decode,
            MockReply::Exit {
                status: 1,
                stderr: "bad".into(),
            },
        );
        assert!(shell.run(Step::Clear, "x").await.unwrap().success());
        assert_eq!(shell.run(Step::Decode, "y").await.unwrap().status, Some(1));
        assert_eq!(shell.calls().len(), 2);
    }
}
