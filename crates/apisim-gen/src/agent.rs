//! External coding agent runner.
//!
//! The generator talks to the agent through the [`Agent`] trait so tests can
//! substitute an in-process fake. [`CommandAgent`] runs a command line with
//! the prompt appended as the final argument, inside the output directory.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::AgentError;

/// Agent invoked when no command is configured.
pub const DEFAULT_AGENT_COMMAND: &str = "claude --permission-mode acceptEdits";

/// Characters of the prompt shown in debug logs.
const PROMPT_PREVIEW_CHARS: usize = 100;

/// Something that carries out a prompt inside a working directory.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run `prompt` in `workdir`, returning the agent's transcript.
    async fn run(&self, prompt: &str, workdir: &Path) -> Result<String, AgentError>;
}

/// Runs an external command per prompt.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    echo: bool,
}

impl CommandAgent {
    /// Agent running `program args... <prompt>`.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
            echo: true,
        }
    }

    /// Agent from a whitespace-separated command line, e.g.
    /// [`DEFAULT_AGENT_COMMAND`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyCommand`] for a blank command line.
    pub fn from_command_line(command: &str) -> Result<Self, AgentError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(AgentError::EmptyCommand)?;
        Ok(Self::new(program, parts))
    }

    /// Kill the agent when it runs longer than `limit`.
    #[must_use]
    pub const fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Do not print agent output as it arrives.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    fn record(&self, transcript: &mut String, line: &str) {
        if self.echo {
            println!("{line}");
        }
        transcript.push_str(line);
        transcript.push('\n');
    }
}

#[async_trait]
impl Agent for CommandAgent {
    async fn run(&self, prompt: &str, workdir: &Path) -> Result<String, AgentError> {
        tokio::fs::create_dir_all(workdir).await?;

        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        debug!(program = %self.program, prompt = %preview, "Calling agent");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "agent stdout not captured")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "agent stderr not captured")
        })?;

        let mut transcript = String::new();
        let collect = async {
            let mut out = BufReader::new(stdout).lines();
            let mut err = BufReader::new(stderr).lines();
            let (mut out_done, mut err_done) = (false, false);

            while !(out_done && err_done) {
                tokio::select! {
                    line = out.next_line(), if !out_done => match line? {
                        Some(line) => self.record(&mut transcript, &line),
                        None => out_done = true,
                    },
                    line = err.next_line(), if !err_done => match line? {
                        Some(line) => self.record(&mut transcript, &line),
                        None => err_done = true,
                    },
                }
            }
            child.wait().await
        };

        let finished = match self.timeout {
            Some(limit) => timeout(limit, collect).await.ok(),
            None => Some(collect.await),
        };

        let Some(status) = finished else {
            let secs = self.timeout.map_or(0, |limit| limit.as_secs());
            warn!(program = %self.program, "Agent timed out after {secs}s, killing it");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill agent: {e}");
            }
            return Err(AgentError::TimedOut(secs));
        };
        let status = status?;

        if status.success() {
            info!(program = %self.program, "Agent finished");
            Ok(transcript)
        } else {
            Err(AgentError::Failed {
                code: status.code(),
                transcript,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell() -> CommandAgent {
        CommandAgent::new("sh", ["-c"]).quiet()
    }

    #[test]
    fn test_from_command_line() {
        let agent = CommandAgent::from_command_line(DEFAULT_AGENT_COMMAND).unwrap();
        assert_eq!(agent.program, "claude");
        assert_eq!(agent.args, ["--permission-mode", "acceptEdits"]);

        assert!(matches!(
            CommandAgent::from_command_line("   "),
            Err(AgentError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_collects_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = shell()
            .run("echo hello; echo oops >&2", dir.path())
            .await
            .unwrap();
        assert!(transcript.contains("hello\n"));
        assert!(transcript.contains("oops\n"));
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("nested/output");
        shell().run("echo hi > marker.txt", &workdir).await.unwrap();
        assert!(workdir.join("marker.txt").exists());
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = shell().run("echo partial; exit 3", dir.path()).await.unwrap_err();
        match err {
            AgentError::Failed { code, transcript } => {
                assert_eq!(code, Some(3));
                assert_eq!(transcript, "partial\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_agent() {
        let dir = tempfile::tempdir().unwrap();
        let err = shell()
            .with_timeout(Duration::from_millis(200))
            .run("sleep 5", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::TimedOut(0)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = CommandAgent::new("apisim-no-such-agent", Vec::<String>::new())
            .run("hi", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Spawn { .. }));
    }
}
