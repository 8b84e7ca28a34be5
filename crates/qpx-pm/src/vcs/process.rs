//! Runs VCS command-line tools with a wall-clock limit.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::error::{QpxError, Result};

/// Runs one external tool (`git`, `hg`) with a fixed timeout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    timeout: Duration,
    envs: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            envs: Vec::new(),
        }
    }

    /// Set an environment variable for every invocation
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn the tool and wait for it, killing it once the timeout expires
    async fn output(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let command_line = self.describe(args);
        log::debug!("Executing `{}`", command_line);

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QpxError::VcsToolMissing {
                    tool: self.program.clone(),
                    reason: e.to_string(),
                }
            } else {
                QpxError::VcsCommand {
                    command: command_line.clone(),
                    stderr: e.to_string(),
                }
            }
        })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(QpxError::Timeout {
                command: command_line,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Run the tool and return its trimmed stdout; a non-zero exit is an error
    pub async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let output = self.output(args, cwd).await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(QpxError::VcsCommand {
                command: self.describe(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run the tool and report only whether it exited successfully
    pub async fn succeeds(&self, args: &[&str], cwd: Option<&Path>) -> Result<bool> {
        Ok(self.output(args, cwd).await?.status.success())
    }

    /// Check the tool can be executed at all by running `<tool> version`
    pub async fn probe(&self) -> Result<()> {
        match self.run(&["version"], None).await {
            Ok(_) => Ok(()),
            Err(QpxError::VcsToolMissing { tool, reason }) => {
                Err(QpxError::VcsToolMissing { tool, reason })
            }
            Err(e) => Err(QpxError::VcsToolMissing {
                tool: self.program.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
