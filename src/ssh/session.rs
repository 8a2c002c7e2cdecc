//! # Remote Shell
//!
//! Hands the terminal over to `ssh` with inherited stdin, stdout and stderr.
//! The menu session must already be closed: on Unix the process image is
//! replaced, so nothing of ours keeps reading the terminal while the remote
//! shell runs.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub user: String,
    pub host: String,
}

impl Target {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Result<Self> {
        let target = Self {
            user: user.into(),
            host: host.into(),
        };
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> Result<()> {
        if self.user.is_empty() {
            anyhow::bail!("SSH user cannot be empty");
        }
        if self.host.is_empty() {
            anyhow::bail!("Instance has no IP address yet");
        }
        if self.user.starts_with('-') || self.host.starts_with('-') {
            anyhow::bail!("Invalid SSH target '{}'", self.destination());
        }
        if self.user.contains(['@', ' ']) || self.host.contains(['@', ' ']) {
            anyhow::bail!("Invalid SSH target '{}'", self.destination());
        }
        Ok(())
    }

    /// `user@host`, as passed to `ssh`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new("ssh");
        command
            .arg(self.destination())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

/// Run `ssh user@host` and return its exit code.
///
/// On Unix this only returns if `ssh` could not be started.
pub fn connect(target: &Target) -> Result<i32> {
    info!(destination = %target.destination(), "connecting");
    let mut command = target.command();

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = command.exec();
        Err(err).with_context(|| format!("Failed to execute ssh {}", target.destination()))
    }

    #[cfg(not(unix))]
    {
        let status = command
            .status()
            .with_context(|| format!("Failed to execute ssh {}", target.destination()))?;
        Ok(status.code().unwrap_or(1))
    }
}
