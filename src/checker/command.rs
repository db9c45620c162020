use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::VersionCheck;
use crate::model::{Resource, Version};

/// Runs a resource's `check` command through the shell.
///
/// The command receives `{"version": ...}` on stdin, holding the current
/// version or `null`. The last non-empty line it prints becomes the `ref` of
/// the new version.
#[derive(Debug, Default)]
pub struct CommandCheck;

impl CommandCheck {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VersionCheck for CommandCheck {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn check_version(&self, ctx: &CancellationToken, resource: &Resource) -> Result<Option<Version>> {
        let Some(command) = resource.check.as_deref() else {
            return Ok(None);
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start check for {}", resource.name))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&json!({ "version": resource.version }))?;
            // The command may exit without reading its input.
            if let Err(e) = stdin.write_all(&payload).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e).context("failed to write check input");
                }
            }
        }

        let output = tokio::select! {
            output = child.wait_with_output() => output.context("failed to wait for check")?,
            _ = ctx.cancelled() => bail!("check for {} cancelled", resource.name),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "check for {} exited with {}: {}",
                resource.name,
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let latest = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(|line| Version::new().with("ref", line));

        Ok(latest)
    }
}
