//! Long-running loops and their supervision.
//!
//! A [`Runner`] starts the [`ScanRunner`] and [`CheckRunner`] side by side and
//! stops them together:
//!
//! - Both members must report ready, or the whole group is torn down and the
//!   startup error is returned.
//! - Once running, the group stops when the shutdown token is cancelled or
//!   when any member exits on its own.
//! - Failures inside a pass never leave a member's `run`; they are logged.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lidar::runner::{CheckRunner, Runner, ScanRunner};
//! use lidar::scanner::ResourceScanner;
//! use lidar::checker::default_checker;
//! use lidar::{MemoryWorkSource, NotificationBus};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Arc::new(MemoryWorkSource::new());
//!     let bus = Arc::new(NotificationBus::new());
//!
//!     let runner = Runner::new(
//!         ScanRunner::new(
//!             Duration::from_secs(60),
//!             Arc::new(ResourceScanner::new(source.clone(), Duration::from_secs(60))),
//!         ),
//!         CheckRunner::new(Duration::from_secs(10), Arc::new(default_checker()), source, bus),
//!     );
//!
//!     let shutdown = CancellationToken::new();
//!     runner.run(shutdown).await?;
//!     Ok(())
//! }
//! ```

mod check;
mod scan;

pub use check::CheckRunner;
pub use scan::ScanRunner;

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// A supervised, long-running process.
#[async_trait]
pub trait Member: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs until `shutdown` is cancelled.
    ///
    /// Must send on `ready` once startup has succeeded. Returning before that
    /// fails the whole group.
    async fn run(&self, shutdown: CancellationToken, ready: oneshot::Sender<()>) -> Result<()>;
}

/// Runs its members in parallel under one shutdown signal.
pub struct Runner {
    members: Vec<Arc<dyn Member>>,
}

impl Runner {
    pub fn new(scanner: ScanRunner, checker: CheckRunner) -> Self {
        Self::with_members(vec![Arc::new(scanner), Arc::new(checker)])
    }

    pub fn with_members(members: Vec<Arc<dyn Member>>) -> Self {
        Self { members }
    }

    /// Starts every member and runs until `shutdown` is cancelled.
    ///
    /// Cancelling `shutdown` while members are still starting stops the group
    /// and returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberFailed`] if a member fails before it is ready,
    /// and [`Error::MemberExited`] or [`Error::MemberPanicked`] if a member
    /// stops while the group is running.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let group = shutdown.child_token();
        let mut exits = JoinSet::new();
        let mut readiness = Vec::with_capacity(self.members.len());

        for member in &self.members {
            let (ready, ready_rx) = oneshot::channel();
            let member = Arc::clone(member);
            let token = group.clone();
            readiness.push((member.name(), ready_rx));
            exits.spawn(async move {
                let name = member.name();
                let result = AssertUnwindSafe(member.run(token, ready)).catch_unwind().await;
                (name, result.unwrap_or(Err(Error::MemberPanicked { name })))
            });
        }

        let mut not_ready = Vec::new();
        let mut interrupted = false;
        for (name, ready_rx) in readiness {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    interrupted = true;
                    break;
                }
                ready = ready_rx => {
                    if ready.is_err() {
                        not_ready.push(name);
                    }
                }
            }
        }

        if interrupted {
            tracing::info!("runner interrupted during startup");
            group.cancel();
            while let Some(joined) = exits.join_next().await {
                let (name, result) = joined?;
                if let Err(e) = result {
                    tracing::error!(member = name, error = %e, "member failed during startup");
                }
            }
            return Ok(());
        }

        if !not_ready.is_empty() {
            tracing::error!(members = ?not_ready, "runner failed to start");
            group.cancel();
            let mut first = None;
            while let Some(joined) = exits.join_next().await {
                let (name, result) = joined?;
                if let Err(e) = result {
                    tracing::error!(member = name, error = %e, "member failed");
                    if not_ready.contains(&name) && first.is_none() {
                        first = Some(Error::MemberFailed {
                            name,
                            source: Box::new(e),
                        });
                    }
                }
            }
            return match first {
                Some(e) => Err(e),
                None if shutdown.is_cancelled() => Ok(()),
                None => Err(Error::MemberExited { name: not_ready[0] }),
            };
        }

        tracing::info!(members = self.members.len(), "runner ready");

        let mut outcome = Ok(());
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => tracing::info!("runner shutting down"),
            Some(joined) = exits.join_next() => {
                let (name, result) = joined?;
                match result {
                    // Members see the shutdown through the group token and may
                    // finish before this select observes it.
                    Ok(()) if shutdown.is_cancelled() => {
                        tracing::debug!(member = name, "member stopped");
                    }
                    Ok(()) => {
                        tracing::error!(member = name, "member exited, stopping runner");
                        outcome = Err(Error::MemberExited { name });
                    }
                    Err(e @ Error::MemberPanicked { .. }) => {
                        tracing::error!(member = name, "member panicked, stopping runner");
                        outcome = Err(e);
                    }
                    Err(e) => {
                        tracing::error!(member = name, error = %e, "member failed, stopping runner");
                        outcome = Err(Error::MemberFailed { name, source: Box::new(e) });
                    }
                }
            }
        }

        group.cancel();
        while let Some(joined) = exits.join_next().await {
            let (name, result) = joined?;
            match result {
                Ok(()) => tracing::debug!(member = name, "member stopped"),
                Err(e) => {
                    tracing::error!(member = name, error = %e, "member failed during shutdown");
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
        }

        outcome
    }
}
