use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Member;
use crate::error::{Error, Result};
use crate::scanner::Scanner;
use crate::task_group::TaskGroup;

/// Runs a [`Scanner`] once at start and then on every tick of `interval`.
///
/// Each pass runs as its own task, so a pass that outlives the interval
/// overlaps with the next one.
pub struct ScanRunner {
    interval: Duration,
    scanner: Arc<dyn Scanner>,
    tasks: TaskGroup,
}

impl ScanRunner {
    pub fn new(interval: Duration, scanner: Arc<dyn Scanner>) -> Self {
        Self {
            interval,
            scanner,
            tasks: TaskGroup::new(),
        }
    }

    fn spawn_scan(&self, ctx: &CancellationToken) {
        let scanner = Arc::clone(&self.scanner);
        let ctx = ctx.clone();
        self.tasks.spawn(async move {
            if let Err(e) = scanner.scan(&ctx).await {
                tracing::error!(scanner = scanner.name(), error = %format!("{e:#}"), "failed to scan");
            }
        });
    }
}

#[async_trait]
impl Member for ScanRunner {
    fn name(&self) -> &'static str {
        "scanner"
    }

    async fn run(&self, shutdown: CancellationToken, ready: oneshot::Sender<()>) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("scan interval must be non-zero".to_string()));
        }

        tracing::info!(interval = ?self.interval, "scanner start");
        let _ = ready.send(());

        let ctx = CancellationToken::new();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.spawn_scan(&ctx);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.spawn_scan(&ctx),
            }
        }

        ctx.cancel();
        self.tasks.wait().await;
        tracing::info!("scanner done");
        Ok(())
    }
}
