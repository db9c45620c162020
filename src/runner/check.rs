use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Member;
use crate::checker::Checker;
use crate::error::{Error, Result};
use crate::notify::{Notifications, Subscription, CHECK_CHANNEL};
use crate::source::{ResourceCheck, WorkSource};
use crate::task_group::TaskGroup;

/// Runs every pending check at start, on every tick of `interval`, and on
/// every notification received on [`CHECK_CHANNEL`].
///
/// Each pass fetches a fresh backlog and spawns one task per check. Ticks and
/// notifications each trigger their own pass.
pub struct CheckRunner {
    interval: Duration,
    checker: Arc<dyn Checker>,
    source: Arc<dyn WorkSource>,
    notifications: Arc<dyn Notifications>,
    tasks: TaskGroup,
}

impl CheckRunner {
    pub fn new(
        interval: Duration,
        checker: Arc<dyn Checker>,
        source: Arc<dyn WorkSource>,
        notifications: Arc<dyn Notifications>,
    ) -> Self {
        Self {
            interval,
            checker,
            source,
            notifications,
            tasks: TaskGroup::new(),
        }
    }

    async fn serve(&self, shutdown: &CancellationToken, ctx: &CancellationToken, subscription: &mut Subscription) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.check_all(ctx).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.check_all(ctx).await,
                Some(()) = subscription.recv() => {
                    tracing::debug!(channel = CHECK_CHANNEL, "notified");
                    self.check_all(ctx).await;
                }
            }
        }
    }

    async fn check_all(&self, ctx: &CancellationToken) {
        let records = match self.source.resource_checks().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "failed to check all");
                return;
            }
        };

        tracing::debug!(count = records.len(), "dispatching checks");

        for record in records {
            let check = ResourceCheck::new(record, Arc::clone(&self.source));
            let checker = Arc::clone(&self.checker);
            let ctx = ctx.clone();
            self.tasks.spawn(async move {
                if let Err(e) = checker.check(&ctx, &check).await {
                    tracing::error!(
                        check = %check.id(),
                        resource = %check.resource_id(),
                        kind = %check.kind(),
                        error = %format!("{e:#}"),
                        "failed to check"
                    );
                }
            });
        }
    }
}

#[async_trait]
impl Member for CheckRunner {
    fn name(&self) -> &'static str {
        "checker"
    }

    async fn run(&self, shutdown: CancellationToken, ready: oneshot::Sender<()>) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("check interval must be non-zero".to_string()));
        }

        let listening = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("checker stopped before listening");
                return Ok(());
            }
            listening = self.notifications.listen(CHECK_CHANNEL) => listening,
        };
        let mut subscription = listening.map_err(|e| Error::Listen {
            channel: CHECK_CHANNEL.to_string(),
            source: Box::new(e),
        })?;

        tracing::info!(interval = ?self.interval, channel = CHECK_CHANNEL, "checker start");
        let _ = ready.send(());

        let ctx = CancellationToken::new();
        let served = AssertUnwindSafe(self.serve(&shutdown, &ctx, &mut subscription))
            .catch_unwind()
            .await;

        ctx.cancel();
        let released = self.notifications.unlisten(CHECK_CHANNEL, subscription).await;
        self.tasks.wait().await;

        if let Err(e) = released {
            tracing::error!(channel = CHECK_CHANNEL, error = %e, "failed to unlisten");
        }
        if let Err(panic) = served {
            tracing::error!("checker loop panicked");
            std::panic::resume_unwind(panic);
        }
        tracing::info!("checker done");
        Ok(())
    }
}
