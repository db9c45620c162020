use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::model::Resource;
use crate::notify::{NotificationBus, CHECK_CHANNEL};
use crate::source::WorkSource;

/// Queues a check for every resource whose last check is older than `check_every`.
pub struct ResourceScanner {
    source: Arc<dyn WorkSource>,
    check_every: Duration,
    bus: Option<Arc<NotificationBus>>,
}

impl ResourceScanner {
    pub fn new(source: Arc<dyn WorkSource>, check_every: Duration) -> Self {
        Self {
            source,
            check_every,
            bus: None,
        }
    }

    /// Publishes on [`CHECK_CHANNEL`] whenever a pass queues new work.
    pub fn with_notifications(mut self, bus: Arc<NotificationBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn is_due(&self, resource: &Resource, now: DateTime<Utc>) -> bool {
        match resource.last_checked {
            Some(checked) => (now - checked)
                .to_std()
                .map_or(false, |elapsed| elapsed >= self.check_every),
            None => true,
        }
    }
}

#[async_trait]
impl super::Scanner for ResourceScanner {
    fn name(&self) -> &'static str {
        "resources"
    }

    async fn scan(&self, ctx: &CancellationToken) -> Result<()> {
        let resources = self
            .source
            .resources()
            .await
            .context("failed to list resources")?;

        let now = Utc::now();
        let mut queued = 0;
        let mut failed = 0;

        for resource in resources.iter().filter(|r| self.is_due(r, now)) {
            if ctx.is_cancelled() {
                tracing::debug!(queued, "scan cancelled");
                return Ok(());
            }

            match self.source.create_resource_check(resource.id, resource.kind).await {
                Ok(()) => queued += 1,
                Err(e) => {
                    tracing::error!(resource = %resource.id, error = %e, "failed to queue check");
                    failed += 1;
                }
            }
        }

        if queued > 0 {
            if let Some(bus) = &self.bus {
                bus.notify(CHECK_CHANNEL);
            }
        }

        tracing::debug!(resources = resources.len(), queued, "scan finished");

        if failed > 0 {
            bail!("failed to queue {} of {} checks", failed, failed + queued);
        }
        Ok(())
    }
}
