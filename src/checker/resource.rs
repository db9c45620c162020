use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Checker, VersionCheck};
use crate::model::ResourceKind;
use crate::source::ResourceCheck;

/// Message recorded on a check whose parent resource type was never checked.
pub const PARENT_NOT_READY: &str = "parent resource has no version";

/// Checks one resource once its parent resource type has a version.
///
/// If the parent has never been checked, the parent is queued for a
/// resource-type check and this check is failed with [`PARENT_NOT_READY`]. A later pass picks the
/// resource up again once the parent has a version.
pub struct ResourceChecker<V> {
    inner: V,
}

impl<V: VersionCheck> ResourceChecker<V> {
    pub fn new(inner: V) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<V: VersionCheck> Checker for ResourceChecker<V> {
    async fn check(&self, ctx: &CancellationToken, check: &ResourceCheck) -> Result<()> {
        if ctx.is_cancelled() {
            tracing::debug!(check = %check.id(), "skipping check, shutting down");
            return Ok(());
        }

        let resource = check.resource().await.inspect_err(|e| {
            tracing::error!(check = %check.id(), error = %e, "failed to fetch resource");
        })?;

        let parent = check.parent_resource_type(&resource).await.inspect_err(|e| {
            tracing::error!(resource = %resource.id, error = %e, "failed to fetch parent type");
        })?;

        if let Some(parent) = parent.filter(|p| !p.has_version()) {
            check.request_check(parent.id, ResourceKind::ResourceType).await.inspect_err(|e| {
                tracing::error!(parent = %parent.id, error = %e, "failed to request parent check");
            })?;

            check.error(PARENT_NOT_READY).await.inspect_err(|e| {
                tracing::error!(check = %check.id(), error = %e, "failed to save check error");
            })?;

            tracing::info!(
                resource = %resource.id,
                parent = %parent.id,
                "parent has no version, requested parent check"
            );
            return Ok(());
        }

        match self.inner.check_version(ctx, &resource).await {
            Ok(version) => {
                check.finish(version).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(save) = check.error(&e.to_string()).await {
                    tracing::error!(check = %check.id(), error = %save, "failed to save check error");
                }
                Err(e.context(format!("{} check of {} failed", self.inner.name(), resource.name)))
            }
        }
    }
}
