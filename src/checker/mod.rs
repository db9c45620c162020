mod command;
mod resource;

pub use command::CommandCheck;
pub use resource::{ResourceChecker, PARENT_NOT_READY};

use crate::model::{Resource, Version};
use crate::source::ResourceCheck;
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Strategy for running one queued check.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, ctx: &CancellationToken, check: &ResourceCheck) -> Result<()>;
}

/// Discovers the latest version of a single resource.
///
/// Returns `None` when the resource has nothing newer to report.
#[async_trait]
pub trait VersionCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check_version(&self, ctx: &CancellationToken, resource: &Resource) -> Result<Option<Version>>;
}

pub fn default_checker() -> ResourceChecker<CommandCheck> {
    ResourceChecker::new(CommandCheck::new())
}
