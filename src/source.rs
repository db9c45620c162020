//! The work source seam.
//!
//! A [`WorkSource`] owns every piece of durable state the scheduler touches:
//! resources, their versions, and the backlog of queued checks. The core only
//! reads snapshots of the backlog and records outcomes through it.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{CheckId, CheckRecord, Resource, ResourceId, ResourceKind, Version};

/// Storage for resources and queued checks.
///
/// Implementations must be safe to call concurrently from many tasks; each
/// call to [`resource_checks`](Self::resource_checks) returns a fresh snapshot.
#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Returns every pending check, in queue order.
    async fn resource_checks(&self) -> Result<Vec<CheckRecord>>;

    /// Queues a future check of `kind` for the resource `id`.
    ///
    /// Queuing a check that is already pending is not an error.
    async fn create_resource_check(&self, id: ResourceId, kind: ResourceKind) -> Result<()>;

    async fn resource(&self, id: ResourceId) -> Result<Resource>;

    async fn resources(&self) -> Result<Vec<Resource>>;

    /// Records a terminal failure for `check`.
    async fn fail_check(&self, check: CheckId, message: &str) -> Result<()>;

    /// Records a successful check, saving `version` when one was found.
    async fn finish_check(&self, check: CheckId, version: Option<Version>) -> Result<()>;
}

/// A pending check bound to the work source it came from.
#[derive(Clone)]
pub struct ResourceCheck {
    record: CheckRecord,
    source: Arc<dyn WorkSource>,
}

impl ResourceCheck {
    pub fn new(record: CheckRecord, source: Arc<dyn WorkSource>) -> Self {
        Self { record, source }
    }

    pub fn id(&self) -> CheckId {
        self.record.id
    }

    pub fn resource_id(&self) -> ResourceId {
        self.record.resource
    }

    pub fn kind(&self) -> ResourceKind {
        self.record.kind
    }

    /// Fetches the resource this check targets.
    pub async fn resource(&self) -> Result<Resource> {
        self.source.resource(self.record.resource).await
    }

    /// Fetches the parent resource type of `resource`, if it declares one.
    pub async fn parent_resource_type(&self, resource: &Resource) -> Result<Option<Resource>> {
        match resource.parent {
            Some(parent) => self.source.resource(parent).await.map(Some),
            None => Ok(None),
        }
    }

    /// Queues a follow-up check against the same work source.
    pub async fn request_check(&self, id: ResourceId, kind: ResourceKind) -> Result<()> {
        self.source.create_resource_check(id, kind).await
    }

    /// Marks this check as failed with `message`.
    pub async fn error(&self, message: &str) -> Result<()> {
        self.source.fail_check(self.record.id, message).await
    }

    pub async fn finish(&self, version: Option<Version>) -> Result<()> {
        self.source.finish_check(self.record.id, version).await
    }
}

impl fmt::Debug for ResourceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCheck")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
