use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ResourceId, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(pub u64);

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum CheckStatus {
    Pending,
    Succeeded,
    Errored { message: String },
}

impl CheckStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, CheckStatus::Pending)
    }
}

/// A unit of check work as stored by a work source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: CheckId,
    pub resource: ResourceId,
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub status: CheckStatus,
    pub created_at: DateTime<Utc>,
}

impl CheckRecord {
    pub fn new(id: CheckId, resource: ResourceId, kind: ResourceKind) -> Self {
        Self {
            id,
            resource,
            kind,
            status: CheckStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
