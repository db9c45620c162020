//! In-process work source.
//!
//! [`MemoryWorkSource`] keeps resources and check records behind a mutex. The
//! binary seeds it from a fleet file:
//!
//! ```toml
//! [[resource]]
//! id = 1
//! name = "git"
//! kind = "resource-type"
//! check = "git ls-remote https://github.com/concourse/git-resource HEAD | cut -f1"
//!
//! [[resource]]
//! id = 2
//! name = "repo"
//! parent = 1
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{CheckId, CheckRecord, CheckStatus, Resource, ResourceId, ResourceKind, Version};
use crate::source::WorkSource;

#[derive(Debug, Default, Deserialize)]
struct Fleet {
    #[serde(default, rename = "resource")]
    resources: Vec<Resource>,
}

#[derive(Debug, Default)]
struct State {
    resources: BTreeMap<ResourceId, Resource>,
    checks: BTreeMap<CheckId, CheckRecord>,
    next_check: u64,
}

#[derive(Debug, Default)]
pub struct MemoryWorkSource {
    state: Mutex<State>,
}

impl MemoryWorkSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a work source from the resources listed in a fleet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// resource names a parent that is not in the fleet.
    pub fn load_fleet(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_fleet_str(&content)
    }

    pub fn from_fleet_str(content: &str) -> Result<Self> {
        let fleet: Fleet = toml::from_str(content)?;
        let source = Self::new();
        for resource in fleet.resources {
            source.insert(resource);
        }

        {
            let state = source.state();
            for resource in state.resources.values() {
                if let Some(parent) = resource.parent {
                    if !state.resources.contains_key(&parent) {
                        return Err(Error::UnknownResource(parent));
                    }
                }
            }
        }

        Ok(source)
    }

    pub fn insert(&self, resource: Resource) {
        self.state().resources.insert(resource.id, resource);
    }

    /// Overwrites the version of `id`, as an external check would.
    pub fn set_version(&self, id: ResourceId, version: Version) -> Result<()> {
        let mut state = self.state();
        let resource = state
            .resources
            .get_mut(&id)
            .ok_or(Error::UnknownResource(id))?;
        resource.version = Some(version);
        Ok(())
    }

    pub fn check(&self, id: CheckId) -> Option<CheckRecord> {
        self.state().checks.get(&id).cloned()
    }

    /// Returns every check record, whatever its status.
    pub fn checks(&self) -> Vec<CheckRecord> {
        self.state().checks.values().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(state: &mut State, id: CheckId, status: CheckStatus) -> Result<ResourceId> {
        let record = state.checks.get_mut(&id).ok_or(Error::UnknownCheck(id))?;
        record.status = status;
        Ok(record.resource)
    }
}

#[async_trait]
impl WorkSource for MemoryWorkSource {
    async fn resource_checks(&self) -> Result<Vec<CheckRecord>> {
        Ok(self
            .state()
            .checks
            .values()
            .filter(|record| record.status.is_pending())
            .cloned()
            .collect())
    }

    async fn create_resource_check(&self, id: ResourceId, kind: ResourceKind) -> Result<()> {
        let mut state = self.state();
        if !state.resources.contains_key(&id) {
            return Err(Error::UnknownResource(id));
        }

        let queued = state
            .checks
            .values()
            .any(|record| record.resource == id && record.kind == kind && record.status.is_pending());
        if queued {
            return Ok(());
        }

        state.next_check += 1;
        let check = CheckId(state.next_check);
        state.checks.insert(check, CheckRecord::new(check, id, kind));
        Ok(())
    }

    async fn resource(&self, id: ResourceId) -> Result<Resource> {
        self.state()
            .resources
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownResource(id))
    }

    async fn resources(&self) -> Result<Vec<Resource>> {
        Ok(self.state().resources.values().cloned().collect())
    }

    async fn fail_check(&self, check: CheckId, message: &str) -> Result<()> {
        let mut state = self.state();
        Self::settle(
            &mut state,
            check,
            CheckStatus::Errored {
                message: message.to_string(),
            },
        )?;
        Ok(())
    }

    async fn finish_check(&self, check: CheckId, version: Option<Version>) -> Result<()> {
        let mut state = self.state();
        let id = Self::settle(&mut state, check, CheckStatus::Succeeded)?;
        let resource = state
            .resources
            .get_mut(&id)
            .ok_or(Error::UnknownResource(id))?;
        if let Some(version) = version {
            resource.version = Some(version);
        }
        resource.last_checked = Some(Utc::now());
        Ok(())
    }
}
