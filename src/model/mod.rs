//! Core data types for resources, versions, and check records.
//!
//! - [`Resource`] - A checkable entity, optionally depending on a parent resource type
//! - [`ResourceKind`] - Whether an entity is a resource or a resource type
//! - [`Version`] - The key/value version a check discovered
//! - [`CheckRecord`] - A queued check and its terminal status
//!
//! # Example
//!
//! ```
//! use lidar::model::{Resource, ResourceId, ResourceKind, Version};
//!
//! let git = Resource::new(ResourceId(1), "git", ResourceKind::ResourceType)
//!     .with_version(Version::new().with("ref", "v1.2.0"));
//! let repo = Resource::new(ResourceId(2), "repo", ResourceKind::Resource).with_parent(git.id);
//!
//! assert!(git.has_version());
//! assert!(!repo.has_version());
//! ```

mod check;
mod resource;

pub use check::*;
pub use resource::*;
