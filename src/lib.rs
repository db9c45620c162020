pub mod checker;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod model;
pub mod notify;
pub mod runner;
pub mod scanner;
pub mod source;
pub mod task_group;

#[cfg(test)]
mod test_support;

pub use checker::Checker;
pub use config::Config;
pub use error::{Error, Result};
pub use memory::MemoryWorkSource;
pub use model::{CheckId, CheckRecord, CheckStatus, Resource, ResourceId, ResourceKind, Version};
pub use notify::{NotificationBus, Notifications, Subscription, CHECK_CHANNEL};
pub use runner::{CheckRunner, Member, Runner, ScanRunner};
pub use scanner::Scanner;
pub use source::{ResourceCheck, WorkSource};
pub use task_group::TaskGroup;
