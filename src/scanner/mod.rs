//! Scan strategies.
//!
//! A [`Scanner`] performs one full pass looking for resources and resource
//! types that are due for a check. The [`ScanRunner`](crate::runner::ScanRunner)
//! drives it on an interval.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lidar::scanner::{ResourceScanner, Scanner};
//! use lidar::MemoryWorkSource;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Arc::new(MemoryWorkSource::new());
//!     let scanner = ResourceScanner::new(source, Duration::from_secs(60));
//!
//!     scanner.scan(&CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

mod resource;

pub use resource::ResourceScanner;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Strategy for one scan pass.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Returns the human-readable name of this scanner.
    fn name(&self) -> &'static str;

    /// Runs one pass.
    ///
    /// `ctx` is shared by every pass of a loop and is cancelled on shutdown;
    /// implementations should return promptly once it is.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass failed. The loop logs it and keeps going.
    async fn scan(&self, ctx: &CancellationToken) -> Result<()>;
}
