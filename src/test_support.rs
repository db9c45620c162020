//! Test doubles shared by the unit tests.

use anyhow::bail;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::checker::{Checker, VersionCheck};
use crate::error::{Error, Result};
use crate::memory::MemoryWorkSource;
use crate::model::{CheckId, CheckRecord, Resource, ResourceId, ResourceKind, Version};
use crate::notify::{NotificationBus, Notifications, Subscription};
use crate::scanner::Scanner;
use crate::source::{ResourceCheck, WorkSource};

pub async fn first_check(source: &Arc<MemoryWorkSource>) -> ResourceCheck {
    let record = source.resource_checks().await.unwrap().remove(0);
    ResourceCheck::new(record, source.clone())
}

/// Records each call and publishes it so tests can wait for the next one.
#[derive(Clone)]
struct CallLog<T> {
    count: Arc<AtomicUsize>,
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> CallLog<T> {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    fn record(&self, value: T) {
        self.count.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(value);
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn next(&self) -> T {
        self.rx.lock().await.recv().await.expect("call log closed")
    }
}

#[derive(Clone)]
pub struct RecordingScanner {
    log: CallLog<()>,
    delay: Option<Duration>,
    fail: bool,
    pub finished: Arc<AtomicUsize>,
    pub saw_cancel: Arc<AtomicBool>,
}

impl RecordingScanner {
    pub fn new() -> Self {
        Self {
            log: CallLog::new(),
            delay: None,
            fail: false,
            finished: Arc::new(AtomicUsize::new(0)),
            saw_cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// A scanner that ignores cancellation and takes `delay` per pass.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.log.count()
    }

    pub async fn next_call(&self) {
        self.log.next().await
    }
}

#[async_trait]
impl Scanner for RecordingScanner {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn scan(&self, ctx: &CancellationToken) -> anyhow::Result<()> {
        self.log.record(());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if ctx.is_cancelled() {
            self.saw_cancel.store(true, Ordering::SeqCst);
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("scan failed");
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingChecker {
    log: CallLog<ResourceId>,
    delay: Option<Duration>,
    fail_for: Option<ResourceId>,
    pub finished: Arc<AtomicUsize>,
}

impl RecordingChecker {
    pub fn new() -> Self {
        Self {
            log: CallLog::new(),
            delay: None,
            fail_for: None,
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_for(resource: ResourceId) -> Self {
        Self {
            fail_for: Some(resource),
            ..Self::new()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.log.count()
    }

    /// Waits for the next check and returns the resource it targeted.
    pub async fn next_call(&self) -> ResourceId {
        self.log.next().await
    }
}

#[async_trait]
impl Checker for RecordingChecker {
    async fn check(&self, _ctx: &CancellationToken, check: &ResourceCheck) -> anyhow::Result<()> {
        self.log.record(check.resource_id());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail_for == Some(check.resource_id()) {
            bail!("check of {} failed", check.resource_id());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingVersionCheck {
    calls: Arc<AtomicUsize>,
    version: Option<Version>,
    error: Option<&'static str>,
}

impl RecordingVersionCheck {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            version: None,
            error: None,
        }
    }

    pub fn returning(version: Version) -> Self {
        Self {
            version: Some(version),
            ..Self::new()
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            error: Some(message),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionCheck for RecordingVersionCheck {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn check_version(&self, _ctx: &CancellationToken, _resource: &Resource) -> anyhow::Result<Option<Version>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.error {
            bail!(message);
        }
        Ok(self.version.clone())
    }
}

/// A work source with a fixed backlog that counts how often it is listed.
pub struct FakeSource {
    backlog: Vec<CheckRecord>,
    listings: AtomicUsize,
    panic_on_listing: Option<usize>,
    /// Number of upcoming listings that fail.
    pub fail_listings: AtomicUsize,
}

impl FakeSource {
    pub fn with_backlog(backlog: Vec<CheckRecord>) -> Self {
        Self {
            backlog,
            listings: AtomicUsize::new(0),
            panic_on_listing: None,
            fail_listings: AtomicUsize::new(0),
        }
    }

    /// Panics on the `nth` listing, counting from 1.
    pub fn panicking_on_listing(backlog: Vec<CheckRecord>, nth: usize) -> Self {
        Self {
            panic_on_listing: Some(nth),
            ..Self::with_backlog(backlog)
        }
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkSource for FakeSource {
    async fn resource_checks(&self) -> Result<Vec<CheckRecord>> {
        let listing = self.listings.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on_listing == Some(listing) {
            panic!("listing {listing} blew up");
        }
        let failing = self
            .fail_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Io(std::io::Error::other("database unavailable")));
        }
        Ok(self.backlog.clone())
    }

    async fn create_resource_check(&self, _id: ResourceId, _kind: ResourceKind) -> Result<()> {
        Ok(())
    }

    async fn resource(&self, id: ResourceId) -> Result<Resource> {
        Err(Error::UnknownResource(id))
    }

    async fn resources(&self) -> Result<Vec<Resource>> {
        Ok(Vec::new())
    }

    async fn fail_check(&self, _check: CheckId, _message: &str) -> Result<()> {
        Ok(())
    }

    async fn finish_check(&self, _check: CheckId, _version: Option<Version>) -> Result<()> {
        Ok(())
    }
}

/// Wraps a real bus, counting unlistens and optionally refusing to listen.
pub struct FakeNotifications {
    pub bus: NotificationBus,
    fail: bool,
    hang: bool,
    unlistens: AtomicUsize,
}

impl FakeNotifications {
    pub fn new() -> Self {
        Self {
            bus: NotificationBus::new(),
            fail: false,
            hang: false,
            unlistens: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// A bus whose `listen` never completes.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    pub fn unlistens(&self) -> usize {
        self.unlistens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifications for FakeNotifications {
    async fn listen(&self, channel: &str) -> Result<Subscription> {
        if self.fail {
            return Err(Error::BusClosed);
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.bus.listen(channel).await
    }

    async fn unlisten(&self, channel: &str, subscription: Subscription) -> Result<()> {
        self.unlistens.fetch_add(1, Ordering::SeqCst);
        self.bus.unlisten(channel, subscription).await
    }
}
