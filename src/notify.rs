//! Named-channel notifications.
//!
//! The check loop subscribes to [`CHECK_CHANNEL`] so that anything queuing new
//! work can wake it before the next tick.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Channel the check loop listens on.
pub const CHECK_CHANNEL: &str = "check_resources";

/// Pending wake-ups a subscriber can hold before further ones coalesce.
const SUBSCRIBER_BUFFER: usize = 1;

/// A live subscription to one channel.
///
/// Handed back to [`Notifications::unlisten`] to release it, which consumes
/// the handle so it can only be released once.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<()>,
}

impl Subscription {
    pub fn new(id: u64, receiver: mpsc::Receiver<()>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next notification. Returns `None` once the publisher side is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.receiver.recv().await
    }
}

#[async_trait]
pub trait Notifications: Send + Sync {
    async fn listen(&self, channel: &str) -> Result<Subscription>;

    async fn unlisten(&self, channel: &str, subscription: Subscription) -> Result<()>;
}

/// In-process publish/subscribe over named channels.
#[derive(Debug, Default)]
pub struct NotificationBus {
    channels: Mutex<HashMap<String, HashMap<u64, mpsc::Sender<()>>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wakes every subscriber of `channel` and returns how many were reached.
    ///
    /// Never blocks: a subscriber that already has a wake-up queued is counted
    /// as reached without queuing another.
    pub fn notify(&self, channel: &str) -> usize {
        let mut channels = self.channels();
        let Some(subscribers) = channels.get_mut(channel) else {
            return 0;
        };

        subscribers.retain(|_, sender| !sender.is_closed());
        subscribers
            .values()
            .filter(|sender| match sender.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
                Err(mpsc::error::TrySendError::Closed(())) => false,
            })
            .count()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels().get(channel).map_or(0, HashMap::len)
    }

    /// Drops every subscription and refuses new ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.channels().clear();
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, HashMap<u64, mpsc::Sender<()>>>> {
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Notifications for NotificationBus {
    async fn listen(&self, channel: &str) -> Result<Subscription> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::BusClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.channels()
            .entry(channel.to_string())
            .or_default()
            .insert(id, sender);

        tracing::debug!(channel, subscription = id, "listening");
        Ok(Subscription::new(id, receiver))
    }

    async fn unlisten(&self, channel: &str, subscription: Subscription) -> Result<()> {
        let mut channels = self.channels();
        let removed = channels
            .get_mut(channel)
            .and_then(|subscribers| subscribers.remove(&subscription.id));
        if removed.is_none() {
            return Err(Error::UnknownSubscription {
                channel: channel.to_string(),
            });
        }

        if channels.get(channel).is_some_and(HashMap::is_empty) {
            channels.remove(channel);
        }

        tracing::debug!(channel, subscription = subscription.id, "unlistened");
        Ok(())
    }
}
