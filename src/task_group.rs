//! Tracking for tasks spawned by a loop.

use std::future::Future;
use tokio_util::task::TaskTracker;

/// Counts the tasks a loop has spawned and lets it wait for all of them.
///
/// Each loop owns its own group. A task leaves the group when it completes,
/// panics, or is dropped by the runtime.
#[derive(Debug, Default)]
pub struct TaskGroup {
    tracker: TaskTracker,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits until every task spawned so far, and any spawned while waiting,
    /// has finished.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_all_tasks_finish() {
        let group = TaskGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));

        for delay in [5, 1, 30] {
            let finished = Arc::clone(&finished);
            group.spawn(async move {
                tokio::time::sleep(Duration::from_secs(delay)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(group.len(), 3);

        group.wait().await;
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_wait_on_empty_group() {
        let group = TaskGroup::new();
        group.wait().await;
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_leaves_group() {
        let group = TaskGroup::new();
        group.spawn(async { panic!("check blew up") });
        group.wait().await;
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_group_is_reusable_after_wait() {
        let group = TaskGroup::new();
        group.spawn(async {});
        group.wait().await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        group.spawn(async move {
            let _ = rx.await;
        });
        assert_eq!(group.len(), 1);
        tx.send(()).unwrap();
        group.wait().await;
        assert!(group.is_empty());
    }
}
