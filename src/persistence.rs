//! Debounced snapshot writes.
//!
//! Every `schedule_save` supersedes the one before it: only the latest
//! snapshot handed in before a quiet window is written. Writes are serialised
//! through a lock so an older snapshot can never land after a newer one.
//! Failures are pushed to the notification channel and never retried here.

use crate::errors::StoreError;
use crate::models::{Notification, NotificationKind};
use crate::storage::{HISTORY_KEY, KeyValueStore};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct PersistenceGateway<S: KeyValueStore> {
    store: Arc<S>,
    window: Duration,
    generation: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
    pending: Option<JoinHandle<()>>,
    latest: Option<Vec<u8>>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(
        store: Arc<S>,
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, rx) = mpsc::unbounded_channel();
        let gateway = Self {
            store,
            window,
            generation: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
            pending: None,
            latest: None,
            notifications,
        };
        (gateway, rx)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Schedules `snapshot` to be written once no newer snapshot arrives for
    /// the debounce window.
    pub fn schedule_save(&mut self, snapshot: Vec<u8>) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest = Some(snapshot.clone());

        let store = Arc::clone(&self.store);
        let generation = Arc::clone(&self.generation);
        let write_lock = Arc::clone(&self.write_lock);
        let notifications = self.notifications.clone();
        let window = self.window;

        // A superseded task still sleeping or waiting on the write lock sees
        // the bumped generation and exits without writing.
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _guard = write_lock.lock().await;
            if generation.load(Ordering::SeqCst) != ticket {
                debug!(ticket, "debounced save superseded");
                return;
            }
            match store.set(HISTORY_KEY, snapshot).await {
                Ok(()) => debug!(ticket, "history snapshot saved"),
                Err(err) => report(&notifications, HISTORY_KEY, &err),
            }
        }));
    }

    /// Writes a value right away, outside the debounce, for data that changes
    /// rarely such as the custom chant list. The write runs on its own task so
    /// the caller never waits behind an in-flight snapshot.
    pub fn save_now(&self, key: &str, value: Vec<u8>) -> JoinHandle<Result<(), StoreError>> {
        let key = key.to_string();
        let store = Arc::clone(&self.store);
        let write_lock = Arc::clone(&self.write_lock);
        let notifications = self.notifications.clone();

        tokio::spawn(async move {
            let _guard = write_lock.lock().await;
            let result = store.set(&key, value).await;
            match &result {
                Ok(()) => debug!(key, "saved"),
                Err(err) => report(&notifications, &key, err),
            }
            result
        })
    }

    /// Pushes a failure that happened outside the gateway, such as a load.
    pub fn notify(&self, kind: NotificationKind, key: &str, err: &StoreError) {
        let _ = self.notifications.send(Notification {
            kind,
            key: key.to_string(),
            message: err.to_string(),
            at: Utc::now().timestamp_millis(),
        });
    }

    /// Cancels the pending debounce and writes `snapshot`, or else the latest
    /// scheduled one, once.
    pub async fn shutdown(&mut self, snapshot: Option<Vec<u8>>) -> Result<(), StoreError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        // Holding the lock means no write is mid-flight when the task is aborted.
        let _guard = self.write_lock.lock().await;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let Some(snapshot) = snapshot.or_else(|| self.latest.take()) else {
            return Ok(());
        };

        match self.store.set(HISTORY_KEY, snapshot).await {
            Ok(()) => {
                info!("final history snapshot saved");
                Ok(())
            }
            Err(err) => {
                report(&self.notifications, HISTORY_KEY, &err);
                Err(err)
            }
        }
    }
}

impl<S: KeyValueStore> Drop for PersistenceGateway<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

fn report(notifications: &mpsc::UnboundedSender<Notification>, key: &str, err: &StoreError) {
    error!(key, "failed to save snapshot: {err}");
    let _ = notifications.send(Notification {
        kind: NotificationKind::Save,
        key: key.to_string(),
        message: err.to_string(),
        at: Utc::now().timestamp_millis(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const WINDOW: Duration = Duration::from_millis(1_000);

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_saves_collapse_into_one_write_of_the_latest() {
        let store = Arc::new(MemoryStore::new());
        let (mut gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        for n in 1..=5u8 {
            gateway.schedule_save(vec![n]);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(store.writes(), 0);

        tokio::time::sleep(WINDOW).await;
        settle().await;

        assert_eq!(store.writes(), 1);
        assert_eq!(store.value(HISTORY_KEY), Some(vec![5]));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_saves_each_write() {
        let store = Arc::new(MemoryStore::new());
        let (mut gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        gateway.schedule_save(vec![1]);
        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        gateway.schedule_save(vec![2]);
        tokio::time::sleep(WINDOW * 2).await;
        settle().await;

        assert_eq!(store.writes(), 2);
        assert_eq!(store.value(HISTORY_KEY), Some(vec![2]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_is_surfaced_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.set_reject_writes(true);
        let (mut gateway, mut rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        gateway.schedule_save(vec![1]);
        tokio::time::sleep(WINDOW * 5).await;
        settle().await;

        let notification = rx.try_recv().expect("failure notification");
        assert_eq!(notification.kind, NotificationKind::Save);
        assert_eq!(notification.key, HISTORY_KEY);
        assert!(rx.try_recv().is_err());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_and_writes_latest_once() {
        let store = Arc::new(MemoryStore::new());
        let (mut gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        gateway.schedule_save(vec![1]);
        gateway.schedule_save(vec![2]);
        gateway.shutdown(None).await.unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(store.value(HISTORY_KEY), Some(vec![2]));

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_prefers_the_final_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let (mut gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        gateway.schedule_save(vec![1]);
        gateway.shutdown(Some(vec![9])).await.unwrap();
        assert_eq!(store.value(HISTORY_KEY), Some(vec![9]));
        assert!(!gateway.has_pending());
    }

    #[tokio::test]
    async fn save_now_bypasses_debounce() {
        let store = Arc::new(MemoryStore::new());
        let (gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);
        gateway
            .save_now("customChants", b"[]".to_vec())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.value("customChants"), Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn save_now_waits_for_an_in_flight_write_without_blocking_the_caller() {
        let store = Arc::new(MemoryStore::new());
        let (gateway, _rx) = PersistenceGateway::new(Arc::clone(&store), WINDOW);

        let held = gateway.write_lock.lock().await;
        let write = gateway.save_now("customChants", b"[]".to_vec());
        settle().await;
        assert_eq!(store.writes(), 0);

        drop(held);
        write.await.unwrap().unwrap();
        assert_eq!(store.writes(), 1);
    }
}
