use crate::clock::Clock;
use crate::config::Config;
use crate::engine::{ChantEngine, Effects};
use crate::errors::StoreError;
use crate::models::{Notification, NotificationKind};
use crate::persistence::PersistenceGateway;
use crate::storage::{
    CUSTOM_CHANTS_KEY, FileStore, HISTORY_KEY, KeyValueStore, load_custom_chants, load_history,
};
use crate::timer::TICK_MS;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// The engine plus the persistence it drives.
pub struct Session<S: KeyValueStore> {
    pub engine: ChantEngine,
    gateway: PersistenceGateway<S>,
    notifications: mpsc::UnboundedReceiver<Notification>,
}

impl<S: KeyValueStore> Session<S> {
    /// Loads persisted state, falling back to empty data on any failure.
    pub async fn open(store: Arc<S>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let (gateway, notifications) =
            PersistenceGateway::new(Arc::clone(&store), config.save_debounce);

        let history = load_history(store.as_ref()).await;
        if let Some(err) = &history.failure {
            gateway.notify(NotificationKind::Load, HISTORY_KEY, err);
        }
        let chants = load_custom_chants(store.as_ref()).await;
        if let Some(err) = &chants.failure {
            gateway.notify(NotificationKind::Load, CUSTOM_CHANTS_KEY, err);
        }

        info!(
            entries = history.value.len(),
            custom_chants = chants.value.len(),
            "session opened"
        );
        let engine = ChantEngine::new(
            clock,
            history.value,
            chants.value,
            config.inactivity_timeout_ms,
        );

        Self {
            engine,
            gateway,
            notifications,
        }
    }

    /// Persists whatever `effects` report as changed. The ledger mutation has
    /// already completed, so the snapshot is post-merge. Nothing here waits on
    /// the store, so the caller's lock is never held across a write.
    pub fn apply(&mut self, effects: Effects) {
        if effects.history_changed {
            match self.engine.history_snapshot() {
                Ok(snapshot) => self.gateway.schedule_save(snapshot),
                Err(err) => error!("failed to encode history: {err}"),
            }
        }
        if effects.chants_changed {
            match self.engine.chants_snapshot() {
                // Failures reach the notification channel.
                Ok(bytes) => drop(self.gateway.save_now(CUSTOM_CHANTS_KEY, bytes)),
                Err(err) => error!("failed to encode custom chants: {err}"),
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            drained.push(notification);
        }
        drained
    }

    /// Flushes the open remainder and writes the final snapshot once, best effort.
    pub async fn shutdown(&mut self) -> Result<(), StoreError> {
        self.engine.suspend();
        let snapshot = self.engine.history_snapshot()?;
        self.gateway.shutdown(Some(snapshot)).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session<FileStore>>>,
}

impl AppState {
    pub fn new(session: Session<FileStore>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Periodic timer accrual and day-boundary polling.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn spawn<S: KeyValueStore>(
        session: Arc<Mutex<Session<S>>>,
        day_poll_interval: Duration,
    ) -> Self {
        let ticker_session = Arc::clone(&session);
        let ticker = tokio::spawn(async move {
            run_every(Duration::from_millis(TICK_MS), ticker_session, |engine| engine.tick())
                .await
        });

        let day_poll = tokio::spawn(async move {
            run_every(day_poll_interval, session, |engine| engine.check_day_boundary()).await
        });

        Self {
            handles: vec![ticker, day_poll],
        }
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn run_every<S, F>(period: Duration, session: Arc<Mutex<Session<S>>>, mut step: F)
where
    S: KeyValueStore,
    F: FnMut(&mut ChantEngine) -> Effects,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut session = session.lock().await;
        let effects = step(&mut session.engine);
        session.apply(effects);
    }
}
