//! # Outbox Dispatcher
//!
//! Drains the notification outbox into the host's [`Notifier`].
//!
//! ## Delivery Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every dispatch_interval:                                               │
//! │    rows = pending, attempts < max, oldest first, batch-limited          │
//! │    for each row:                                                        │
//! │      notifier.send(event)                                               │
//! │        Ok  → mark sent                                                  │
//! │        Err → record failure; row retries next pass until attempts      │
//! │              run out, then flips to failed for operator review         │
//! │                                                                         │
//! │  A dead gateway delays notifications. It never touches the order or    │
//! │  appointment that queued them.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use volta_db::Database;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::notify::{NotificationEvent, Notifier};

/// What one dispatcher pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: usize,
    pub failed: usize,
}

/// Drains the notification outbox.
pub struct OutboxDispatcher {
    db: Database,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl OutboxDispatcher {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        OutboxDispatcher {
            db,
            notifier,
            config,
        }
    }

    /// One delivery pass. Processes at most one batch; callers (and tests)
    /// drive passes explicitly, the spawned loop drives them on a timer.
    pub async fn run_once(&self) -> EngineResult<DispatchStats> {
        let pending = self
            .db
            .outbox()
            .get_pending(self.config.dispatch_batch_size, self.config.notify_max_attempts)
            .await?;

        if pending.is_empty() {
            return Ok(DispatchStats::default());
        }

        debug!(count = pending.len(), "Dispatching notifications");
        let mut stats = DispatchStats::default();

        for entry in &pending {
            let event = NotificationEvent::from_outbox(entry);
            match self.notifier.send(&event).await {
                Ok(()) => {
                    self.db.outbox().mark_sent(&entry.id).await?;
                    stats.sent += 1;
                }
                Err(err) => {
                    warn!(
                        outbox_id = %entry.id,
                        event = ?entry.event_type,
                        error = %err,
                        "Notification delivery failed"
                    );
                    self.db
                        .outbox()
                        .mark_failed(&entry.id, &err.to_string(), self.config.notify_max_attempts)
                        .await?;
                    stats.failed += 1;
                }
            }
        }

        info!(sent = stats.sent, failed = stats.failed, "Dispatch pass complete");
        Ok(stats)
    }

    /// Spawns the dispatcher as a background task polling on the configured
    /// interval. The returned handle stops it.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let interval = self.config.dispatch_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Outbox dispatcher shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = self.run_once().await {
                            error!(error = %err, "Dispatch pass failed");
                        }
                    }
                }
            }
        });

        DispatcherHandle { shutdown_tx, task }
    }
}

/// Stops a spawned dispatcher.
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signals shutdown and waits for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use volta_core::NotificationEventType;
    use volta_db::repository::outbox::NotificationOutboxRepository;
    use volta_db::DbConfig;

    use crate::notify::{outbox_entry, NotifyError};

    /// Records every event it is handed; optionally fails them all.
    struct RecordingNotifier {
        sent: Mutex<Vec<NotificationEvent>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(RecordingNotifier {
                sent: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Unreachable("gateway down".into()));
            }
            self.sent.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    async fn enqueue(db: &Database, event_type: NotificationEventType) -> String {
        let entry = outbox_entry(event_type, "9876543210", json!({ "k": "v" }));
        let id = entry.id.clone();
        let mut tx = db.pool().begin().await.unwrap();
        NotificationOutboxRepository::enqueue_in_tx(tx.as_mut(), &entry).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_run_once_marks_sent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        enqueue(&db, NotificationEventType::OrderConfirmed).await;
        enqueue(&db, NotificationEventType::DeliveryOtpIssued).await;

        let notifier = RecordingNotifier::new(false);
        let dispatcher =
            OutboxDispatcher::new(db.clone(), notifier.clone(), EngineConfig::default());

        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats, DispatchStats { sent: 2, failed: 0 });
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        // Nothing left: the next pass is a no-op
        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats, DispatchStats::default());
    }

    #[tokio::test]
    async fn test_failures_retry_until_attempts_run_out() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = enqueue(&db, NotificationEventType::OrderCancelled).await;

        let mut config = EngineConfig::default();
        config.notify_max_attempts = 2;
        let dispatcher = OutboxDispatcher::new(db.clone(), RecordingNotifier::new(true), config);

        // First pass fails but the row stays retryable
        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats.failed, 1);
        let row = db.outbox().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(row.status, volta_core::NotificationStatus::Pending);
        assert_eq!(row.attempts, 1);
        assert_eq!(row.last_error.as_deref(), Some("Notification gateway unreachable: gateway down"));

        // Second pass exhausts the budget
        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats.failed, 1);
        let row = db.outbox().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(row.status, volta_core::NotificationStatus::Failed);

        // Third pass no longer sees it
        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats, DispatchStats::default());
    }

    #[tokio::test]
    async fn test_spawned_dispatcher_shuts_down() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        enqueue(&db, NotificationEventType::OrderDelivered).await;

        let notifier = RecordingNotifier::new(false);
        let mut config = EngineConfig::default();
        config.dispatch_interval = std::time::Duration::from_millis(10);

        let handle =
            OutboxDispatcher::new(db.clone(), notifier.clone(), config).spawn();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }
}
