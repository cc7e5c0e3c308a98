//! Cross-context change notifier
//!
//! Turns the store's change broadcast into application-level refresh
//! triggers. A notifier watches a single document key in one context: it
//! ignores unrelated keys and the context's own writes, and invokes the
//! supplied refresh callback for every matching event raised by another
//! context sharing the origin.
//!
//! The callback must be idempotent: overlapping events may trigger
//! overlapping refreshes and there is no debouncing.

use crate::store::{ChangeEvent, StoreContext};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Refresh trigger invoked on every observed remote change
pub type RefreshCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Watches one document key for changes made by other contexts
pub struct ChangeNotifier {
    ctx: Arc<StoreContext>,
    watched_key: String,
    callback: RefreshCallback,
    shutdown_tx: broadcast::Sender<()>,
}

impl ChangeNotifier {
    /// Create a notifier for `watched_key` in the given context
    pub fn new(
        ctx: Arc<StoreContext>,
        watched_key: impl Into<String>,
        callback: RefreshCallback,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            ctx,
            watched_key: watched_key.into(),
            callback,
            shutdown_tx,
        }
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Listen for change events until shutdown (blocking)
    pub async fn run(&self) {
        let mut events = self.ctx.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(key = %self.watched_key, "Change notifier shutting down");
                    break;
                }

                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // A matching event may have been dropped; refresh anyway
                        warn!(key = %self.watched_key, missed, "Change notifier lagged, forcing refresh");
                        (self.callback)(ChangeEvent {
                            key: self.watched_key.clone(),
                            new_value: None,
                            origin: Uuid::nil(),
                        });
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(key = %self.watched_key, "Change channel closed, notifier stopping");
                        break;
                    }
                },
            }
        }
    }

    fn handle_event(&self, event: ChangeEvent) {
        // A writer never observes its own storage events
        if event.origin == self.ctx.id() {
            return;
        }
        if event.key != self.watched_key {
            return;
        }

        debug!(key = %event.key, origin = %event.origin, "Observed change from another context");
        (self.callback)(event);
    }
}

/// Spawn a notifier as a background task
pub fn spawn_notifier(
    ctx: Arc<StoreContext>,
    watched_key: impl Into<String>,
    callback: RefreshCallback,
) -> (Arc<ChangeNotifier>, tokio::task::JoinHandle<()>) {
    let notifier = Arc::new(ChangeNotifier::new(ctx, watched_key, callback));
    let notifier_clone = notifier.clone();

    let handle = tokio::spawn(async move {
        notifier_clone.run().await;
    });

    (notifier, handle)
}
