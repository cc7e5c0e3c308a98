//! Durable key-value store over an origin-scoped directory
//!
//! The store is the system's sole database substitute. Each top-level key is
//! one JSON document inside the origin directory; every successful write
//! broadcasts a `(key, newValue)` change event to the other execution
//! contexts sharing the origin, mirroring the storage-event model the app
//! relies on for cross-context refresh.
//!
//! ## Storage layout
//!
//! ```text
//! <data_dir>/
//! ├── users.json      # user records, credential hashes included
//! ├── reviews.json    # review records, newest first
//! ├── favorites.json  # user id -> [item ids]
//! └── session.json    # current session token, removed on logout
//! ```

use crate::config::Config;
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Document key for the user ledger
pub const USERS_KEY: &str = "users";
/// Document key for the review ledger
pub const REVIEWS_KEY: &str = "reviews";
/// Document key for the favorites registry
pub const FAVORITES_KEY: &str = "favorites";
/// Document key for the persisted session token
pub const SESSION_KEY: &str = "session";

/// Identifies one execution context (one "tab") sharing the origin
pub type ContextId = Uuid;

/// Change event raised by a successful write or removal.
///
/// `new_value` is `None` for removals. `origin` tags the writing context so
/// subscribers can reproduce the native guarantee that a writer never
/// observes its own storage events.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    pub new_value: Option<Value>,
    pub origin: ContextId,
}

/// Process-wide handle for one storage origin.
///
/// Owns the backing directory and the change-broadcast channel. Contexts
/// opened from the same handle coordinate only through the documents and
/// the broadcast, never through shared in-memory state.
pub struct DurableStore {
    dir: PathBuf,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl DurableStore {
    /// Open (creating if needed) the origin directory
    pub fn open(config: &Config) -> Result<Arc<Self>, StoreError> {
        fs::create_dir_all(&config.data_dir)?;
        let (change_tx, _) = broadcast::channel(config.channel_capacity);

        info!(dir = %config.data_dir.display(), "Opened durable store");

        Ok(Arc::new(Self {
            dir: config.data_dir.clone(),
            change_tx,
        }))
    }

    /// Open a context over this origin (one per simulated tab)
    pub fn context(&self) -> Arc<StoreContext> {
        Arc::new(StoreContext {
            id: Uuid::new_v4(),
            dir: self.dir.clone(),
            change_tx: self.change_tx.clone(),
        })
    }
}

/// Per-context handle to the durable store.
///
/// All operations are synchronous from the caller's perspective and must be
/// treated as potentially failing: reads degrade to `None`/default with a
/// log line rather than crashing the caller.
pub struct StoreContext {
    id: ContextId,
    dir: PathBuf,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl StoreContext {
    /// This context's identity (used to filter out its own change events)
    pub fn id(&self) -> ContextId {
        self.id
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a document. Absent or unreadable degrades to `None`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.document_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to read document");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(key = %key, error = %e, "Failed to parse document");
                None
            }
        }
    }

    /// Return the stored value for `key`, seeding `default` if absent.
    ///
    /// Seeding failure degrades to returning `default` with a log line;
    /// a disabled or full medium must never crash the caller.
    pub fn initialize<T: Serialize + DeserializeOwned>(&self, key: &str, default: T) -> T {
        if let Some(existing) = self.read(key) {
            return existing;
        }

        if let Err(e) = self.write(key, &default) {
            error!(key = %key, error = %e, "Failed to seed document, continuing with default");
        }
        default
    }

    /// Persist a document, then notify the other contexts on this origin
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_value(value)?;
        let raw = serde_json::to_string(&json)?;

        fs::write(self.document_path(key), raw)
            .map_err(|e| StoreError::Storage(format!("write {key}: {e}")))?;

        debug!(key = %key, "Wrote document");
        self.broadcast(key, Some(json));
        Ok(())
    }

    /// Remove a document (absent is a no-op), then notify the other contexts
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.document_path(key)) {
            Ok(()) => {
                debug!(key = %key, "Removed document");
                self.broadcast(key, None);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("remove {key}: {e}"))),
        }
    }

    /// Subscribe to this origin's change events.
    ///
    /// The raw receiver still sees this context's own writes; the
    /// [`crate::notifier::ChangeNotifier`] filters them out by origin.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }

    fn broadcast(&self, key: &str, new_value: Option<Value>) {
        if self.change_tx.receiver_count() == 0 {
            return;
        }

        let event = ChangeEvent {
            key: key.to_string(),
            new_value,
            origin: self.id,
        };
        if let Err(e) = self.change_tx.send(event) {
            warn!(key = %key, error = %e, "Failed to broadcast change event");
        }
    }
}
