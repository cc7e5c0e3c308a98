//! Favorites registry: per-user sets of catalog item ids
//!
//! Persisted as one document mapping user id to a list of item ids with set
//! semantics. Mutations read-modify-write the full registry through this
//! context's mirror and persist before returning, so no partial write is
//! ever visible to the calling context. Reads go straight to the store so a
//! change written by another context is picked up without restarting.

use crate::config::Config;
use crate::error::StoreError;
use crate::seed::seed_favorites;
use crate::store::{StoreContext, FAVORITES_KEY};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::debug;

type FavoritesMap = HashMap<String, Vec<u64>>;

/// Per-user favorite items over the durable store
pub struct FavoritesRegistry {
    ctx: Arc<StoreContext>,
    read_delay: Duration,
    write_delay: Duration,
    seed: bool,
    /// In-context mirror, hydrated from the store on first mutation.
    /// The single write path updates it and the store together.
    mirror: RwLock<Option<FavoritesMap>>,
}

impl FavoritesRegistry {
    pub fn new(ctx: Arc<StoreContext>, config: &Config) -> Self {
        Self {
            ctx,
            read_delay: Duration::from_millis(config.latency.favorites_read_ms),
            write_delay: Duration::from_millis(config.latency.ledger_op_ms),
            seed: config.seed_demo_data,
            mirror: RwLock::new(None),
        }
    }

    fn load(&self) -> FavoritesMap {
        if let Some(map) = self.ctx.read(FAVORITES_KEY) {
            return map;
        }
        let default = if self.seed {
            seed_favorites()
        } else {
            FavoritesMap::new()
        };
        self.ctx.initialize(FAVORITES_KEY, default)
    }

    /// A user's current favorites (empty if none recorded)
    pub async fn list(&self, user_id: &str) -> Vec<u64> {
        sleep(self.read_delay).await;

        self.load().get(user_id).cloned().unwrap_or_default()
    }

    /// Add an item to a user's set. Idempotent: adding a present item is a
    /// no-op. Returns the confirmed set.
    pub async fn add(&self, user_id: &str, item_id: u64) -> Result<Vec<u64>, StoreError> {
        sleep(self.write_delay).await;

        let mut guard = self.mirror.write().await;
        let map = self.hydrate(&mut guard);

        let entry = map.entry(user_id.to_string()).or_default();
        if !entry.contains(&item_id) {
            entry.push(item_id);
        }
        let current = entry.clone();

        self.ctx.write(FAVORITES_KEY, &*map)?;
        debug!(user_id = %user_id, item_id, count = current.len(), "Added favorite");
        Ok(current)
    }

    /// Remove an item from a user's set. Idempotent: removing an absent item
    /// is a no-op. Returns the confirmed set.
    pub async fn remove(&self, user_id: &str, item_id: u64) -> Result<Vec<u64>, StoreError> {
        sleep(self.write_delay).await;

        let mut guard = self.mirror.write().await;
        let map = self.hydrate(&mut guard);

        let current = match map.get_mut(user_id) {
            Some(entry) => {
                entry.retain(|id| *id != item_id);
                let current = entry.clone();
                if current.is_empty() {
                    // Entries with zero favorites need not exist
                    map.remove(user_id);
                }
                current
            }
            None => Vec::new(),
        };

        self.ctx.write(FAVORITES_KEY, &*map)?;
        debug!(user_id = %user_id, item_id, count = current.len(), "Removed favorite");
        Ok(current)
    }

    fn hydrate<'a>(&self, guard: &'a mut Option<FavoritesMap>) -> &'a mut FavoritesMap {
        guard.get_or_insert_with(|| self.load())
    }
}
