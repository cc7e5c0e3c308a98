//! Review ledger: create, list, update and delete review records
//!
//! Records are stored newest-first in a single document; storage order is
//! not a contract; callers sort by `created_at` for display. List
//! operations read straight from the store so reviews posted by another
//! context are visible without restarting; mutations go through this
//! context's mirror and persist before returning.
//!
//! The ledger is authorization-agnostic: only-the-author enforcement for
//! update/delete lives in the account layer.

use crate::config::Config;
use crate::error::StoreError;
use crate::seed::seed_reviews;
use crate::store::{StoreContext, REVIEWS_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// A posted review. `item_name` and `author_name` are snapshots captured at
/// creation time; they never update retroactively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    pub item_id: u64,
    pub item_name: String,
    pub author_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new review; the ledger assigns identity and
/// timestamp
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub item_id: u64,
    pub item_name: String,
    pub author_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
}

fn validate_rating(rating: u8) -> Result<(), StoreError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::InvalidRating(rating))
    }
}

/// Review ledger over the durable store
pub struct ReviewLedger {
    ctx: Arc<StoreContext>,
    op_delay: Duration,
    seed: bool,
    /// In-context mirror, hydrated from the store on first mutation.
    /// The single write path updates it and the store together.
    mirror: RwLock<Option<Vec<ReviewRecord>>>,
}

impl ReviewLedger {
    pub fn new(ctx: Arc<StoreContext>, config: &Config) -> Self {
        Self {
            ctx,
            op_delay: Duration::from_millis(config.latency.ledger_op_ms),
            seed: config.seed_demo_data,
            mirror: RwLock::new(None),
        }
    }

    fn load(&self) -> Vec<ReviewRecord> {
        if let Some(reviews) = self.ctx.read(REVIEWS_KEY) {
            return reviews;
        }
        let default = if self.seed {
            seed_reviews()
        } else {
            Vec::new()
        };
        self.ctx.initialize(REVIEWS_KEY, default)
    }

    /// All reviews for a catalog item, in storage order
    pub async fn list_by_item(&self, item_id: u64) -> Vec<ReviewRecord> {
        sleep(self.op_delay).await;

        self.load()
            .into_iter()
            .filter(|r| r.item_id == item_id)
            .collect()
    }

    /// All reviews by an author, in storage order
    pub async fn list_by_author(&self, author_id: &str) -> Vec<ReviewRecord> {
        sleep(self.op_delay).await;

        self.load()
            .into_iter()
            .filter(|r| r.author_id == author_id)
            .collect()
    }

    /// One review by identity, if present
    pub async fn get(&self, id: &str) -> Option<ReviewRecord> {
        sleep(self.op_delay).await;

        self.load().into_iter().find(|r| r.id == id)
    }

    /// Post a review: assigns a fresh identity and timestamp, prepends, and
    /// returns the stored record, the value callers merge as confirmed
    /// truth.
    pub async fn create(&self, draft: ReviewDraft) -> Result<ReviewRecord, StoreError> {
        validate_rating(draft.rating)?;
        sleep(self.op_delay).await;

        let record = ReviewRecord {
            id: format!("rev-{}", Uuid::new_v4()),
            item_id: draft.item_id,
            item_name: draft.item_name,
            author_id: draft.author_id,
            author_name: draft.author_name,
            rating: draft.rating,
            comment: draft.comment,
            created_at: Utc::now(),
        };

        let mut guard = self.mirror.write().await;
        let reviews = self.hydrate(&mut guard);
        reviews.insert(0, record.clone());
        self.ctx.write(REVIEWS_KEY, &*reviews)?;

        info!(review_id = %record.id, item_id = record.item_id, "Posted review");
        Ok(record)
    }

    /// Update the two mutable fields of a review
    pub async fn update(
        &self,
        id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<ReviewRecord, StoreError> {
        validate_rating(rating)?;
        sleep(self.op_delay).await;

        let mut guard = self.mirror.write().await;
        let reviews = self.hydrate(&mut guard);

        let record = reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("No review with id {id}")))?;

        record.rating = rating;
        record.comment = comment.to_string();
        let updated = record.clone();

        self.ctx.write(REVIEWS_KEY, &*reviews)?;

        info!(review_id = %id, "Updated review");
        Ok(updated)
    }

    /// Delete a review. Idempotent: an absent identity is success.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sleep(self.op_delay).await;

        let mut guard = self.mirror.write().await;
        let reviews = self.hydrate(&mut guard);

        let before = reviews.len();
        reviews.retain(|r| r.id != id);
        if reviews.len() == before {
            debug!(review_id = %id, "Delete of absent review, nothing to do");
            return Ok(());
        }

        self.ctx.write(REVIEWS_KEY, &*reviews)?;

        info!(review_id = %id, "Deleted review");
        Ok(())
    }

    fn hydrate<'a>(&self, guard: &'a mut Option<Vec<ReviewRecord>>) -> &'a mut Vec<ReviewRecord> {
        guard.get_or_insert_with(|| self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DurableStore;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir) -> ReviewLedger {
        let config = Config::for_test(dir.path());
        let store = DurableStore::open(&config).unwrap();
        ReviewLedger::new(store.context(), &config)
    }

    fn draft(item_id: u64, rating: u8) -> ReviewDraft {
        ReviewDraft {
            item_id,
            item_name: "Hollow Knight".to_string(),
            author_id: "u1".to_string(),
            author_name: "Nova".to_string(),
            rating,
            comment: "Stunning".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_round_trip() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        let created = reviews.create(draft(42, 5)).await.unwrap();
        assert!(!created.id.is_empty());

        let listed = reviews.list_by_item(42).await;
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(listed[0].rating, 5);
        assert_eq!(listed[0].comment, "Stunning");

        assert!(reviews.list_by_item(999).await.is_empty());
        assert_eq!(reviews.list_by_author("u1").await, vec![created]);
    }

    #[tokio::test]
    async fn test_newest_first_storage_order() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        let first = reviews.create(draft(42, 4)).await.unwrap();
        let second = reviews.create(draft(42, 5)).await.unwrap();

        let listed = reviews.list_by_item(42).await;
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_touches_only_mutable_fields() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        let created = reviews.create(draft(42, 5)).await.unwrap();
        let updated = reviews.update(&created.id, 3, "Changed my mind").await.unwrap();

        assert_eq!(updated.rating, 3);
        assert_eq!(updated.comment, "Changed my mind");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.item_name, created.item_name);
        assert_eq!(updated.author_id, created.author_id);
        assert_eq!(updated.created_at, created.created_at);

        let refetched = reviews.list_by_item(42).await;
        assert_eq!(refetched, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        let err = reviews.update("rev-ghost", 3, "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        let created = reviews.create(draft(42, 5)).await.unwrap();
        reviews.delete(&created.id).await.unwrap();
        assert!(reviews.list_by_item(42).await.is_empty());

        // Deleting again (or a never-existing id) still succeeds
        reviews.delete(&created.id).await.unwrap();
        reviews.delete("rev-ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_rating_range_enforced() {
        let dir = TempDir::new().unwrap();
        let reviews = ledger(&dir);

        assert!(matches!(
            reviews.create(draft(42, 0)).await,
            Err(StoreError::InvalidRating(0))
        ));
        assert!(matches!(
            reviews.create(draft(42, 6)).await,
            Err(StoreError::InvalidRating(6))
        ));

        let created = reviews.create(draft(42, 1)).await.unwrap();
        assert!(matches!(
            reviews.update(&created.id, 9, "no").await,
            Err(StoreError::InvalidRating(9))
        ));
    }

    #[tokio::test]
    async fn test_reads_see_other_context_writes() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_test(dir.path());
        let store = DurableStore::open(&config).unwrap();

        let ledger_a = ReviewLedger::new(store.context(), &config);
        let ledger_b = ReviewLedger::new(store.context(), &config);

        // Hydrate B's view first, then post from A
        assert!(ledger_b.list_by_item(42).await.is_empty());
        let created = ledger_a.create(draft(42, 5)).await.unwrap();

        // B re-reads from the store, not from a stale cache
        assert_eq!(ledger_b.list_by_item(42).await, vec![created]);
    }
}
