//! Account session: the authenticated principal for one context
//!
//! Orchestrates the ledgers the way the app shell does. Only the session
//! token is ever persisted; profile and favorites are re-derived from the
//! ledgers on login and restore. Ledger-confirmed return values are the
//! single source of truth merged into the in-memory state; the session
//! never guesses the outcome of a mutation.
//!
//! This is also where review authorization lives: the review ledger itself
//! is authorization-agnostic, and only-the-author enforcement for edits and
//! deletes happens here.

use crate::error::StoreError;
use crate::favorites::FavoritesRegistry;
use crate::reviews::{ReviewDraft, ReviewLedger, ReviewRecord};
use crate::session::SessionIssuer;
use crate::store::{StoreContext, SESSION_KEY};
use crate::users::{IdentityLedger, UserProfile};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The signed-in user as this context sees them
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub profile: UserProfile,
    pub favorites: Vec<u64>,
}

/// Per-context session over the ledgers
pub struct AccountSession {
    ctx: Arc<StoreContext>,
    users: Arc<IdentityLedger>,
    favorites: Arc<FavoritesRegistry>,
    reviews: Arc<ReviewLedger>,
    issuer: SessionIssuer,
    state: RwLock<Option<Principal>>,
}

impl AccountSession {
    pub fn new(
        ctx: Arc<StoreContext>,
        users: Arc<IdentityLedger>,
        favorites: Arc<FavoritesRegistry>,
        reviews: Arc<ReviewLedger>,
        issuer: SessionIssuer,
    ) -> Self {
        Self {
            ctx,
            users,
            favorites,
            reviews,
            issuer,
            state: RwLock::new(None),
        }
    }

    /// The signed-in principal, if any
    pub async fn current(&self) -> Option<Principal> {
        self.state.read().await.clone()
    }

    pub async fn is_favorite(&self, item_id: u64) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .map(|p| p.favorites.contains(&item_id))
            .unwrap_or(false)
    }

    /// Sign in with email and secret
    pub async fn login(&self, email: &str, secret: &str) -> Result<Principal, StoreError> {
        let profile = self.users.find_by_credentials(email, secret).await?;
        let favorites = self.favorites.list(&profile.id).await;
        self.establish(profile, favorites).await
    }

    /// Sign in through a federated provider's seeded account
    pub async fn login_with_provider(&self, provider: &str) -> Result<Principal, StoreError> {
        let profile = self.users.find_by_provider(provider).await?;
        let favorites = self.favorites.list(&profile.id).await;
        self.establish(profile, favorites).await
    }

    /// Create an account and sign in. Fresh accounts start with no
    /// favorites, so no fetch is needed.
    pub async fn signup(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
    ) -> Result<Principal, StoreError> {
        let profile = self.users.create(display_name, email, secret).await?;
        self.establish(profile, Vec::new()).await
    }

    /// Rebuild the session from the persisted token, if any.
    ///
    /// The profile resolves first, then favorites keyed by the resolved
    /// identity. The favorites lookup depends on a value unknown until the
    /// profile fetch completes, so the two are sequenced, not raced. A token
    /// that no longer resolves is cleared and the session stays signed out.
    pub async fn restore(&self) -> Result<Option<Principal>, StoreError> {
        let Some(token) = self.ctx.read::<String>(SESSION_KEY) else {
            return Ok(None);
        };

        match self.issuer.resolve(&token, &self.users).await {
            Ok(profile) => {
                let favorites = self.favorites.list(&profile.id).await;
                let principal = Principal { profile, favorites };
                *self.state.write().await = Some(principal.clone());
                info!(user_id = %principal.profile.id, "Restored session");
                Ok(Some(principal))
            }
            Err(e) => {
                warn!(error = %e, "Session restore failed, clearing stored token");
                self.ctx.remove(SESSION_KEY)?;
                *self.state.write().await = None;
                Ok(None)
            }
        }
    }

    /// Sign out: drop the in-memory principal and the persisted token
    pub async fn logout(&self) -> Result<(), StoreError> {
        *self.state.write().await = None;
        self.ctx.remove(SESSION_KEY)?;
        info!("Signed out");
        Ok(())
    }

    /// Flip an item's favorite status and merge the registry's confirmed set
    pub async fn toggle_favorite(&self, item_id: u64) -> Result<Vec<u64>, StoreError> {
        let (user_id, currently) = {
            let state = self.state.read().await;
            let principal = state
                .as_ref()
                .ok_or_else(|| StoreError::Auth("Not signed in".to_string()))?;
            (
                principal.profile.id.clone(),
                principal.favorites.contains(&item_id),
            )
        };

        let confirmed = if currently {
            self.favorites.remove(&user_id, item_id).await?
        } else {
            self.favorites.add(&user_id, item_id).await?
        };

        if let Some(principal) = self.state.write().await.as_mut() {
            principal.favorites = confirmed.clone();
        }
        Ok(confirmed)
    }

    /// Post a review as the signed-in user
    pub async fn post_review(
        &self,
        item_id: u64,
        item_name: &str,
        rating: u8,
        comment: &str,
    ) -> Result<ReviewRecord, StoreError> {
        let profile = self.require_signed_in().await?;

        self.reviews
            .create(ReviewDraft {
                item_id,
                item_name: item_name.to_string(),
                author_id: profile.id,
                author_name: profile.display_name,
                rating,
                comment: comment.to_string(),
            })
            .await
    }

    /// Edit a review; only its author may
    pub async fn update_review(
        &self,
        review_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<ReviewRecord, StoreError> {
        let profile = self.require_signed_in().await?;

        let existing = self
            .reviews
            .get(review_id)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("No review with id {review_id}")))?;
        if existing.author_id != profile.id {
            return Err(StoreError::Forbidden(
                "Only the author may edit a review".to_string(),
            ));
        }

        self.reviews.update(review_id, rating, comment).await
    }

    /// Delete a review; only its author may. Absent ids are success.
    pub async fn delete_review(&self, review_id: &str) -> Result<(), StoreError> {
        let profile = self.require_signed_in().await?;

        let Some(existing) = self.reviews.get(review_id).await else {
            return Ok(());
        };
        if existing.author_id != profile.id {
            return Err(StoreError::Forbidden(
                "Only the author may delete a review".to_string(),
            ));
        }

        self.reviews.delete(review_id).await
    }

    async fn require_signed_in(&self) -> Result<UserProfile, StoreError> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|p| p.profile.clone())
            .ok_or_else(|| StoreError::Auth("Not signed in".to_string()))
    }

    async fn establish(
        &self,
        profile: UserProfile,
        favorites: Vec<u64>,
    ) -> Result<Principal, StoreError> {
        let token = self.issuer.issue(&profile)?;
        // Only the token persists; everything else re-derives from the ledgers
        self.ctx.write(SESSION_KEY, &token)?;

        let principal = Principal { profile, favorites };
        *self.state.write().await = Some(principal.clone());
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::DurableStore;
    use tempfile::TempDir;

    fn session_over(dir: &TempDir) -> AccountSession {
        let config = Config::for_test(dir.path());
        let store = DurableStore::open(&config).unwrap();
        let ctx = store.context();
        AccountSession::new(
            ctx.clone(),
            Arc::new(IdentityLedger::new(ctx.clone(), &config)),
            Arc::new(FavoritesRegistry::new(ctx.clone(), &config)),
            Arc::new(ReviewLedger::new(ctx.clone(), &config)),
            SessionIssuer::from_config(&config).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_signup_signs_in_with_empty_favorites() {
        let dir = TempDir::new().unwrap();
        let session = session_over(&dir);

        let principal = session.signup("Nova", "nova@x.com", "secret1").await.unwrap();
        assert_eq!(principal.profile.display_name, "Nova");
        assert!(principal.favorites.is_empty());
        assert_eq!(session.current().await, Some(principal));
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_state() {
        let dir = TempDir::new().unwrap();
        let session = session_over(&dir);

        session.signup("Nova", "nova@x.com", "secret1").await.unwrap();
        session.logout().await.unwrap();

        assert_eq!(session.current().await, None);
        assert_eq!(session.restore().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_in_fresh_context() {
        let dir = TempDir::new().unwrap();

        let first = session_over(&dir);
        first.signup("Nova", "nova@x.com", "secret1").await.unwrap();
        first.toggle_favorite(42).await.unwrap();

        // A new context over the same origin picks the session back up
        let second = session_over(&dir);
        let principal = second.restore().await.unwrap().unwrap();
        assert_eq!(principal.profile.display_name, "Nova");
        assert_eq!(principal.favorites, vec![42]);
    }

    #[tokio::test]
    async fn test_restore_with_corrupt_token_signs_out() {
        let dir = TempDir::new().unwrap();
        let session = session_over(&dir);

        session.ctx.write(SESSION_KEY, &"garbage".to_string()).unwrap();

        assert_eq!(session.restore().await.unwrap(), None);
        // The dead token was removed
        assert_eq!(session.ctx.read::<String>(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn test_toggle_merges_confirmed_set() {
        let dir = TempDir::new().unwrap();
        let session = session_over(&dir);
        session.signup("Nova", "nova@x.com", "secret1").await.unwrap();

        assert!(!session.is_favorite(42).await);
        assert_eq!(session.toggle_favorite(42).await.unwrap(), vec![42]);
        assert!(session.is_favorite(42).await);
        assert!(session.toggle_favorite(42).await.unwrap().is_empty());
        assert!(!session.is_favorite(42).await);
    }

    #[tokio::test]
    async fn test_toggle_requires_sign_in() {
        let dir = TempDir::new().unwrap();
        let session = session_over(&dir);

        assert!(matches!(
            session.toggle_favorite(42).await,
            Err(StoreError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_may_edit_or_delete() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_test(dir.path());
        let store = DurableStore::open(&config).unwrap();
        let ctx = store.context();
        let users = Arc::new(IdentityLedger::new(ctx.clone(), &config));
        let favorites = Arc::new(FavoritesRegistry::new(ctx.clone(), &config));
        let reviews = Arc::new(ReviewLedger::new(ctx.clone(), &config));
        let issuer = SessionIssuer::from_config(&config).unwrap();

        let author = AccountSession::new(
            ctx.clone(),
            users.clone(),
            favorites.clone(),
            reviews.clone(),
            issuer.clone(),
        );
        let intruder = AccountSession::new(ctx.clone(), users, favorites, reviews.clone(), issuer);

        author.signup("Nova", "nova@x.com", "secret1").await.unwrap();
        let review = author.post_review(42, "Hollow Knight", 5, "Great").await.unwrap();

        intruder.signup("Mallory", "mal@x.com", "secret2").await.unwrap();
        assert!(matches!(
            intruder.update_review(&review.id, 1, "ruined").await,
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            intruder.delete_review(&review.id).await,
            Err(StoreError::Forbidden(_))
        ));

        // The ledger is untouched
        assert_eq!(reviews.list_by_item(42).await, vec![review.clone()]);

        // The author can do both
        author.update_review(&review.id, 4, "Still great").await.unwrap();
        author.delete_review(&review.id).await.unwrap();
        assert!(reviews.list_by_item(42).await.is_empty());

        // Deleting an absent review is fine even through the session
        author.delete_review(&review.id).await.unwrap();
    }
}
