//! Identity ledger: user records with credentials
//!
//! Simulates the account backend over the durable store. Credentials are
//! stored as salted Argon2id hashes; plaintext never persists. The ledger
//! keeps no in-process mirror: every operation re-reads the full user
//! snapshot so uniqueness checks and lookups always see the latest
//! cross-context state. Operations suspend for their configured artificial
//! latency to model network-call semantics.
//!
//! Uniqueness at signup is checked against the snapshot read at call time;
//! two contexts signing up concurrently can race and the last write wins.
//! That race is a documented limitation of the single-origin design.

use crate::config::Config;
use crate::error::StoreError;
use crate::password::{hash_secret, verify_secret};
use crate::seed::seed_users;
use crate::store::{StoreContext, USERS_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

/// Persisted user record. Never leaves the ledger with the hash attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    /// Set on accounts that can only sign in through a federated provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_provider: Option<String>,
}

/// Public shape of a user: the record with the credential stripped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

impl From<&UserRecord> for UserProfile {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            email: record.email.clone(),
        }
    }
}

/// User ledger over the durable store
pub struct IdentityLedger {
    ctx: Arc<StoreContext>,
    credential_check: Duration,
    profile_fetch: Duration,
    seed: bool,
}

impl IdentityLedger {
    pub fn new(ctx: Arc<StoreContext>, config: &Config) -> Self {
        Self {
            ctx,
            credential_check: Duration::from_millis(config.latency.credential_check_ms),
            profile_fetch: Duration::from_millis(config.latency.profile_fetch_ms),
            seed: config.seed_demo_data,
        }
    }

    /// Current full snapshot, seeding demo accounts on first access
    fn snapshot(&self) -> Vec<UserRecord> {
        if let Some(users) = self.ctx.read(USERS_KEY) {
            return users;
        }
        let default = if self.seed { seed_users() } else { Vec::new() };
        self.ctx.initialize(USERS_KEY, default)
    }

    /// Verify a claimed secret and return the matching profile
    pub async fn find_by_credentials(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<UserProfile, StoreError> {
        sleep(self.credential_check).await;

        let users = self.snapshot();
        let user = users
            .iter()
            .filter(|u| u.email == email)
            .find(|u| verify_secret(secret, &u.password_hash).unwrap_or(false))
            .ok_or_else(|| StoreError::NotFound("Invalid email or password".to_string()))?;

        info!(user_id = %user.id, "Credential login");
        Ok(user.into())
    }

    /// Look up a profile by identity
    pub async fn find_by_id(&self, id: &str) -> Result<UserProfile, StoreError> {
        sleep(self.profile_fetch).await;

        let users = self.snapshot();
        users
            .iter()
            .find(|u| u.id == id)
            .map(UserProfile::from)
            .ok_or_else(|| StoreError::NotFound(format!("No user with id {id}")))
    }

    /// Resolve the seeded account for a federated provider
    pub async fn find_by_provider(&self, provider: &str) -> Result<UserProfile, StoreError> {
        sleep(self.credential_check).await;

        let users = self.snapshot();
        let user = users
            .iter()
            .find(|u| u.sso_provider.as_deref() == Some(provider))
            .ok_or_else(|| {
                StoreError::NotFound(format!("No account linked to provider {provider}"))
            })?;

        info!(user_id = %user.id, provider = %provider, "Provider login");
        Ok(user.into())
    }

    /// Create an account, enforcing email and display-name uniqueness
    pub async fn create(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
    ) -> Result<UserProfile, StoreError> {
        sleep(self.credential_check).await;

        let mut users = self.snapshot();

        if users.iter().any(|u| u.email == email) {
            warn!(email = %email, "Signup rejected: email taken");
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        if users.iter().any(|u| u.display_name == display_name) {
            warn!(display_name = %display_name, "Signup rejected: display name taken");
            return Err(StoreError::Conflict(
                "This display name is already taken".to_string(),
            ));
        }

        let record = UserRecord {
            id: format!("user-{}", Uuid::new_v4()),
            display_name: display_name.to_string(),
            email: email.to_string(),
            password_hash: hash_secret(secret)?,
            sso_provider: None,
        };
        let profile = UserProfile::from(&record);

        users.push(record);
        self.ctx.write(USERS_KEY, &users)?;

        info!(user_id = %profile.id, "Created account");
        Ok(profile)
    }
}
