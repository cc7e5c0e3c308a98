//! Session token issuing and resolution
//!
//! Tokens are HS256 JWTs binding a session to a user identity. They carry
//! no expiry by design: validity means "decodable to an existing user
//! record", and revocation is the holding context deleting its token. A
//! fresh nonce per issuance keeps repeated logins for the same user from
//! ever colliding.

use crate::config::Config;
use crate::error::StoreError;
use crate::users::{IdentityLedger, UserProfile};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// Payload carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User identity the token was issued to
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Per-issuance nonce
    pub jti: String,
}

/// Issues and decodes session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
}

impl SessionIssuer {
    /// Create an issuer; the secret must be at least 32 characters
    pub fn new(secret: impl Into<String>) -> Result<Self, StoreError> {
        let secret = secret.into();
        if secret.len() < 32 {
            return Err(StoreError::Config(
                "session secret must be at least 32 characters".to_string(),
            ));
        }
        Ok(Self { secret })
    }

    /// Create an issuer from the configured secret
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(config.session_secret.clone())
    }

    /// Issue a token for an authenticated user
    pub fn issue(&self, user: &UserProfile) -> Result<String, StoreError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Internal(format!("System time error: {e}")))?
            .as_secs();

        let claims = Claims {
            sub: user.id.clone(),
            iat,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| StoreError::Auth(format!("Failed to issue token: {e}")))?;

        debug!(user_id = %user.id, "Issued session token");
        Ok(token)
    }

    /// Decode a token into its claims
    pub fn decode(&self, token: &str) -> Result<Claims, StoreError> {
        // Tokens never expire; don't require or validate exp
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| StoreError::MalformedToken(e.to_string()))
    }

    /// Decode a token and look its identity up in the ledger.
    ///
    /// Fails with [`StoreError::MalformedToken`] on an undecodable token and
    /// [`StoreError::NotFound`] when the identity no longer exists (for
    /// example after the backing store was cleared by hand).
    pub async fn resolve(
        &self,
        token: &str,
        users: &IdentityLedger,
    ) -> Result<UserProfile, StoreError> {
        let claims = self.decode(token)?;

        users.find_by_id(&claims.sub).await.map_err(|_| {
            StoreError::NotFound("Invalid token: user no longer exists".to_string())
        })
    }
}
