//! First-run demo data
//!
//! Seeded into a fresh origin when `seed_demo_data` is enabled so the app
//! has accounts and reviews to browse before anyone signs up. Demo password
//! accounts all use "password123"; the provider account is only reachable
//! through provider login; its stored hash is derived from a throwaway
//! random value and verifies no password.

use crate::password::hash_secret;
use crate::reviews::ReviewRecord;
use crate::users::UserRecord;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

pub const DEMO_USER_ARIA: &str = "user-aria";
pub const DEMO_USER_BEN: &str = "user-ben";
pub const DEMO_USER_COLE: &str = "user-cole";
pub const DEMO_USER_PROVIDER: &str = "user-sso-demo";

const DEMO_PASSWORD: &str = "password123";

fn demo_user(id: &str, display_name: &str, email: &str, secret: &str) -> UserRecord {
    let password_hash = hash_secret(secret).unwrap_or_else(|e| {
        // An unusable marker; verification treats it as "no match"
        error!(user_id = %id, error = %e, "Failed to hash demo secret");
        "!".to_string()
    });

    UserRecord {
        id: id.to_string(),
        display_name: display_name.to_string(),
        email: email.to_string(),
        password_hash,
        sso_provider: None,
    }
}

/// Demo accounts, hashed at seed time
pub fn seed_users() -> Vec<UserRecord> {
    let mut users = vec![
        demo_user(DEMO_USER_ARIA, "AriaPlays", "aria@example.com", DEMO_PASSWORD),
        demo_user(DEMO_USER_BEN, "KnightFan", "ben@example.com", DEMO_PASSWORD),
        demo_user(DEMO_USER_COLE, "CozyGamer", "cole@example.com", DEMO_PASSWORD),
    ];

    // Provider-only account: no usable password
    let mut provider = demo_user(
        DEMO_USER_PROVIDER,
        "DemoDrifter",
        "demo@sso.example.com",
        &Uuid::new_v4().to_string(),
    );
    provider.sso_provider = Some("google".to_string());
    users.push(provider);

    users
}

fn demo_review(
    item_id: u64,
    item_name: &str,
    author_id: &str,
    author_name: &str,
    rating: u8,
    comment: &str,
    days_ago: i64,
) -> ReviewRecord {
    ReviewRecord {
        id: format!("rev-{}", Uuid::new_v4()),
        item_id,
        item_name: item_name.to_string(),
        author_id: author_id.to_string(),
        author_name: author_name.to_string(),
        rating,
        comment: comment.to_string(),
        created_at: Utc::now() - Duration::days(days_ago),
    }
}

/// Demo reviews across two catalog items, newest first
pub fn seed_reviews() -> Vec<ReviewRecord> {
    vec![
        demo_review(
            3172,
            "Celeste",
            DEMO_USER_COLE,
            "CozyGamer",
            4,
            "Brutal but fair. Assist mode made the summit reachable for me.",
            2,
        ),
        demo_review(
            4210,
            "Hollow Knight",
            DEMO_USER_BEN,
            "KnightFan",
            5,
            "Hallownest is the best-realized world I've explored in years.",
            3,
        ),
        demo_review(
            4210,
            "Hollow Knight",
            DEMO_USER_ARIA,
            "AriaPlays",
            5,
            "Gorgeous, haunting, and the combat never stops being satisfying.",
            5,
        ),
        demo_review(
            618,
            "Stardew Valley",
            DEMO_USER_ARIA,
            "AriaPlays",
            4,
            "Lost an entire weekend to my farm and I regret nothing.",
            10,
        ),
    ]
}

/// Demo favorites for one account
pub fn seed_favorites() -> HashMap<String, Vec<u64>> {
    let mut favorites = HashMap::new();
    favorites.insert(DEMO_USER_ARIA.to_string(), vec![4210, 3172, 618]);
    favorites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_secret;

    #[test]
    fn test_demo_accounts_verify_demo_password() {
        let users = seed_users();
        assert_eq!(users.len(), 4);

        let aria = users.iter().find(|u| u.id == DEMO_USER_ARIA).unwrap();
        assert!(verify_secret(DEMO_PASSWORD, &aria.password_hash).unwrap());
    }

    #[test]
    fn test_provider_account_rejects_demo_password() {
        let users = seed_users();
        let sso = users.iter().find(|u| u.id == DEMO_USER_PROVIDER).unwrap();

        assert_eq!(sso.sso_provider.as_deref(), Some("google"));
        assert!(!verify_secret(DEMO_PASSWORD, &sso.password_hash).unwrap_or(false));
    }

    #[test]
    fn test_seed_favorites_reference_seeded_user() {
        let users = seed_users();
        for user_id in seed_favorites().keys() {
            assert!(users.iter().any(|u| &u.id == user_id));
        }
    }
}
