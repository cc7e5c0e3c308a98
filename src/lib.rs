//! GameShelf store core: local persistence and cross-context sync
//!
//! Simulates the shared backend of a catalog/review app (users, favorites,
//! reviews) entirely inside durable local storage, exposed through an async
//! service API that models network latency, with change events propagating
//! between execution contexts sharing the same storage origin.
//!
//! ## Architecture
//!
//! ```text
//! AccountSession ──► IdentityLedger ◄── SessionIssuer
//!      │
//!      ├──► FavoritesRegistry ─┐
//!      └──► ReviewLedger ──────┤
//!                              ▼
//!                        StoreContext ──► origin dir (JSON documents)
//!                              │
//!                              └─► change broadcast ──► ChangeNotifier
//!                                                       (other contexts)
//! ```
//!
//! Contexts model browser tabs: each is internally single-threaded
//! cooperative and coordinates with the others only through the documents
//! and the change broadcast. Concurrent writers to the same document race
//! and the last writer wins; that is an accepted property of the design,
//! not something the ledgers try to repair.

pub mod account;
pub mod config;
pub mod error;
pub mod favorites;
pub mod notifier;
pub mod password;
pub mod reviews;
pub mod seed;
pub mod session;
pub mod store;
pub mod users;

// Re-exports
pub use account::{AccountSession, Principal};
pub use config::{Config, LatencyProfile};
pub use error::{Result, StoreError};
pub use favorites::FavoritesRegistry;
pub use notifier::{spawn_notifier, ChangeNotifier, RefreshCallback};
pub use reviews::{ReviewDraft, ReviewLedger, ReviewRecord};
pub use session::{Claims, SessionIssuer};
pub use store::{
    ChangeEvent, ContextId, DurableStore, StoreContext, FAVORITES_KEY, REVIEWS_KEY, SESSION_KEY,
    USERS_KEY,
};
pub use users::{IdentityLedger, UserProfile, UserRecord};
