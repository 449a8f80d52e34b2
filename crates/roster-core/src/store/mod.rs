//! Storage collaborator
//!
//! The ledger and roster services only talk to persistence through the `Store`
//! trait. Two backends implement it:
//!
//! - `SqliteStore` - the production backend
//! - `MemoryStore` - in-process tables for tests and local experiments
//!
//! Every mutation that guards an invariant is a single conditional unit in the
//! backend itself: grant decisions and pending deletions only touch undecided
//! rows, and a redemption is inserted only if the balance still covers it. A
//! guard that does not hold is reported as `StoreError::Conflict`.

mod memory;
mod sqlite;


pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::actor::{Actor, Role, StatusChange};
use crate::ledger::{Grant, GrantDecision, PointTemplate, Redemption};
use crate::permissions::PermissionSet;

/// Storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional mutation found the record in a state that forbids it
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend-level failure (corrupt row, I/O, ...)
    #[error("backend error: {0}")]
    Backend(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Which half of the grants to aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Merit: positive values
    Positive,
    /// Demerit: negative values, summed as magnitudes
    Negative,
}

/// Lifecycle filter for actor listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorScope {
    /// Every actor, deleted included
    #[default]
    Any,
    /// Neither verified nor rejected, not deleted
    Pending,
    /// Verified or rejected
    Decided,
    /// Verified and not deleted
    Active,
}

/// Actor listing query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorQuery {
    /// Exact service number or name substring
    pub text: Option<String>,
    /// Restrict to one role
    pub role: Option<Role>,
    /// Lifecycle filter
    pub scope: ActorScope,
    /// Page size; `None` returns everything
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: u32,
}

/// Grant listing query, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantQuery {
    /// Restrict to grants given by this actor
    pub giver_sn: Option<String>,
    /// Restrict to grants received by this actor
    pub receiver_sn: Option<String>,
    /// Only undecided grants
    pub pending_only: bool,
    /// Page size; `None` returns everything
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: u32,
}

/// Persistence operations used by the core
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the schema if needed
    async fn migrate(&self) -> StoreResult<()>;

    /// Cheap round-trip to the backend
    async fn health_check(&self) -> StoreResult<()>;

    /// Load an actor; `NotFound` if absent
    async fn get_actor(&self, sn: &str) -> StoreResult<Actor>;

    /// Insert a new actor with its password hash; `Conflict` if the `sn` is taken
    async fn insert_actor(&self, actor: &Actor, password_hash: &str) -> StoreResult<()>;

    /// Apply a lifecycle change and return the updated actor
    async fn upsert_actor_status(
        &self,
        sn: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StoreResult<Actor>;

    /// Replace the actor's permission set in one transaction
    async fn replace_permissions(&self, sn: &str, permissions: &PermissionSet) -> StoreResult<()>;

    /// Stored password hash of an actor
    async fn password_hash(&self, sn: &str) -> StoreResult<String>;

    /// Overwrite the stored password hash
    async fn set_password_hash(&self, sn: &str, password_hash: &str) -> StoreResult<()>;

    /// List actors ordered by service number
    async fn list_actors(&self, query: &ActorQuery) -> StoreResult<Vec<Actor>>;

    /// Load a grant; `NotFound` if absent
    async fn get_grant(&self, id: Uuid) -> StoreResult<Grant>;

    /// Insert a grant as given
    async fn insert_grant(&self, grant: &Grant) -> StoreResult<()>;

    /// Decide a pending grant; `Conflict` if it was already decided
    async fn update_grant_decision(
        &self,
        id: Uuid,
        decision: &GrantDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Grant>;

    /// Delete a pending grant; `Conflict` if it was already decided
    async fn delete_grant(&self, id: Uuid) -> StoreResult<()>;

    /// List grants, newest first
    async fn list_grants(&self, query: &GrantQuery) -> StoreResult<Vec<Grant>>;

    /// Insert a redemption iff the user's available balance covers it;
    /// `Conflict` otherwise
    async fn insert_redemption(&self, redemption: &Redemption) -> StoreResult<()>;

    /// Redemptions debited from an actor, newest first
    async fn list_redemptions(&self, user_sn: &str) -> StoreResult<Vec<Redemption>>;

    /// Sum of verified grant magnitudes received by an actor with the given sign
    async fn sum_grants(&self, sn: &str, sign: Sign) -> StoreResult<i64>;

    /// Sum of redemptions debited from an actor
    async fn sum_redemptions(&self, sn: &str) -> StoreResult<i64>;

    /// Point templates, unit-independent ones first, then by unit and reason
    async fn list_point_templates(&self) -> StoreResult<Vec<PointTemplate>>;

    /// Insert a point template
    async fn insert_point_template(&self, template: &PointTemplate) -> StoreResult<()>;
}
