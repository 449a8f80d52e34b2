//! Roster Core - authorization model and points ledger
//!
//! This crate provides the integrity core of the Roster unit management system,
//! including:
//! - Permissions: the closed token catalog, tier table and normalization
//! - Auth: allow/deny decisions for administrative and point-granting actions
//! - Identity: signed session tokens and the lifecycle gate
//! - Ledger: merit/demerit grants, decisions, redemptions and balances
//! - Roster: sign-up, sign-in and actor administration
//! - Store: the persistence trait with SQLite and in-memory backends
//! - Reply: the `{ message, ...payload }` envelope every operation reports through

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod auth;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod messages;
pub mod password;
pub mod permissions;
pub mod reply;
pub mod roster;
pub mod store;

pub use actor::{Actor, ActorStatus, ActorSummary, Role, StatusChange};
pub use auth::{Decision, LARGE_POINT_THRESHOLD};
pub use error::{format_error_for_cli, Error, ErrorKind, Result};
pub use identity::{require_active, Claims, Identity, IdentityError, DEFAULT_TOKEN_TTL_SECS};
pub use ledger::{
    check_point_range, parse_point_value, Grant, GrantDecision, GrantRequest, GrantStatus, Ledger,
    PointBalance, PointSummary, PointTemplate, Redemption, MAX_POINT_VALUE,
};
pub use permissions::{Permission, PermissionError, PermissionSet};
pub use reply::Reply;
pub use roster::{Roster, Session, SignUp};
pub use store::{MemoryStore, SqliteStore, Store, StoreError};
