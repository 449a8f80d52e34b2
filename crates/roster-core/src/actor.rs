//! Actor - a registered person on the roster
//!
//! An actor is identified by their service number (`sn`), carries a role tag and a
//! permission set, and moves through a soft lifecycle: pending → verified or
//! rejected, and optionally soft-deleted. Actors are never physically removed.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::messages;
use crate::permissions::PermissionSet;

static SN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}-\d{5,8}$").expect("SN_PATTERN is a compile-time constant")
});

const MAX_PASSWORD_CHARS: usize = 30;
const MAX_NAME_CHARS: usize = 5;

/// Role tag of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Enlisted soldier: receives points, requests grants
    Enlisted,
    /// Cadre (non-commissioned officer): awards and approves points
    #[serde(alias = "nco")]
    Cadre,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Enlisted => "enlisted",
            Role::Cadre => "cadre",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "enlisted" => Ok(Role::Enlisted),
            "cadre" | "nco" => Ok(Role::Cadre),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Derived lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    /// Neither verified nor rejected yet
    Pending,
    /// Sign-up approved
    Verified,
    /// Sign-up rejected
    Rejected,
    /// Soft-deleted
    Deleted,
}

/// A registered person and everything the authorization model needs about them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Service number, unique
    pub sn: String,
    /// Display name
    pub name: String,
    /// Role tag
    pub role: Role,
    /// Canonical permission set
    pub permissions: PermissionSet,
    /// When the sign-up was approved
    pub verified_at: Option<DateTime<Utc>>,
    /// When the sign-up was rejected
    pub rejected_at: Option<DateTime<Utc>>,
    /// When the actor was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Actor {
    /// Create a pending actor with no permissions
    pub fn new(sn: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            sn: sn.into(),
            name: name.into(),
            role,
            permissions: PermissionSet::new(),
            verified_at: None,
            rejected_at: None,
            deleted_at: None,
        }
    }

    /// Set the permission set
    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Mark as verified now
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verified_at = Some(Utc::now());
        self.rejected_at = None;
        self
    }

    /// Current lifecycle state; deletion takes precedence over the review outcome
    pub fn status(&self) -> ActorStatus {
        if self.deleted_at.is_some() {
            ActorStatus::Deleted
        } else if self.rejected_at.is_some() {
            ActorStatus::Rejected
        } else if self.verified_at.is_some() {
            ActorStatus::Verified
        } else {
            ActorStatus::Pending
        }
    }

    /// Whether the actor is enlisted
    pub fn is_enlisted(&self) -> bool {
        self.role == Role::Enlisted
    }

    /// Whether the actor is cadre
    pub fn is_cadre(&self) -> bool {
        self.role == Role::Cadre
    }

    /// Short listing form
    pub fn summary(&self) -> ActorSummary {
        ActorSummary {
            sn: self.sn.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Listing row: enough to render a name and pick a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSummary {
    /// Service number
    pub sn: String,
    /// Display name
    pub name: String,
    /// Role tag
    #[serde(rename = "type")]
    pub role: Role,
}

/// Lifecycle mutation applied by `Store::upsert_actor_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Approve the sign-up (clears any rejection)
    Verify,
    /// Reject the sign-up (clears any verification)
    Reject,
    /// Soft-delete
    Delete,
    /// Undo a soft delete
    Restore,
}

/// Validate a service number (`NN-NNNNN` to `NN-NNNNNNNN`)
pub fn validate_sn(sn: &str) -> Result<()> {
    if SN_PATTERN.is_match(sn.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(messages::INVALID_SN))
    }
}

/// Validate a display name (1 to 5 characters after trimming)
pub fn validate_name(name: &str) -> Result<()> {
    let count = name.trim().chars().count();
    if count < 1 {
        Err(Error::Validation(messages::NAME_TOO_SHORT))
    } else if count > MAX_NAME_CHARS {
        Err(Error::Validation(messages::NAME_TOO_LONG))
    } else {
        Ok(())
    }
}

/// Validate a password (1 to 30 characters after trimming)
pub fn validate_password(password: &str) -> Result<()> {
    let count = password.trim().chars().count();
    if count < 1 {
        Err(Error::Validation(messages::PASSWORD_TOO_SHORT))
    } else if count > MAX_PASSWORD_CHARS {
        Err(Error::Validation(messages::PASSWORD_TOO_LONG))
    } else {
        Ok(())
    }
}
