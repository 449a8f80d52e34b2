//! Identity resolution
//!
//! Actors authenticate with a signed session credential (HS512 JWT) that carries
//! everything the authorization model needs. A resolved token is trusted for the
//! duration of one operation without re-querying storage; `refresh_token` on the
//! roster service re-issues it after permission or lifecycle changes.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::actor::{Actor, ActorStatus, Role};
use crate::error::{Error, Result};
use crate::messages;
use crate::permissions::PermissionSet;

const ALGORITHM: Algorithm = Algorithm::HS512;
const RECOMMENDED_SECRET_BYTES: usize = 32;

/// Default token lifetime (one hour)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Credential and password infrastructure failure
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Signing secret is empty
    #[error("JWT secret is not configured")]
    MissingSecret,

    /// Token could not be signed
    #[error("failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Password could not be hashed or the stored hash is malformed
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Service number
    pub sub: String,
    /// Display name
    pub name: String,
    /// Role tag
    pub role: Role,
    /// Sign-up approval time
    pub verified_at: Option<DateTime<Utc>>,
    /// Sign-up rejection time
    pub rejected_at: Option<DateTime<Utc>>,
    /// Soft-deletion time
    pub deleted_at: Option<DateTime<Utc>>,
    /// Canonical permission set
    pub permissions: PermissionSet,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl Claims {
    fn for_actor(actor: &Actor, issued_at: i64, ttl_secs: i64) -> Self {
        Self {
            sub: actor.sn.clone(),
            name: actor.name.clone(),
            role: actor.role,
            verified_at: actor.verified_at,
            rejected_at: actor.rejected_at,
            deleted_at: actor.deleted_at,
            permissions: actor.permissions.clone(),
            iat: issued_at,
            exp: issued_at + ttl_secs,
        }
    }

    fn into_actor(self) -> Actor {
        Actor {
            sn: self.sub,
            name: self.name,
            role: self.role,
            permissions: self.permissions,
            verified_at: self.verified_at,
            rejected_at: self.rejected_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Issues and resolves session tokens
#[derive(Clone)]
pub struct Identity {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Create an identity service signing with `secret`
    pub fn new(secret: &str, ttl_secs: i64) -> std::result::Result<Self, IdentityError> {
        if secret.is_empty() {
            return Err(IdentityError::MissingSecret);
        }
        if secret.len() < RECOMMENDED_SECRET_BYTES {
            warn!("JWT secret is shorter than recommended (32 bytes)");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(ALGORITHM),
            ttl_secs,
        })
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a token describing `actor`
    pub fn issue(&self, actor: &Actor) -> std::result::Result<String, IdentityError> {
        let claims = Claims::for_actor(actor, Utc::now().timestamp(), self.ttl_secs);
        Ok(encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?)
    }

    /// Decode a token into the actor it describes
    ///
    /// Expired, tampered or malformed tokens resolve to `None` (unauthenticated).
    pub fn resolve_actor(&self, token: &str) -> Option<Actor> {
        match decode::<Claims>(token.trim(), &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims.into_actor()),
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

/// Gate applied before every mutating operation
///
/// Absent, deleted, rejected and still-pending actors are refused with distinct
/// messages.
pub fn require_active(actor: Option<&Actor>) -> Result<&Actor> {
    let actor = actor.ok_or(Error::Denied(messages::UNAUTHENTICATED))?;
    match actor.status() {
        ActorStatus::Verified => Ok(actor),
        ActorStatus::Deleted => Err(Error::Denied(messages::ACTOR_DELETED)),
        ActorStatus::Rejected => Err(Error::Denied(messages::ACTOR_REJECTED)),
        ActorStatus::Pending => Err(Error::Denied(messages::ACTOR_PENDING)),
    }
}
