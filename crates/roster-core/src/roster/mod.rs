//! Roster service: sign-up, sign-in and actor administration
//!
//! Administrative actions on another actor go through the authorization model's
//! target checks (self, then admin target, then permission). Lifecycle changes
//! are soft: nobody is ever physically removed.


use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::actor::{
    validate_name, validate_password, validate_sn, Actor, ActorSummary, Role, StatusChange,
};
use crate::auth::{self, TargetAction};
use crate::error::{Error, Result};
use crate::identity::{require_active, Identity};
use crate::messages;
use crate::password::{hash_password, temporary_password, verify_password};
use crate::permissions::{default_cadre_permissions, Permission, PermissionSet};
use crate::store::{ActorQuery, ActorScope, Store, StoreError};

/// Actors per listing page
pub const ACTORS_PER_PAGE: u32 = 10;

/// Sign-up form
#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    /// Service number
    pub sn: String,
    /// Plain-text password
    pub password: String,
    /// Display name
    pub name: String,
    /// Role tag
    pub role: Role,
}

/// A signed-in actor and their session token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Signed session credential
    pub token: String,
    /// The actor the token describes
    pub actor: Actor,
}

/// Roster service
#[derive(Clone)]
pub struct Roster {
    store: Arc<dyn Store>,
    identity: Identity,
}

impl Roster {
    /// Create the service over `store`, issuing tokens with `identity`
    pub fn new(store: Arc<dyn Store>, identity: Identity) -> Self {
        Self { store, identity }
    }

    /// Resolve a session token into the actor it describes
    pub fn resolve(&self, token: Option<&str>) -> Option<Actor> {
        token.and_then(|t| self.identity.resolve_actor(t))
    }

    /// Register a new, pending actor and sign them in
    pub async fn sign_up(&self, form: SignUp) -> Result<Session> {
        let sn = form.sn.trim();
        let name = form.name.trim();
        validate_sn(sn)?;
        validate_password(&form.password)?;
        validate_name(name)?;

        let mut actor = Actor::new(sn, name, form.role);
        if actor.is_cadre() {
            actor.permissions = default_cadre_permissions();
        }

        let hash = hash_password(&form.password)?;
        self.store
            .insert_actor(&actor, &hash)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => Error::Conflict(messages::ACTOR_EXISTS),
                other => Error::storage(messages::SIGN_UP_FAILED)(other),
            })?;

        info!(sn = %actor.sn, role = %actor.role, "Actor signed up");
        self.session(actor)
    }

    /// Authenticate with service number and password
    ///
    /// No lifecycle gate here: pending actors may sign in to see their status.
    pub async fn sign_in(&self, sn: &str, password: &str) -> Result<Session> {
        let actor = self.load_actor(sn.trim()).await?;
        let hash = self
            .store
            .password_hash(&actor.sn)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;

        if !verify_password(password, &hash)? {
            debug!(sn = %actor.sn, "Wrong password");
            return Err(Error::Denied(messages::WRONG_PASSWORD));
        }

        info!(sn = %actor.sn, "Actor signed in");
        self.session(actor)
    }

    /// Re-read the actor from storage and issue a fresh token
    pub async fn refresh_token(&self, actor: Option<&Actor>) -> Result<Session> {
        let actor = actor.ok_or(Error::Denied(messages::UNAUTHENTICATED))?;
        let current = self.load_actor(&actor.sn).await?;
        self.session(current)
    }

    /// Out-of-band token issuance for an existing actor
    pub async fn issue_token(&self, sn: &str) -> Result<Session> {
        let actor = self.load_actor(sn.trim()).await?;
        self.session(actor)
    }

    /// Out-of-band promotion to `Admin`; the only path that grants it
    pub async fn bootstrap_admin(&self, sn: &str) -> Result<Actor> {
        let actor = self.load_actor(sn.trim()).await?;

        self.store
            .replace_permissions(&actor.sn, &PermissionSet::from([Permission::Admin]))
            .await
            .map_err(Error::storage(messages::PERMISSION_UPDATE_FAILED))?;
        let admin = self
            .store
            .upsert_actor_status(&actor.sn, StatusChange::Verify, Utc::now())
            .await
            .map_err(Error::storage(messages::VERIFY_FAILED))?;

        info!(sn = %admin.sn, "Admin bootstrapped");
        Ok(admin)
    }

    /// Sign-ups awaiting review
    pub async fn list_unverified(&self, actor: Option<&Actor>) -> Result<Vec<ActorSummary>> {
        let actor = require_active(actor)?;
        auth::enforce(
            auth::require_any(&actor.permissions, auth::USER_VERIFIERS, messages::NO_PERMISSION),
            actor,
            "list_unverified",
        )?;

        let query = ActorQuery {
            scope: ActorScope::Pending,
            ..Default::default()
        };
        let actors = self
            .store
            .list_actors(&query)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;
        Ok(actors.iter().map(Actor::summary).collect())
    }

    /// Approve (`approve = true`) or reject a sign-up
    pub async fn verify_actor(
        &self,
        actor: Option<&Actor>,
        sn: &str,
        approve: bool,
    ) -> Result<Actor> {
        let actor = require_active(actor)?;
        let target = self.authorize_on_target(actor, sn, &auth::VERIFY_USER, "verify_actor").await?;

        let change = if approve {
            StatusChange::Verify
        } else {
            StatusChange::Reject
        };
        let updated = self
            .store
            .upsert_actor_status(&target.sn, change, Utc::now())
            .await
            .map_err(Error::storage(messages::VERIFY_FAILED))?;

        info!(sn = %actor.sn, target = %updated.sn, approve, "Sign-up reviewed");
        Ok(updated)
    }

    /// Soft-delete (`deleted = true`) or restore an actor
    pub async fn delete_actor(&self, actor: Option<&Actor>, sn: &str, deleted: bool) -> Result<Actor> {
        let actor = require_active(actor)?;
        let target = self.authorize_on_target(actor, sn, &auth::DELETE_USER, "delete_actor").await?;

        let change = if deleted {
            StatusChange::Delete
        } else {
            StatusChange::Restore
        };
        let updated = self
            .store
            .upsert_actor_status(&target.sn, change, Utc::now())
            .await?;

        info!(sn = %actor.sn, target = %updated.sn, deleted, "Actor deletion state changed");
        Ok(updated)
    }

    /// Replace another actor's permissions with the normalized form of `requested`
    pub async fn update_permissions<S: AsRef<str>>(
        &self,
        actor: Option<&Actor>,
        sn: &str,
        requested: &[S],
    ) -> Result<PermissionSet> {
        let actor = require_active(actor)?;
        let target = self
            .authorize_on_target(actor, sn, &auth::EDIT_PERMISSIONS, "update_permissions")
            .await?;

        if requested
            .iter()
            .any(|token| token.as_ref().trim() == Permission::Admin.as_str())
        {
            return auth::deny(actor, "update_permissions", messages::ADMIN_GRANT);
        }
        let permissions = PermissionSet::validate(requested)
            .map_err(|_| Error::Validation(messages::UNKNOWN_PERMISSION))?
            .normalize();

        self.store
            .replace_permissions(&target.sn, &permissions)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => Error::NotFound(messages::ACTOR_NOT_FOUND),
                other => Error::storage(messages::PERMISSION_UPDATE_FAILED)(other),
            })?;

        info!(
            sn = %actor.sn,
            target = %target.sn,
            permissions = ?permissions.to_strings(),
            "Permissions updated"
        );
        Ok(permissions)
    }

    /// Force a password reset; returns the temporary password
    pub async fn reset_password(&self, actor: Option<&Actor>, sn: &str) -> Result<String> {
        let actor = require_active(actor)?;
        let target = self
            .authorize_on_target(actor, sn, &auth::RESET_PASSWORD, "reset_password")
            .await?;

        let password = temporary_password();
        let hash = hash_password(&password)?;
        self.store
            .set_password_hash(&target.sn, &hash)
            .await
            .map_err(Error::storage(messages::RESET_FAILED))?;

        info!(sn = %actor.sn, target = %target.sn, "Password reset");
        Ok(password)
    }

    /// Change one's own password
    pub async fn change_password(
        &self,
        actor: Option<&Actor>,
        sn: &str,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<()> {
        let actor = require_active(actor)?;
        if actor.sn != sn.trim() {
            return auth::deny(actor, "change_password", messages::PASSWORD_SELF_ONLY);
        }
        if new_password != confirmation {
            return Err(Error::Validation(messages::PASSWORD_MISMATCH));
        }
        if new_password.trim().is_empty() {
            return Err(Error::Validation(messages::PASSWORD_BLANK));
        }
        validate_password(new_password)?;

        let stored = self
            .store
            .password_hash(&actor.sn)
            .await
            .map_err(Error::storage(messages::PASSWORD_CHANGE_FAILED))?;
        if !verify_password(old_password, &stored)? {
            return Err(Error::Denied(messages::WRONG_PASSWORD));
        }

        let hash = hash_password(new_password)?;
        self.store
            .set_password_hash(&actor.sn, &hash)
            .await
            .map_err(Error::storage(messages::PASSWORD_CHANGE_FAILED))?;

        info!(sn = %actor.sn, "Password changed");
        Ok(())
    }

    /// One page (1-based) of reviewed actors, matching `sn` exactly or `name` by substring
    pub async fn list_actors(
        &self,
        actor: Option<&Actor>,
        query: Option<&str>,
        page: u32,
    ) -> Result<Vec<Actor>> {
        let actor = require_active(actor)?;
        auth::enforce(
            auth::require_any(&actor.permissions, auth::USER_LISTERS, messages::NO_LIST_PERMISSION),
            actor,
            "list_actors",
        )?;

        let query = ActorQuery {
            text: search_text(query),
            scope: ActorScope::Decided,
            limit: Some(ACTORS_PER_PAGE),
            offset: page.saturating_sub(1) * ACTORS_PER_PAGE,
            ..Default::default()
        };
        self.store
            .list_actors(&query)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))
    }

    /// Enlisted actors a grant can be awarded to
    pub async fn search_receivers(
        &self,
        actor: Option<&Actor>,
        query: Option<&str>,
    ) -> Result<Vec<ActorSummary>> {
        require_active(actor)?;
        let actors = self.active_with_role(Role::Enlisted, query).await?;
        Ok(actors.iter().map(Actor::summary).collect())
    }

    /// Cadre who can be asked to award points
    pub async fn search_givers(
        &self,
        actor: Option<&Actor>,
        query: Option<&str>,
    ) -> Result<Vec<ActorSummary>> {
        require_active(actor)?;
        let actors = self.active_with_role(Role::Cadre, query).await?;
        Ok(actors
            .iter()
            .filter(|a| auth::has_any(&a.permissions, auth::POINT_GIVERS))
            .map(Actor::summary)
            .collect())
    }

    async fn active_with_role(&self, role: Role, query: Option<&str>) -> Result<Vec<Actor>> {
        let query = ActorQuery {
            text: search_text(query),
            role: Some(role),
            scope: ActorScope::Active,
            ..Default::default()
        };
        self.store
            .list_actors(&query)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))
    }

    async fn authorize_on_target(
        &self,
        actor: &Actor,
        sn: &str,
        action: &TargetAction,
        name: &str,
    ) -> Result<Actor> {
        let target = self.load_actor(sn.trim()).await?;
        auth::enforce(
            auth::authorize_target_action(action, actor, &target),
            actor,
            name,
        )?;
        Ok(target)
    }

    async fn load_actor(&self, sn: &str) -> Result<Actor> {
        self.store.get_actor(sn).await.map_err(|e| match e {
            StoreError::NotFound(_) => Error::NotFound(messages::ACTOR_NOT_FOUND),
            other => Error::storage(messages::LOAD_FAILED)(other),
        })
    }

    fn session(&self, actor: Actor) -> Result<Session> {
        let token = self.identity.issue(&actor)?;
        Ok(Session { token, actor })
    }
}

fn search_text(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}
