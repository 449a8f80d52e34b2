//! Points ledger
//!
//! Append-only record of merit/demerit grants plus redemptions against the
//! resulting balance. Every entry point resolves the acting actor through the
//! lifecycle gate, asks the authorization model, and only then touches the store.
//!
//! Grants flow two ways:
//!
//! - An enlisted actor files a *request* naming a cadre giver. It is stored as
//!   pending and authorized when the giver decides on it.
//! - A cadre actor makes a *direct award* to an enlisted receiver. Authorization
//!   runs immediately and the grant is stored already verified.
//!
//! Balances are never cached; `summary` recomputes them from source records.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    check_point_range, parse_point_value, Grant, GrantDecision, GrantRequest, GrantStatus,
    PointBalance, PointSummary, PointTemplate, Redemption, MAX_POINT_VALUE,
};

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actor::Actor;
use crate::auth::{self, Decision};
use crate::error::{Error, Result};
use crate::identity::require_active;
use crate::messages;
use crate::store::{GrantQuery, Sign, Store, StoreError};

/// Grants per history page
pub const GRANTS_PER_PAGE: u32 = 20;

/// Points ledger service
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Create a ledger over `store`
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a grant request (enlisted actor) or a direct award (cadre actor)
    pub async fn create_grant(&self, actor: Option<&Actor>, request: GrantRequest) -> Result<Grant> {
        let actor = require_active(actor)?;

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(messages::REASON_REQUIRED));
        }
        if request.value == 0 {
            return Err(Error::Validation(messages::VALUE_ZERO));
        }
        check_point_range(request.value)?;

        let counterparty = request
            .counterparty_sn
            .as_deref()
            .map(str::trim)
            .filter(|sn| !sn.is_empty())
            .ok_or(Error::Validation(messages::TARGET_REQUIRED))?;
        auth::enforce(
            auth::can_act_on_self(&actor.sn, counterparty, messages::SELF_GRANT),
            actor,
            "create_grant",
        )?;

        let grant = if actor.is_enlisted() {
            let giver = self.counterparty(counterparty).await?;
            if !giver.is_cadre() {
                return Err(Error::NotFound(messages::TARGET_NOT_FOUND));
            }
            Grant::new(&giver.sn, &actor.sn, request.value, reason, request.given_at)
        } else {
            let receiver = self.counterparty(counterparty).await?;
            if !receiver.is_enlisted() {
                return Err(Error::NotFound(messages::TARGET_NOT_FOUND));
            }
            auth::enforce(
                auth::can_grant_points(request.value, &actor.permissions),
                actor,
                "create_grant",
            )?;
            Grant::new(&actor.sn, &receiver.sn, request.value, reason, request.given_at)
                .verified_now()
        };

        self.store.insert_grant(&grant).await?;

        info!(
            grant_id = %grant.id,
            giver = %grant.giver_sn,
            receiver = %grant.receiver_sn,
            value = grant.value,
            status = ?grant.status(),
            "Grant recorded"
        );
        Ok(grant)
    }

    /// Approve or reject a pending grant addressed to the acting cadre
    pub async fn verify_grant(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        decision: GrantDecision,
    ) -> Result<Grant> {
        let actor = require_active(actor)?;

        let grant = self.store.get_grant(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => Error::NotFound(messages::GRANT_NOT_FOUND_FOR_DECISION),
            other => Error::storage(messages::DECISION_FAILED)(other),
        })?;

        if grant.giver_sn != actor.sn {
            return auth::deny(actor, "verify_grant", messages::NOT_GIVER);
        }
        if actor.is_enlisted() {
            return auth::deny(actor, "verify_grant", messages::ENLISTED_CANNOT_DECIDE);
        }
        if !grant.is_pending() {
            return Err(Error::Conflict(messages::ALREADY_DECIDED));
        }

        let decision = match decision {
            GrantDecision::Approve => {
                auth::enforce(
                    auth::can_grant_points(grant.value, &actor.permissions),
                    actor,
                    "verify_grant",
                )?;
                GrantDecision::Approve
            }
            GrantDecision::Reject(reason) => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(Error::Validation(messages::REJECT_REASON_REQUIRED));
                }
                GrantDecision::Reject(reason.to_string())
            }
        };

        // A concurrent decision can still land first; the store update is conditional
        let decided = self
            .store
            .update_grant_decision(id, &decision, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => Error::Conflict(messages::ALREADY_DECIDED),
                StoreError::NotFound(_) => Error::NotFound(messages::GRANT_NOT_FOUND_FOR_DECISION),
                other => Error::storage(messages::DECISION_FAILED)(other),
            })?;

        info!(
            grant_id = %id,
            sn = %actor.sn,
            status = ?decided.status(),
            "Grant decided"
        );
        Ok(decided)
    }

    /// Withdraw a pending grant request; only its enlisted receiver may
    pub async fn delete_grant(&self, actor: Option<&Actor>, id: Uuid) -> Result<()> {
        let actor = require_active(actor)?;

        if actor.is_cadre() {
            return auth::deny(actor, "delete_grant", messages::CADRE_CANNOT_DELETE);
        }

        let grant = self.store.get_grant(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => Error::NotFound(messages::GRANT_NOT_FOUND),
            other => other.into(),
        })?;

        if grant.receiver_sn != actor.sn {
            return auth::deny(actor, "delete_grant", messages::NOT_RECEIVER);
        }
        if !grant.is_pending() {
            return Err(Error::Conflict(messages::ALREADY_PROCESSED));
        }

        self.store.delete_grant(id).await.map_err(|e| match e {
            StoreError::Conflict(_) => Error::Conflict(messages::ALREADY_PROCESSED),
            StoreError::NotFound(_) => Error::NotFound(messages::GRANT_NOT_FOUND),
            other => other.into(),
        })?;

        info!(grant_id = %id, sn = %actor.sn, "Grant request withdrawn");
        Ok(())
    }

    /// Debit an enlisted actor's balance on behalf of a cadre
    ///
    /// The balance check and the insert are a single conditional store
    /// operation, so concurrent redemptions can never overdraw.
    pub async fn redeem_points(
        &self,
        actor: Option<&Actor>,
        user_sn: &str,
        value: i64,
        reason: &str,
    ) -> Result<Redemption> {
        let actor = require_active(actor)?;

        if value <= 0 {
            return Err(Error::Validation(messages::REDEEM_VALUE_NOT_POSITIVE));
        }
        check_point_range(value)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(messages::REDEEM_REASON_REQUIRED));
        }
        if actor.is_enlisted() {
            return auth::deny(actor, "redeem_points", messages::ENLISTED_CANNOT_REDEEM);
        }
        auth::enforce(
            auth::can_redeem_points(&actor.permissions),
            actor,
            "redeem_points",
        )?;

        let target = self.counterparty(user_sn.trim()).await?;
        if !target.is_enlisted() {
            return auth::deny(actor, "redeem_points", messages::REDEEM_TARGET_NOT_ENLISTED);
        }

        let redemption = Redemption::new(&target.sn, &actor.sn, value, reason);
        self.store
            .insert_redemption(&redemption)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => Error::Conflict(messages::INSUFFICIENT_POINTS),
                other => other.into(),
            })?;

        info!(
            redemption_id = %redemption.id,
            user_sn = %redemption.user_sn,
            recorded_by = %redemption.recorded_by,
            value,
            "Points redeemed"
        );
        Ok(redemption)
    }

    /// Merit, demerit and spent totals recomputed from source records
    pub async fn summary(&self, sn: &str) -> Result<PointSummary> {
        let merit = self
            .store
            .sum_grants(sn, Sign::Positive)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;
        let demerit = self
            .store
            .sum_grants(sn, Sign::Negative)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;
        let spent = self
            .store
            .sum_redemptions(sn)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;

        Ok(PointSummary {
            merit,
            demerit,
            spent,
        })
    }

    /// Authorized balance view of `sn`
    pub async fn view_summary(&self, actor: Option<&Actor>, sn: &str) -> Result<PointBalance> {
        let actor = require_active(actor)?;
        auth::enforce(auth::can_view_points(actor, sn), actor, "view_summary")?;

        let summary = self.summary(sn).await?;
        debug!(sn = %sn, available = summary.available(), "Summary computed");
        Ok(summary.into())
    }

    /// Load one grant, visible to its two parties and to point viewers
    pub async fn fetch_grant(&self, actor: Option<&Actor>, id: Uuid) -> Result<Grant> {
        let actor = require_active(actor)?;

        let grant = self.store.get_grant(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => Error::NotFound(messages::GRANT_NOT_FOUND),
            other => Error::storage(messages::LOAD_FAILED)(other),
        })?;

        let decision = if grant.giver_sn == actor.sn || grant.receiver_sn == actor.sn {
            Decision::Allowed
        } else {
            auth::require_any(
                &actor.permissions,
                auth::POINT_VIEWERS,
                messages::NO_VIEW_PERMISSION,
            )
        };
        auth::enforce(decision, actor, "fetch_grant")?;
        Ok(grant)
    }

    /// One page (1-based) of `sn`'s grant history, newest first
    ///
    /// Enlisted history is what they received; cadre history is what they gave.
    pub async fn list_grants(&self, actor: Option<&Actor>, sn: &str, page: u32) -> Result<Vec<Grant>> {
        let actor = require_active(actor)?;
        auth::enforce(auth::can_view_points(actor, sn), actor, "list_grants")?;

        let target = if actor.sn == sn {
            actor.clone()
        } else {
            self.store.get_actor(sn).await.map_err(|e| match e {
                StoreError::NotFound(_) => Error::NotFound(messages::ACTOR_NOT_FOUND),
                other => Error::storage(messages::LOAD_FAILED)(other),
            })?
        };

        let mut query = GrantQuery {
            limit: Some(GRANTS_PER_PAGE),
            offset: page.saturating_sub(1) * GRANTS_PER_PAGE,
            ..Default::default()
        };
        if target.is_enlisted() {
            query.receiver_sn = Some(target.sn);
        } else {
            query.giver_sn = Some(target.sn);
        }

        let grants = self
            .store
            .list_grants(&query)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))?;
        debug!(sn = %sn, page, count = grants.len(), "Grant history loaded");
        Ok(grants)
    }

    /// Pending requests awaiting the acting cadre's decision
    pub async fn pending_grants(&self, actor: Option<&Actor>) -> Result<Vec<Grant>> {
        let actor = require_active(actor)?;

        let query = GrantQuery {
            giver_sn: Some(actor.sn.clone()),
            pending_only: true,
            ..Default::default()
        };
        self.store
            .list_grants(&query)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))
    }

    /// Redemptions debited from `sn`, newest first
    pub async fn list_redemptions(&self, actor: Option<&Actor>, sn: &str) -> Result<Vec<Redemption>> {
        let actor = require_active(actor)?;
        auth::enforce(auth::can_view_points(actor, sn), actor, "list_redemptions")?;

        self.store
            .list_redemptions(sn)
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))
    }

    /// Preset reasons for the grant form, common templates first
    pub async fn list_point_templates(&self, actor: Option<&Actor>) -> Result<Vec<PointTemplate>> {
        require_active(actor)?;
        self.store
            .list_point_templates()
            .await
            .map_err(Error::storage(messages::LOAD_FAILED))
    }

    /// Add a preset reason; point administrators only
    pub async fn add_point_template(
        &self,
        actor: Option<&Actor>,
        template: PointTemplate,
    ) -> Result<PointTemplate> {
        let actor = require_active(actor)?;
        auth::enforce(
            auth::require_any(
                &actor.permissions,
                auth::POINT_TEMPLATE_EDITORS,
                messages::NO_TEMPLATE_PERMISSION,
            ),
            actor,
            "add_point_template",
        )?;

        self.store.insert_point_template(&template).await?;
        info!(template_id = %template.id, sn = %actor.sn, "Point template added");
        Ok(template)
    }

    async fn counterparty(&self, sn: &str) -> Result<Actor> {
        self.store.get_actor(sn).await.map_err(|e| match e {
            StoreError::NotFound(_) => Error::NotFound(messages::TARGET_NOT_FOUND),
            other => Error::storage(messages::LOAD_FAILED)(other),
        })
    }
}
