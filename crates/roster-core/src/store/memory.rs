//! In-memory backend
//!
//! All tables live behind one `tokio::sync::Mutex`, so every trait method is a
//! single serialized unit and the conditional guards hold under concurrency just
//! as they do in SQLite. Data is lost when the store is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{ActorQuery, ActorScope, GrantQuery, Sign, Store, StoreError, StoreResult};
use crate::actor::{Actor, StatusChange};
use crate::ledger::{check_point_range, Grant, GrantDecision, PointTemplate, Redemption};
use crate::permissions::PermissionSet;

struct StoredActor {
    actor: Actor,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    // Keyed by sn so listings come out ordered
    actors: BTreeMap<String, StoredActor>,
    // Insertion order; listings walk it backwards for newest first
    grants: Vec<Grant>,
    redemptions: Vec<Redemption>,
    templates: Vec<PointTemplate>,
}

impl Tables {
    fn actor_mut(&mut self, sn: &str) -> StoreResult<&mut StoredActor> {
        self.actors
            .get_mut(sn)
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", sn)))
    }

    fn grant_index(&self, id: Uuid) -> StoreResult<usize> {
        self.grants
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("grant {}", id)))
    }

    fn available(&self, sn: &str) -> StoreResult<i64> {
        let granted = checked_sum(
            self.grants
                .iter()
                .filter(|g| g.receiver_sn == sn && g.verified_at.is_some())
                .map(|g| g.value),
        )?;
        let spent = checked_sum(
            self.redemptions
                .iter()
                .filter(|r| r.user_sn == sn)
                .map(|r| r.value),
        )?;
        granted.checked_sub(spent).ok_or_else(overflow)
    }
}

fn overflow() -> StoreError {
    StoreError::Backend("point sum overflow".to_string())
}

fn checked_sum(mut values: impl Iterator<Item = i64>) -> StoreResult<i64> {
    values.try_fold(0i64, |acc, v| acc.checked_add(v).ok_or_else(overflow))
}

fn check_value(value: i64) -> StoreResult<()> {
    check_point_range(value)
        .map(|_| ())
        .map_err(|_| StoreError::Backend(format!("point value {} out of range", value)))
}

/// In-process store for tests and local experiments
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_scope(actor: &Actor, scope: ActorScope) -> bool {
    match scope {
        ActorScope::Any => true,
        ActorScope::Pending => {
            actor.verified_at.is_none() && actor.rejected_at.is_none() && actor.deleted_at.is_none()
        }
        ActorScope::Decided => actor.verified_at.is_some() || actor.rejected_at.is_some(),
        ActorScope::Active => actor.verified_at.is_some() && actor.deleted_at.is_none(),
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: Option<u32>, offset: u32) -> Vec<T> {
    let items = items.skip(offset as usize);
    match limit {
        Some(limit) => items.take(limit as usize).collect(),
        None => items.collect(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn migrate(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_actor(&self, sn: &str) -> StoreResult<Actor> {
        let tables = self.tables.lock().await;
        tables
            .actors
            .get(sn)
            .map(|stored| stored.actor.clone())
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", sn)))
    }

    async fn insert_actor(&self, actor: &Actor, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.actors.contains_key(&actor.sn) {
            return Err(StoreError::Conflict(format!("actor {} exists", actor.sn)));
        }
        tables.actors.insert(
            actor.sn.clone(),
            StoredActor {
                actor: actor.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        debug!(sn = %actor.sn, "Actor inserted");
        Ok(())
    }

    async fn upsert_actor_status(
        &self,
        sn: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StoreResult<Actor> {
        let mut tables = self.tables.lock().await;
        let actor = &mut tables.actor_mut(sn)?.actor;
        match change {
            StatusChange::Verify => {
                actor.verified_at = Some(at);
                actor.rejected_at = None;
            }
            StatusChange::Reject => {
                actor.rejected_at = Some(at);
                actor.verified_at = None;
            }
            StatusChange::Delete => actor.deleted_at = Some(at),
            StatusChange::Restore => actor.deleted_at = None,
        }
        Ok(actor.clone())
    }

    async fn replace_permissions(&self, sn: &str, permissions: &PermissionSet) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.actor_mut(sn)?.actor.permissions = permissions.clone();
        Ok(())
    }

    async fn password_hash(&self, sn: &str) -> StoreResult<String> {
        let mut tables = self.tables.lock().await;
        Ok(tables.actor_mut(sn)?.password_hash.clone())
    }

    async fn set_password_hash(&self, sn: &str, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.actor_mut(sn)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn list_actors(&self, query: &ActorQuery) -> StoreResult<Vec<Actor>> {
        let tables = self.tables.lock().await;
        let matches = tables
            .actors
            .values()
            .map(|stored| &stored.actor)
            .filter(|a| match query.text.as_deref() {
                Some(text) => a.sn == text || a.name.contains(text),
                None => true,
            })
            .filter(|a| query.role.is_none_or(|role| a.role == role))
            .filter(|a| in_scope(a, query.scope))
            .cloned();
        Ok(page(matches, query.limit, query.offset))
    }

    async fn get_grant(&self, id: Uuid) -> StoreResult<Grant> {
        let tables = self.tables.lock().await;
        let index = tables.grant_index(id)?;
        Ok(tables.grants[index].clone())
    }

    async fn insert_grant(&self, grant: &Grant) -> StoreResult<()> {
        check_value(grant.value)?;
        let mut tables = self.tables.lock().await;
        if tables.grants.iter().any(|g| g.id == grant.id) {
            return Err(StoreError::Conflict(format!("grant {} exists", grant.id)));
        }
        tables.grants.push(grant.clone());
        debug!(grant_id = %grant.id, "Grant inserted");
        Ok(())
    }

    async fn update_grant_decision(
        &self,
        id: Uuid,
        decision: &GrantDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Grant> {
        let mut tables = self.tables.lock().await;
        let index = tables.grant_index(id)?;
        let grant = &mut tables.grants[index];
        if !grant.is_pending() {
            return Err(StoreError::Conflict(format!("grant {} already decided", id)));
        }
        match decision {
            GrantDecision::Approve => grant.verified_at = Some(at),
            GrantDecision::Reject(reason) => {
                grant.rejected_at = Some(at);
                grant.rejected_reason = Some(reason.clone());
            }
        }
        Ok(grant.clone())
    }

    async fn delete_grant(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let index = tables.grant_index(id)?;
        if !tables.grants[index].is_pending() {
            return Err(StoreError::Conflict(format!("grant {} already decided", id)));
        }
        tables.grants.remove(index);
        debug!(grant_id = %id, "Grant deleted");
        Ok(())
    }

    async fn list_grants(&self, query: &GrantQuery) -> StoreResult<Vec<Grant>> {
        let tables = self.tables.lock().await;
        let matches = tables
            .grants
            .iter()
            .rev()
            .filter(|g| query.giver_sn.as_deref().is_none_or(|sn| g.giver_sn == sn))
            .filter(|g| query.receiver_sn.as_deref().is_none_or(|sn| g.receiver_sn == sn))
            .filter(|g| !query.pending_only || g.is_pending())
            .cloned();
        Ok(page(matches, query.limit, query.offset))
    }

    async fn insert_redemption(&self, redemption: &Redemption) -> StoreResult<()> {
        check_value(redemption.value)?;
        let mut tables = self.tables.lock().await;
        if tables.available(&redemption.user_sn)? < redemption.value {
            return Err(StoreError::Conflict(format!(
                "insufficient balance for {}",
                redemption.user_sn
            )));
        }
        tables.redemptions.push(redemption.clone());
        debug!(redemption_id = %redemption.id, user_sn = %redemption.user_sn, "Redemption inserted");
        Ok(())
    }

    async fn list_redemptions(&self, user_sn: &str) -> StoreResult<Vec<Redemption>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .redemptions
            .iter()
            .rev()
            .filter(|r| r.user_sn == user_sn)
            .cloned()
            .collect())
    }

    async fn sum_grants(&self, sn: &str, sign: Sign) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let magnitudes = tables
            .grants
            .iter()
            .filter(|g| g.receiver_sn == sn && g.verified_at.is_some())
            .filter_map(|g| match sign {
                Sign::Positive if g.value > 0 => Some(Some(g.value)),
                Sign::Negative if g.value < 0 => Some(g.value.checked_neg()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(overflow)?;
        checked_sum(magnitudes.into_iter())
    }

    async fn sum_redemptions(&self, sn: &str) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        checked_sum(
            tables
                .redemptions
                .iter()
                .filter(|r| r.user_sn == sn)
                .map(|r| r.value),
        )
    }

    async fn list_point_templates(&self) -> StoreResult<Vec<PointTemplate>> {
        let tables = self.tables.lock().await;
        let mut templates = tables.templates.clone();
        // None sorts before Some, so common templates lead
        templates.sort_by(|a, b| (&a.unit, &a.reason).cmp(&(&b.unit, &b.reason)));
        Ok(templates)
    }

    async fn insert_point_template(&self, template: &PointTemplate) -> StoreResult<()> {
        for value in template.merit.into_iter().chain(template.demerit) {
            check_value(value)?;
        }
        let mut tables = self.tables.lock().await;
        if tables.templates.iter().any(|t| t.id == template.id) {
            return Err(StoreError::Conflict(format!("template {} exists", template.id)));
        }
        tables.templates.push(template.clone());
        debug!(template_id = %template.id, "Point template inserted");
        Ok(())
    }
}
