//! SQLite backend
//!
//! Schema is created idempotently on open. Timestamps are stored through sqlx's
//! chrono encoding, IDs as hyphenated UUID text.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ActorQuery, ActorScope, GrantQuery, Sign, Store, StoreError, StoreResult};
use crate::actor::{Actor, Role, StatusChange};
use crate::ledger::{Grant, GrantDecision, PointTemplate, Redemption};
use crate::permissions::PermissionSet;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ACTOR_COLUMNS: &str = r#"
    a.sn, a.name, a.role, a.verified_at, a.rejected_at, a.deleted_at,
    (SELECT GROUP_CONCAT(p.permission, ',') FROM actor_permissions p WHERE p.sn = a.sn)
        AS permissions
"#;

const PENDING_GRANT: &str =
    "verified_at IS NULL AND rejected_at IS NULL AND rejected_reason IS NULL";

/// SQLite-backed store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` with default pool settings
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, DEFAULT_MAX_CONNECTIONS, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Open with explicit pool size and busy timeout
    pub async fn open_with(
        path: impl AsRef<Path>,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        info!(path = %path.display(), max_connections, "SQLite store initialized");
        Ok(store)
    }
}

#[derive(FromRow)]
struct ActorRow {
    sn: String,
    name: String,
    role: String,
    permissions: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ActorRow> for Actor {
    type Error = StoreError;

    fn try_from(row: ActorRow) -> StoreResult<Self> {
        let role = Role::from_str(&row.role).map_err(StoreError::Backend)?;
        let tokens: Vec<&str> = row
            .permissions
            .as_deref()
            .map(|joined| joined.split(',').filter(|t| !t.is_empty()).collect())
            .unwrap_or_default();
        let permissions = PermissionSet::validate(tokens.as_slice())
            .map_err(|e| StoreError::Backend(format!("actor {}: {}", row.sn, e)))?;

        Ok(Actor {
            sn: row.sn,
            name: row.name,
            role,
            permissions,
            verified_at: row.verified_at,
            rejected_at: row.rejected_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct GrantRow {
    id: String,
    giver_sn: String,
    receiver_sn: String,
    value: i64,
    reason: String,
    given_at: NaiveDate,
    created_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    rejected_reason: Option<String>,
}

impl TryFrom<GrantRow> for Grant {
    type Error = StoreError;

    fn try_from(row: GrantRow) -> StoreResult<Self> {
        Ok(Grant {
            id: parse_id(&row.id)?,
            giver_sn: row.giver_sn,
            receiver_sn: row.receiver_sn,
            value: row.value,
            reason: row.reason,
            given_at: row.given_at,
            created_at: row.created_at,
            verified_at: row.verified_at,
            rejected_at: row.rejected_at,
            rejected_reason: row.rejected_reason,
        })
    }
}

#[derive(FromRow)]
struct RedemptionRow {
    id: String,
    user_sn: String,
    recorded_by: String,
    value: i64,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = StoreError;

    fn try_from(row: RedemptionRow) -> StoreResult<Self> {
        Ok(Redemption {
            id: parse_id(&row.id)?,
            user_sn: row.user_sn,
            recorded_by: row.recorded_by,
            value: row.value,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TemplateRow {
    id: String,
    unit: Option<String>,
    reason: String,
    merit: Option<i64>,
    demerit: Option<i64>,
}

impl TryFrom<TemplateRow> for PointTemplate {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> StoreResult<Self> {
        Ok(PointTemplate {
            id: parse_id(&row.id)?,
            unit: row.unit,
            reason: row.reason,
            merit: row.merit,
            demerit: row.demerit,
        })
    }
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("Invalid ID '{}': {}", raw, e)))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Store for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actors (
                sn TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                verified_at TIMESTAMP,
                rejected_at TIMESTAMP,
                deleted_at TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actor_permissions (
                sn TEXT NOT NULL,
                permission TEXT NOT NULL,
                PRIMARY KEY (sn, permission),
                FOREIGN KEY (sn) REFERENCES actors(sn) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS grants (
                id TEXT PRIMARY KEY,
                giver_sn TEXT NOT NULL,
                receiver_sn TEXT NOT NULL,
                value INTEGER NOT NULL CHECK (value <> 0 AND value BETWEEN -2147483647 AND 2147483647),
                reason TEXT NOT NULL,
                given_at DATE NOT NULL,
                created_at TIMESTAMP NOT NULL,
                verified_at TIMESTAMP,
                rejected_at TIMESTAMP,
                rejected_reason TEXT,
                FOREIGN KEY (giver_sn) REFERENCES actors(sn),
                FOREIGN KEY (receiver_sn) REFERENCES actors(sn)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS redemptions (
                id TEXT PRIMARY KEY,
                user_sn TEXT NOT NULL,
                recorded_by TEXT NOT NULL,
                value INTEGER NOT NULL CHECK (value BETWEEN 1 AND 2147483647),
                reason TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_sn) REFERENCES actors(sn),
                FOREIGN KEY (recorded_by) REFERENCES actors(sn)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS point_templates (
                id TEXT PRIMARY KEY,
                unit TEXT,
                reason TEXT NOT NULL,
                merit INTEGER CHECK (merit BETWEEN 1 AND 2147483647),
                demerit INTEGER CHECK (demerit BETWEEN -2147483647 AND -1)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_grants_receiver ON grants(receiver_sn)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_grants_giver ON grants(giver_sn)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_redemptions_user ON redemptions(user_sn)")
            .execute(&self.pool)
            .await?;

        debug!("SQLite roster schema initialized");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn get_actor(&self, sn: &str) -> StoreResult<Actor> {
        let sql = format!("SELECT {} FROM actors a WHERE a.sn = ?", ACTOR_COLUMNS);
        let row: ActorRow = sqlx::query_as(&sql)
            .bind(sn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", sn)))?;
        row.try_into()
    }

    async fn insert_actor(&self, actor: &Actor, password_hash: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO actors (sn, name, role, password_hash, verified_at, rejected_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&actor.sn)
        .bind(&actor.name)
        .bind(actor.role.as_str())
        .bind(password_hash)
        .bind(actor.verified_at)
        .bind(actor.rejected_at)
        .bind(actor.deleted_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Conflict(format!("actor {} exists", actor.sn)));
            }
            Err(e) => return Err(e.into()),
        }

        for permission in actor.permissions.iter() {
            sqlx::query("INSERT INTO actor_permissions (sn, permission) VALUES (?, ?)")
                .bind(&actor.sn)
                .bind(permission.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(sn = %actor.sn, "Actor inserted");
        Ok(())
    }

    async fn upsert_actor_status(
        &self,
        sn: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StoreResult<Actor> {
        let result = match change {
            StatusChange::Verify => {
                sqlx::query("UPDATE actors SET verified_at = ?, rejected_at = NULL WHERE sn = ?")
                    .bind(at)
                    .bind(sn)
                    .execute(&self.pool)
                    .await?
            }
            StatusChange::Reject => {
                sqlx::query("UPDATE actors SET rejected_at = ?, verified_at = NULL WHERE sn = ?")
                    .bind(at)
                    .bind(sn)
                    .execute(&self.pool)
                    .await?
            }
            StatusChange::Delete => {
                sqlx::query("UPDATE actors SET deleted_at = ? WHERE sn = ?")
                    .bind(at)
                    .bind(sn)
                    .execute(&self.pool)
                    .await?
            }
            StatusChange::Restore => {
                sqlx::query("UPDATE actors SET deleted_at = NULL WHERE sn = ?")
                    .bind(sn)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("actor {}", sn)));
        }

        debug!(sn = %sn, ?change, "Actor status updated");
        self.get_actor(sn).await
    }

    async fn replace_permissions(&self, sn: &str, permissions: &PermissionSet) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM actors WHERE sn = ?")
            .bind(sn)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("actor {}", sn)));
        }

        sqlx::query("DELETE FROM actor_permissions WHERE sn = ?")
            .bind(sn)
            .execute(&mut *tx)
            .await?;

        for permission in permissions.iter() {
            sqlx::query("INSERT INTO actor_permissions (sn, permission) VALUES (?, ?)")
                .bind(sn)
                .bind(permission.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn password_hash(&self, sn: &str) -> StoreResult<String> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM actors WHERE sn = ?")
            .bind(sn)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(hash,)| hash)
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", sn)))
    }

    async fn set_password_hash(&self, sn: &str, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE actors SET password_hash = ? WHERE sn = ?")
            .bind(password_hash)
            .bind(sn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("actor {}", sn)));
        }
        Ok(())
    }

    async fn list_actors(&self, query: &ActorQuery) -> StoreResult<Vec<Actor>> {
        let scope = match query.scope {
            ActorScope::Any => "1 = 1",
            ActorScope::Pending => {
                "a.verified_at IS NULL AND a.rejected_at IS NULL AND a.deleted_at IS NULL"
            }
            ActorScope::Decided => "(a.verified_at IS NOT NULL OR a.rejected_at IS NOT NULL)",
            ActorScope::Active => "a.verified_at IS NOT NULL AND a.deleted_at IS NULL",
        };
        let sql = format!(
            r#"
            SELECT {}
            FROM actors a
            WHERE (?1 IS NULL OR a.sn = ?1 OR a.name LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR a.role = ?2)
              AND {}
            ORDER BY a.sn
            LIMIT ?3 OFFSET ?4
            "#,
            ACTOR_COLUMNS, scope
        );

        let rows: Vec<ActorRow> = sqlx::query_as(&sql)
            .bind(query.text.as_deref())
            .bind(query.role.map(|r| r.as_str()))
            .bind(query.limit.map(i64::from).unwrap_or(-1))
            .bind(i64::from(query.offset))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Actor::try_from).collect()
    }

    async fn get_grant(&self, id: Uuid) -> StoreResult<Grant> {
        let row: GrantRow = sqlx::query_as("SELECT * FROM grants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("grant {}", id)))?;
        row.try_into()
    }

    async fn insert_grant(&self, grant: &Grant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO grants (
                id, giver_sn, receiver_sn, value, reason, given_at,
                created_at, verified_at, rejected_at, rejected_reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(grant.id.to_string())
        .bind(&grant.giver_sn)
        .bind(&grant.receiver_sn)
        .bind(grant.value)
        .bind(&grant.reason)
        .bind(grant.given_at)
        .bind(grant.created_at)
        .bind(grant.verified_at)
        .bind(grant.rejected_at)
        .bind(&grant.rejected_reason)
        .execute(&self.pool)
        .await?;

        debug!(grant_id = %grant.id, "Grant inserted");
        Ok(())
    }

    async fn update_grant_decision(
        &self,
        id: Uuid,
        decision: &GrantDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Grant> {
        let result = match decision {
            GrantDecision::Approve => {
                let sql = format!(
                    "UPDATE grants SET verified_at = ? WHERE id = ? AND {}",
                    PENDING_GRANT
                );
                sqlx::query(&sql)
                    .bind(at)
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await?
            }
            GrantDecision::Reject(reason) => {
                let sql = format!(
                    "UPDATE grants SET rejected_at = ?, rejected_reason = ? WHERE id = ? AND {}",
                    PENDING_GRANT
                );
                sqlx::query(&sql)
                    .bind(at)
                    .bind(reason)
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            // Missing row surfaces as NotFound from the lookup
            self.get_grant(id).await?;
            return Err(StoreError::Conflict(format!("grant {} already decided", id)));
        }

        self.get_grant(id).await
    }

    async fn delete_grant(&self, id: Uuid) -> StoreResult<()> {
        let sql = format!("DELETE FROM grants WHERE id = ? AND {}", PENDING_GRANT);
        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            self.get_grant(id).await?;
            return Err(StoreError::Conflict(format!("grant {} already decided", id)));
        }

        debug!(grant_id = %id, "Grant deleted");
        Ok(())
    }

    async fn list_grants(&self, query: &GrantQuery) -> StoreResult<Vec<Grant>> {
        let sql = format!(
            r#"
            SELECT * FROM grants
            WHERE (?1 IS NULL OR giver_sn = ?1)
              AND (?2 IS NULL OR receiver_sn = ?2)
              AND (?3 = 0 OR ({}))
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?4 OFFSET ?5
            "#,
            PENDING_GRANT
        );

        let rows: Vec<GrantRow> = sqlx::query_as(&sql)
            .bind(query.giver_sn.as_deref())
            .bind(query.receiver_sn.as_deref())
            .bind(query.pending_only)
            .bind(query.limit.map(i64::from).unwrap_or(-1))
            .bind(i64::from(query.offset))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Grant::try_from).collect()
    }

    async fn insert_redemption(&self, redemption: &Redemption) -> StoreResult<()> {
        // Balance check and insert run as one statement under SQLite's write lock
        let result = sqlx::query(
            r#"
            INSERT INTO redemptions (id, user_sn, recorded_by, value, reason, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6
            WHERE (SELECT COALESCE(SUM(value), 0) FROM grants
                   WHERE receiver_sn = ?2 AND verified_at IS NOT NULL)
                - (SELECT COALESCE(SUM(value), 0) FROM redemptions WHERE user_sn = ?2)
                >= ?4
            "#,
        )
        .bind(redemption.id.to_string())
        .bind(&redemption.user_sn)
        .bind(&redemption.recorded_by)
        .bind(redemption.value)
        .bind(&redemption.reason)
        .bind(redemption.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "insufficient balance for {}",
                redemption.user_sn
            )));
        }

        debug!(redemption_id = %redemption.id, user_sn = %redemption.user_sn, "Redemption inserted");
        Ok(())
    }

    async fn list_redemptions(&self, user_sn: &str) -> StoreResult<Vec<Redemption>> {
        let rows: Vec<RedemptionRow> = sqlx::query_as(
            "SELECT * FROM redemptions WHERE user_sn = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_sn)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Redemption::try_from).collect()
    }

    async fn sum_grants(&self, sn: &str, sign: Sign) -> StoreResult<i64> {
        let sql = match sign {
            Sign::Positive => {
                "SELECT COALESCE(SUM(value), 0) FROM grants \
                 WHERE receiver_sn = ? AND verified_at IS NOT NULL AND value > 0"
            }
            Sign::Negative => {
                "SELECT COALESCE(SUM(-value), 0) FROM grants \
                 WHERE receiver_sn = ? AND verified_at IS NOT NULL AND value < 0"
            }
        };
        let total: i64 = sqlx::query_scalar(sql).bind(sn).fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn sum_redemptions(&self, sn: &str) -> StoreResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(value), 0) FROM redemptions WHERE user_sn = ?")
                .bind(sn)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn list_point_templates(&self) -> StoreResult<Vec<PointTemplate>> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "SELECT * FROM point_templates ORDER BY unit IS NOT NULL, unit, reason",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PointTemplate::try_from).collect()
    }

    async fn insert_point_template(&self, template: &PointTemplate) -> StoreResult<()> {
        let inserted = sqlx::query(
            "INSERT INTO point_templates (id, unit, reason, merit, demerit) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(template.id.to_string())
        .bind(template.unit.as_deref())
        .bind(&template.reason)
        .bind(template.merit)
        .bind(template.demerit)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Conflict(format!(
                    "template {} exists",
                    template.id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(template_id = %template.id, "Point template inserted");
        Ok(())
    }
}
