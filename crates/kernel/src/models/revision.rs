//! Revision store interface.
//!
//! The core submits entity snapshots and receives an opaque version id
//! back; diffing and the history UI live behind this seam. The default
//! implementation appends to a database table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Entity kinds tracked by the revision store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionEntity {
    Course,
    Content,
}

impl RevisionEntity {
    fn as_str(self) -> &'static str {
        match self {
            RevisionEntity::Course => "course",
            RevisionEntity::Content => "content",
        }
    }
}

/// A stored revision record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Revision {
    /// Opaque version id (UUIDv7).
    pub id: Uuid,

    /// Entity kind.
    pub entity: String,

    /// Entity primary key.
    pub entity_id: i64,

    /// Author of the mutation.
    pub author_id: i64,

    /// JSON snapshot of the entity after the mutation.
    pub snapshot: serde_json::Value,

    /// Unix timestamp when recorded.
    pub created: i64,
}

/// Seam to the revisioned object store.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    /// Record a mutation snapshot; returns the opaque version id.
    async fn record(
        &self,
        entity: RevisionEntity,
        entity_id: i64,
        author_id: i64,
        snapshot: serde_json::Value,
    ) -> Result<Uuid>;
}

/// Database-backed revision store.
pub struct DbRevisionStore {
    pool: PgPool,
}

impl DbRevisionStore {
    /// Create a new database-backed revision store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List revisions of an entity, newest first.
    pub async fn list(&self, entity: RevisionEntity, entity_id: i64) -> Result<Vec<Revision>> {
        let revisions = sqlx::query_as::<_, Revision>(
            "SELECT id, entity, entity_id, author_id, snapshot, created FROM revision WHERE entity = $1 AND entity_id = $2 ORDER BY created DESC",
        )
        .bind(entity.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list revisions")?;

        Ok(revisions)
    }
}

#[async_trait]
impl RevisionStore for DbRevisionStore {
    async fn record(
        &self,
        entity: RevisionEntity,
        entity_id: i64,
        author_id: i64,
        snapshot: serde_json::Value,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO revision (id, entity, entity_id, author_id, snapshot, created) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(entity.as_str())
        .bind(entity_id)
        .bind(author_id)
        .bind(&snapshot)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to record revision")?;

        tracing::debug!(entity = entity.as_str(), entity_id, revision = %id, "revision recorded");
        Ok(id)
    }
}
