//! Topic model.
//!
//! Topics are created on demand when a structure edit references a new
//! title, and garbage-collected by the reconciler once no structure entry
//! references them anymore.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A named unit of content, positioned in course structures.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    /// Unique identifier.
    pub id: i64,

    /// Topic title.
    pub title: String,

    /// Category this topic belongs to.
    pub category_id: i64,
}

impl Topic {
    /// Find a topic by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let topic =
            sqlx::query_as::<_, Self>("SELECT id, title, category_id FROM topic WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch topic by id")?;

        Ok(topic)
    }

    /// Get a topic by title within a category, creating it if absent.
    ///
    /// Backs the autocomplete-create-or-get flow of the structure editor.
    pub async fn get_or_create(pool: &PgPool, title: &str, category_id: i64) -> Result<Self> {
        let existing = sqlx::query_as::<_, Self>(
            "SELECT id, title, category_id FROM topic WHERE title = $1 AND category_id = $2",
        )
        .bind(title)
        .bind(category_id)
        .fetch_optional(pool)
        .await
        .context("failed to look up topic by title")?;

        if let Some(topic) = existing {
            return Ok(topic);
        }

        let topic = sqlx::query_as::<_, Self>(
            "INSERT INTO topic (title, category_id) VALUES ($1, $2) RETURNING id, title, category_id",
        )
        .bind(title)
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("failed to create topic")?;

        tracing::debug!(topic_id = topic.id, title = %title, "topic created");
        Ok(topic)
    }

    /// Of the given IDs, return those that do not exist.
    pub async fn missing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM topic WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .context("failed to check topic existence")?;

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    /// Delete a topic if no structure entry references it in any course.
    ///
    /// Returns true if the topic was deleted. Contents attached to the
    /// topic cascade with it.
    pub async fn delete_if_unreferenced(conn: &mut sqlx::PgConnection, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM topic WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM structure_entry WHERE topic_id = $1)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("failed to garbage-collect topic")?;

        Ok(result.rows_affected() > 0)
    }

    /// Display string used in structure listings: "title (category)".
    pub async fn display_string(&self, pool: &PgPool) -> Result<String> {
        let category: String = sqlx::query_scalar("SELECT title FROM category WHERE id = $1")
            .bind(self.category_id)
            .fetch_one(pool)
            .await
            .context("failed to fetch topic category title")?;

        Ok(format!("{} ({})", self.title, category))
    }
}
