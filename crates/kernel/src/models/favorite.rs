//! Favorite model: a user's personal coursebook selection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Content;

/// A (user, course, content) selection row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    /// Unique identifier.
    pub id: i64,

    /// Selecting user.
    pub profile_id: i64,

    /// Course the selection belongs to.
    pub course_id: i64,

    /// Selected content.
    pub content_id: i64,
}

impl Favorite {
    /// Mark a content item for a user's coursebook. Idempotent.
    pub async fn add(pool: &PgPool, profile_id: i64, course_id: i64, content_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorite (profile_id, course_id, content_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (profile_id, course_id, content_id) DO NOTHING
            "#,
        )
        .bind(profile_id)
        .bind(course_id)
        .bind(content_id)
        .execute(pool)
        .await
        .context("failed to add favorite")?;

        Ok(())
    }

    /// Remove a content item from a user's coursebook.
    pub async fn remove(
        pool: &PgPool,
        profile_id: i64,
        course_id: i64,
        content_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM favorite WHERE profile_id = $1 AND course_id = $2 AND content_id = $3",
        )
        .bind(profile_id)
        .bind(course_id)
        .bind(content_id)
        .execute(pool)
        .await
        .context("failed to remove favorite")?;

        Ok(result.rows_affected() > 0)
    }

    /// Favorited contents of a user in a course, in insertion order.
    ///
    /// This is the export iteration order; it is not guaranteed to match
    /// the course structure order.
    pub async fn contents_for_export(
        pool: &PgPool,
        profile_id: i64,
        course_id: i64,
    ) -> Result<Vec<Content>> {
        let contents = sqlx::query_as::<_, Content>(
            r#"
            SELECT c.id, c.topic_id, c.author_id, c.kind, c.description, c.language, c.readonly, c.public, c.preview_uri, c.created, c.changed
            FROM content c
            INNER JOIN favorite f ON f.content_id = c.id
            WHERE f.profile_id = $1 AND f.course_id = $2
            ORDER BY f.id
            "#,
        )
        .bind(profile_id)
        .bind(course_id)
        .fetch_all(pool)
        .await
        .context("failed to list favorited contents")?;

        Ok(contents)
    }
}
