//! Course structure entry model.
//!
//! A structure entry ties a topic to a course at a (position, sub_position)
//! slot. Positions are 1-based and dense at both levels; sub_position 0 is
//! the sentinel for a main topic. Entries are written exclusively by the
//! structure reconciler, which owns the dense-numbering invariant.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// A (course, topic, position) row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StructureEntry {
    /// Unique identifier.
    pub id: i64,

    /// Course this entry belongs to.
    pub course_id: i64,

    /// Topic at this position.
    pub topic_id: i64,

    /// Main position, 1-based.
    pub position: i32,

    /// Sub position, 1-based; 0 for a main topic.
    pub sub_position: i32,
}

/// Structure entry joined with its topic for listing and serialization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StructureEntryRow {
    pub topic_id: i64,
    pub position: i32,
    pub sub_position: i32,
    pub topic_title: String,
    pub category_title: String,
}

impl StructureEntry {
    /// List entries for a course in structure order (mains before their subs).
    pub async fn list_for_course(pool: &PgPool, course_id: i64) -> Result<Vec<StructureEntryRow>> {
        let rows = sqlx::query_as::<_, StructureEntryRow>(
            r#"
            SELECT s.topic_id, s.position, s.sub_position, t.title AS topic_title, c.title AS category_title
            FROM structure_entry s
            INNER JOIN topic t ON t.id = s.topic_id
            INNER JOIN category c ON c.id = t.category_id
            WHERE s.course_id = $1
            ORDER BY s.position, s.sub_position
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
        .context("failed to list structure entries")?;

        Ok(rows)
    }

    /// Topic IDs currently referenced by a course's structure.
    pub async fn topic_ids_for_course(
        conn: &mut PgConnection,
        course_id: i64,
    ) -> Result<Vec<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT topic_id FROM structure_entry WHERE course_id = $1")
                .bind(course_id)
                .fetch_all(&mut *conn)
                .await
                .context("failed to fetch referenced topic ids")?;

        Ok(ids)
    }

    /// Point the slot at the given topic, updating an existing entry in
    /// place (preserving row identity) or inserting a new one.
    pub async fn set_slot(
        conn: &mut PgConnection,
        course_id: i64,
        position: i32,
        sub_position: i32,
        topic_id: i64,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE structure_entry SET topic_id = $1 WHERE course_id = $2 AND position = $3 AND sub_position = $4",
        )
        .bind(topic_id)
        .bind(course_id)
        .bind(position)
        .bind(sub_position)
        .execute(&mut *conn)
        .await
        .context("failed to update structure entry")?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO structure_entry (course_id, topic_id, position, sub_position) VALUES ($1, $2, $3, $4)",
            )
            .bind(course_id)
            .bind(topic_id)
            .bind(position)
            .bind(sub_position)
            .execute(&mut *conn)
            .await
            .context("failed to insert structure entry")?;
        }

        Ok(())
    }

    /// Delete the entry at a slot. Returns true if a row existed there.
    pub async fn delete_slot(
        conn: &mut PgConnection,
        course_id: i64,
        position: i32,
        sub_position: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM structure_entry WHERE course_id = $1 AND position = $2 AND sub_position = $3",
        )
        .bind(course_id)
        .bind(position)
        .bind(sub_position)
        .execute(&mut *conn)
        .await
        .context("failed to delete structure entry")?;

        Ok(result.rows_affected() > 0)
    }

}
