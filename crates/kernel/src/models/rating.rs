//! Content rating model.
//!
//! Rating CRUD lives outside the core; the kernel only reads aggregates
//! for content listings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A single user rating of a content item, 1 to 5.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    /// Rating user.
    pub profile_id: i64,

    /// Rated content.
    pub content_id: i64,

    /// Rating value, 1..=5.
    pub rating: i16,
}

impl Rating {
    /// Average rating of a content item, or None when unrated.
    pub async fn average_for_content(pool: &PgPool, content_id: i64) -> Result<Option<f64>> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(rating)::float8 FROM rating WHERE content_id = $1")
                .bind(content_id)
                .fetch_one(pool)
                .await
                .context("failed to compute average rating")?;

        Ok(average)
    }

    /// Number of ratings of a content item.
    pub async fn count_for_content(pool: &PgPool, content_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rating WHERE content_id = $1")
            .bind(content_id)
            .fetch_one(pool)
            .await
            .context("failed to count ratings")?;

        Ok(count)
    }
}
