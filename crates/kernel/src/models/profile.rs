//! User profile model.
//!
//! Authentication itself is delegated to the identity provider in front of
//! the application; profiles are provisioned on first sight of an
//! authenticated username.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// User profile record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Unique identifier.
    pub id: i64,

    /// Username as supplied by the identity provider.
    pub username: String,

    /// Human-readable display name.
    pub display_name: String,

    /// Optional free-text biography.
    pub biography: Option<String>,

    /// Unix timestamp when created.
    pub created: i64,
}

impl Profile {
    /// Find a profile by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let profile = sqlx::query_as::<_, Self>(
            "SELECT id, username, display_name, biography, created FROM profile WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch profile by id")?;

        Ok(profile)
    }

    /// Find a profile by username.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let profile = sqlx::query_as::<_, Self>(
            "SELECT id, username, display_name, biography, created FROM profile WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("failed to fetch profile by username")?;

        Ok(profile)
    }

    /// Get a profile for an authenticated username, provisioning it if new.
    ///
    /// The display name defaults to the username until the user edits it.
    pub async fn get_or_provision(pool: &PgPool, username: &str) -> Result<Self> {
        if let Some(profile) = Self::find_by_username(pool, username).await? {
            return Ok(profile);
        }

        let now = chrono::Utc::now().timestamp();

        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO profile (username, display_name, created)
            VALUES ($1, $1, $2)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username, display_name, biography, created
            "#,
        )
        .bind(username)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to provision profile")?;

        tracing::info!(username = %username, "profile provisioned");
        Ok(profile)
    }
}
