//! Course, category, and period models.
//!
//! Categories and periods are simple classification entities; courses group
//! topics under a category and carry the ownership list that gates
//! structure edits.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A category grouping courses and topics.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier.
    pub id: i64,

    /// Category title.
    pub title: String,

    /// Optional title image (storage URI).
    pub image_uri: Option<String>,
}

/// A teaching period (semester, term).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Period {
    /// Unique identifier.
    pub id: i64,

    /// Period title.
    pub title: String,

    /// First day of the period.
    pub start_date: NaiveDate,

    /// Last day of the period.
    pub end_date: NaiveDate,
}

/// Course record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    /// Unique identifier.
    pub id: i64,

    /// Course title (unique).
    pub title: String,

    /// Course description.
    pub description: String,

    /// Category this course belongs to.
    pub category_id: i64,

    /// Optional teaching period.
    pub period_id: Option<i64>,

    /// Optional title image (storage URI).
    pub image_uri: Option<String>,

    /// When set, only owners may edit the course structure.
    pub restrict_changes: bool,

    /// Unix timestamp when created.
    pub created: i64,
}

/// Input for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub period_id: Option<i64>,
    pub restrict_changes: Option<bool>,
}

impl Category {
    /// Find a category by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let category =
            sqlx::query_as::<_, Self>("SELECT id, title, image_uri FROM category WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch category")?;

        Ok(category)
    }

    /// List all categories ordered by title.
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let categories =
            sqlx::query_as::<_, Self>("SELECT id, title, image_uri FROM category ORDER BY title")
                .fetch_all(pool)
                .await
                .context("failed to list categories")?;

        Ok(categories)
    }
}

impl Course {
    /// Find a course by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let course = sqlx::query_as::<_, Self>(
            "SELECT id, title, description, category_id, period_id, image_uri, restrict_changes, created FROM course WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch course by id")?;

        Ok(course)
    }

    /// List all courses ordered by title.
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let courses = sqlx::query_as::<_, Self>(
            "SELECT id, title, description, category_id, period_id, image_uri, restrict_changes, created FROM course ORDER BY title",
        )
        .fetch_all(pool)
        .await
        .context("failed to list courses")?;

        Ok(courses)
    }

    /// Create a new course owned by the given profile.
    pub async fn create(pool: &PgPool, input: CreateCourse, owner_id: i64) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await.context("failed to start transaction")?;

        let course = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO course (title, description, category_id, period_id, restrict_changes, created)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, category_id, period_id, image_uri, restrict_changes, created
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.period_id)
        .bind(input.restrict_changes.unwrap_or(false))
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("failed to create course")?;

        sqlx::query("INSERT INTO course_owner (course_id, profile_id) VALUES ($1, $2)")
            .bind(course.id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .context("failed to add course owner")?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(course)
    }

    /// Check if a profile owns this course.
    pub async fn is_owner(&self, pool: &PgPool, profile_id: i64) -> Result<bool> {
        let owner: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM course_owner WHERE course_id = $1 AND profile_id = $2)",
        )
        .bind(self.id)
        .bind(profile_id)
        .fetch_one(pool)
        .await
        .context("failed to check course ownership")?;

        Ok(owner)
    }
}
