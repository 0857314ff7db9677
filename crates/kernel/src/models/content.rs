//! Content model and per-kind payload rows.
//!
//! A content row is the generic container (topic, author, kind tag,
//! description, creation metadata); the kind-specific data lives in a
//! one-to-one payload row selected by the tag. Payload rows are created
//! atomically with their content row by the content pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// Generic content container row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Content {
    /// Unique identifier.
    pub id: i64,

    /// Topic this content is attached to.
    pub topic_id: i64,

    /// Author profile ID.
    pub author_id: i64,

    /// Content kind tag (a key of the content type registry).
    pub kind: String,

    /// Free-text description.
    pub description: String,

    /// Language code.
    pub language: String,

    /// When set, the content may not be edited anymore.
    pub readonly: bool,

    /// Visible in courses that do not require registration.
    pub public: bool,

    /// Storage URI of the rendered preview image, if one exists.
    pub preview_uri: Option<String>,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for creating a content row.
#[derive(Debug, Clone)]
pub struct CreateContent {
    pub topic_id: i64,
    pub author_id: i64,
    pub kind: String,
    pub description: String,
    pub language: String,
    pub public: bool,
}

/// Text payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TextPayload {
    pub content_id: i64,
    pub body: String,
    pub source: String,
    pub license: Option<String>,
}

/// LaTeX payload with the PDF compiled at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LatexPayload {
    pub content_id: i64,
    pub body: String,
    pub source: String,
    pub pdf_uri: String,
}

/// Markdown payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarkdownPayload {
    pub content_id: i64,
    pub body: String,
    pub source: String,
}

/// Single-image payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImagePayload {
    pub content_id: i64,
    pub image_uri: String,
    pub source: String,
    pub license: Option<String>,
}

/// Uploaded-PDF payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PdfPayload {
    pub content_id: i64,
    pub pdf_uri: String,
    pub source: String,
    pub license: Option<String>,
}

/// YouTube video payload with optional start/end offsets in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct YoutubePayload {
    pub content_id: i64,
    pub url: String,
    pub start_time: i32,
    pub end_time: i32,
}

/// Exercise payload: a task sheet and an optional solution sheet.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExercisePayload {
    pub content_id: i64,
    pub task_uri: String,
    pub solution_uri: Option<String>,
}

/// The kind-selected payload of a content row.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(TextPayload),
    Latex(LatexPayload),
    Markdown(MarkdownPayload),
    Image(ImagePayload),
    Pdf(PdfPayload),
    Youtube(YoutubePayload),
    Exercise(ExercisePayload),
}

/// An embedded image belonging to one content item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageAttachment {
    /// Unique identifier.
    pub id: i64,

    /// Content this attachment belongs to.
    pub content_id: i64,

    /// Position referenced by `Image-<ordinal>` placeholders, 0-based.
    pub ordinal: i32,

    /// Storage URI of the image.
    pub image_uri: String,

    /// Source attribution.
    pub source: String,

    /// Optional license.
    pub license: Option<String>,
}

impl Content {
    /// Find a content row by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>> {
        let content = sqlx::query_as::<_, Self>(
            "SELECT id, topic_id, author_id, kind, description, language, readonly, public, preview_uri, created, changed FROM content WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch content by id")?;

        Ok(content)
    }

    /// List contents of a topic, newest first, optionally restricted to one kind.
    pub async fn list_by_topic(
        pool: &PgPool,
        topic_id: i64,
        kind: Option<&str>,
    ) -> Result<Vec<Self>> {
        let contents = match kind {
            Some(kind) => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, topic_id, author_id, kind, description, language, readonly, public, preview_uri, created, changed FROM content WHERE topic_id = $1 AND kind = $2 ORDER BY created DESC",
                )
                .bind(topic_id)
                .bind(kind)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT id, topic_id, author_id, kind, description, language, readonly, public, preview_uri, created, changed FROM content WHERE topic_id = $1 ORDER BY created DESC",
                )
                .bind(topic_id)
                .fetch_all(pool)
                .await
            }
        }
        .context("failed to list contents by topic")?;

        Ok(contents)
    }

    /// List contents of a topic ordered by average rating, best first.
    pub async fn list_by_topic_rated(pool: &PgPool, topic_id: i64) -> Result<Vec<Self>> {
        let contents = sqlx::query_as::<_, Self>(
            r#"
            SELECT c.id, c.topic_id, c.author_id, c.kind, c.description, c.language, c.readonly, c.public, c.preview_uri, c.created, c.changed
            FROM content c
            LEFT JOIN rating r ON r.content_id = c.id
            WHERE c.topic_id = $1
            GROUP BY c.id
            ORDER BY COALESCE(AVG(r.rating), -1) DESC, c.created DESC
            "#,
        )
        .bind(topic_id)
        .fetch_all(pool)
        .await
        .context("failed to list contents by rating")?;

        Ok(contents)
    }

    /// Insert a content row inside a transaction.
    pub async fn create(conn: &mut PgConnection, input: &CreateContent) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();

        let content = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO content (topic_id, author_id, kind, description, language, public, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, topic_id, author_id, kind, description, language, readonly, public, preview_uri, created, changed
            "#,
        )
        .bind(input.topic_id)
        .bind(input.author_id)
        .bind(&input.kind)
        .bind(&input.description)
        .bind(&input.language)
        .bind(input.public)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .context("failed to create content")?;

        Ok(content)
    }

    /// Record the rendered preview path.
    pub async fn set_preview(pool: &PgPool, id: i64, preview_uri: &str) -> Result<()> {
        sqlx::query("UPDATE content SET preview_uri = $1, changed = $2 WHERE id = $3")
            .bind(preview_uri)
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(pool)
            .await
            .context("failed to set content preview")?;

        Ok(())
    }

    /// Delete a content row. Payload, attachments, favorites, and ratings
    /// cascade with it.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete content")?;

        Ok(result.rows_affected() > 0)
    }
}

impl Payload {
    /// Load the payload row selected by the content's kind tag.
    ///
    /// Returns None when the kind is not in the registry or the payload row
    /// is missing; export degrades to a placeholder in that case.
    pub async fn load(pool: &PgPool, content: &Content) -> Result<Option<Self>> {
        let payload = match content.kind.as_str() {
            "textfield" => sqlx::query_as::<_, TextPayload>(
                "SELECT content_id, body, source, license FROM content_text WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch text payload")?
            .map(Payload::Text),
            "latex" => sqlx::query_as::<_, LatexPayload>(
                "SELECT content_id, body, source, pdf_uri FROM content_latex WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch latex payload")?
            .map(Payload::Latex),
            "markdown" => sqlx::query_as::<_, MarkdownPayload>(
                "SELECT content_id, body, source FROM content_markdown WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch markdown payload")?
            .map(Payload::Markdown),
            "image" => sqlx::query_as::<_, ImagePayload>(
                "SELECT content_id, image_uri, source, license FROM content_image WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch image payload")?
            .map(Payload::Image),
            "pdf" => sqlx::query_as::<_, PdfPayload>(
                "SELECT content_id, pdf_uri, source, license FROM content_pdf WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch pdf payload")?
            .map(Payload::Pdf),
            "youtube" => sqlx::query_as::<_, YoutubePayload>(
                "SELECT content_id, url, start_time, end_time FROM content_youtube WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch youtube payload")?
            .map(Payload::Youtube),
            "exercise" => sqlx::query_as::<_, ExercisePayload>(
                "SELECT content_id, task_uri, solution_uri FROM content_exercise WHERE content_id = $1",
            )
            .bind(content.id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch exercise payload")?
            .map(Payload::Exercise),
            _ => None,
        };

        Ok(payload)
    }
}

impl Payload {
    /// Insert the payload row inside the content-creation transaction.
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<()> {
        match self {
            Payload::Text(p) => {
                sqlx::query(
                    "INSERT INTO content_text (content_id, body, source, license) VALUES ($1, $2, $3, $4)",
                )
                .bind(p.content_id)
                .bind(&p.body)
                .bind(&p.source)
                .bind(&p.license)
                .execute(&mut *conn)
                .await
                .context("failed to insert text payload")?;
            }
            Payload::Latex(p) => {
                sqlx::query(
                    "INSERT INTO content_latex (content_id, body, source, pdf_uri) VALUES ($1, $2, $3, $4)",
                )
                .bind(p.content_id)
                .bind(&p.body)
                .bind(&p.source)
                .bind(&p.pdf_uri)
                .execute(&mut *conn)
                .await
                .context("failed to insert latex payload")?;
            }
            Payload::Markdown(p) => {
                sqlx::query(
                    "INSERT INTO content_markdown (content_id, body, source) VALUES ($1, $2, $3)",
                )
                .bind(p.content_id)
                .bind(&p.body)
                .bind(&p.source)
                .execute(&mut *conn)
                .await
                .context("failed to insert markdown payload")?;
            }
            Payload::Image(p) => {
                sqlx::query(
                    "INSERT INTO content_image (content_id, image_uri, source, license) VALUES ($1, $2, $3, $4)",
                )
                .bind(p.content_id)
                .bind(&p.image_uri)
                .bind(&p.source)
                .bind(&p.license)
                .execute(&mut *conn)
                .await
                .context("failed to insert image payload")?;
            }
            Payload::Pdf(p) => {
                sqlx::query(
                    "INSERT INTO content_pdf (content_id, pdf_uri, source, license) VALUES ($1, $2, $3, $4)",
                )
                .bind(p.content_id)
                .bind(&p.pdf_uri)
                .bind(&p.source)
                .bind(&p.license)
                .execute(&mut *conn)
                .await
                .context("failed to insert pdf payload")?;
            }
            Payload::Youtube(p) => {
                sqlx::query(
                    "INSERT INTO content_youtube (content_id, url, start_time, end_time) VALUES ($1, $2, $3, $4)",
                )
                .bind(p.content_id)
                .bind(&p.url)
                .bind(p.start_time)
                .bind(p.end_time)
                .execute(&mut *conn)
                .await
                .context("failed to insert youtube payload")?;
            }
            Payload::Exercise(p) => {
                sqlx::query(
                    "INSERT INTO content_exercise (content_id, task_uri, solution_uri) VALUES ($1, $2, $3)",
                )
                .bind(p.content_id)
                .bind(&p.task_uri)
                .bind(&p.solution_uri)
                .execute(&mut *conn)
                .await
                .context("failed to insert exercise payload")?;
            }
        }

        Ok(())
    }
}

impl LatexPayload {
    /// Record the PDF compiled from the LaTeX body at ingest time.
    pub async fn set_pdf(pool: &PgPool, content_id: i64, pdf_uri: &str) -> Result<()> {
        sqlx::query("UPDATE content_latex SET pdf_uri = $1 WHERE content_id = $2")
            .bind(pdf_uri)
            .bind(content_id)
            .execute(pool)
            .await
            .context("failed to set latex pdf")?;

        Ok(())
    }
}

impl YoutubePayload {
    /// Video ID extracted from the `v` query parameter.
    pub fn video_id(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    }
}

impl ImageAttachment {
    /// List attachments of a content item in ordinal order.
    pub async fn list_for_content(pool: &PgPool, content_id: i64) -> Result<Vec<Self>> {
        let attachments = sqlx::query_as::<_, Self>(
            "SELECT id, content_id, ordinal, image_uri, source, license FROM image_attachment WHERE content_id = $1 ORDER BY ordinal",
        )
        .bind(content_id)
        .fetch_all(pool)
        .await
        .context("failed to list image attachments")?;

        Ok(attachments)
    }

    /// Insert an attachment inside a transaction.
    pub async fn create(
        conn: &mut PgConnection,
        content_id: i64,
        ordinal: i32,
        image_uri: &str,
        source: &str,
        license: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO image_attachment (content_id, ordinal, image_uri, source, license) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(content_id)
        .bind(ordinal)
        .bind(image_uri)
        .bind(source)
        .bind(license)
        .execute(&mut *conn)
        .await
        .context("failed to insert image attachment")?;

        Ok(())
    }
}
