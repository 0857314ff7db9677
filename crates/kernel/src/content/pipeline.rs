//! Content pipeline: validate, persist, compile, preview.
//!
//! One entry point per content mutation. Validation happens before any
//! write; the content row, its payload, and its attachments are persisted
//! in a single transaction. LaTeX bodies are compiled to PDF at ingest,
//! and PDF-backed payloads get a first-page raster preview.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::export::{ExportCompositor, ExportItem};
use crate::file::FileService;
use crate::models::{
    Content, CreateContent, ExercisePayload, ImageAttachment, ImagePayload, LatexPayload,
    MarkdownPayload, Payload, PdfPayload, Profile, RevisionEntity, RevisionStore, TextPayload,
    Topic, YoutubePayload,
};

use super::preview::{PreviewGenerator, previewable};
use super::validate::{validate_image, validate_pdf};
use super::{ContentError, is_known, resolve};

/// An uploaded file from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One attachment row from the add-content formset.
#[derive(Debug, Clone, Default)]
pub struct AttachmentUpload {
    pub image: Option<UploadedFile>,
    pub source: String,
    pub license: Option<String>,
}

/// Raw fields of an add-content submission.
#[derive(Debug, Clone, Default)]
pub struct ContentSubmission {
    pub kind: String,
    pub description: String,
    pub language: String,
    pub public: bool,
    pub body: Option<String>,
    pub source: Option<String>,
    pub license: Option<String>,
    pub url: Option<String>,
    pub start_time: Option<i32>,
    pub end_time: Option<i32>,
    pub file: Option<UploadedFile>,
    pub solution: Option<UploadedFile>,
    pub attachments: Vec<AttachmentUpload>,
}

/// Per-kind content operations.
pub struct ContentPipeline {
    pool: PgPool,
    files: Arc<FileService>,
    previews: Arc<PreviewGenerator>,
    compositor: Arc<ExportCompositor>,
    revisions: Arc<dyn RevisionStore>,
}

impl ContentPipeline {
    /// Create a new content pipeline.
    pub fn new(
        pool: PgPool,
        files: Arc<FileService>,
        previews: Arc<PreviewGenerator>,
        compositor: Arc<ExportCompositor>,
        revisions: Arc<dyn RevisionStore>,
    ) -> Self {
        Self {
            pool,
            files,
            previews,
            compositor,
            revisions,
        }
    }

    /// Validate an add-content submission and persist it.
    ///
    /// The content row, its payload, and its attachments are written in
    /// one transaction; nothing persists if validation fails. Returns the
    /// created content row with preview and ingest compilation already
    /// applied.
    pub async fn validate_and_store(
        &self,
        topic: &Topic,
        author: &Profile,
        submission: ContentSubmission,
    ) -> Result<Content, ContentError> {
        if !is_known(&submission.kind) {
            return Err(ContentError::UnknownKind(submission.kind));
        }

        let descriptor = resolve(&submission.kind);

        // Formsets do not validate untouched rows, so empty attachment
        // rows must be rejected here rather than silently dropped.
        if !submission.attachments.is_empty() && !descriptor.allows_attachments {
            return Err(ContentError::AttachmentsNotAllowed(submission.kind));
        }
        for (index, attachment) in submission.attachments.iter().enumerate() {
            match &attachment.image {
                Some(image) if !image.is_empty() => validate_image(&image.data)?,
                _ => return Err(ContentError::EmptyAttachment(index)),
            }
        }

        let stored = self.store_payload_files(&submission).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start content transaction")?;

        let content = Content::create(
            &mut *tx,
            &CreateContent {
                topic_id: topic.id,
                author_id: author.id,
                kind: submission.kind.clone(),
                description: submission.description.clone(),
                language: if submission.language.is_empty() {
                    "en".to_string()
                } else {
                    submission.language.clone()
                },
                public: submission.public,
            },
        )
        .await?;

        let payload = self.build_payload(content.id, &submission, stored)?;
        payload.insert(&mut *tx).await?;

        for (index, attachment) in submission.attachments.iter().enumerate() {
            let image = attachment
                .image
                .as_ref()
                .ok_or(ContentError::EmptyAttachment(index))?;
            let uri = self
                .files
                .store("contents", &image.filename, &image.data)
                .await?;
            ImageAttachment::create(
                &mut *tx,
                content.id,
                index as i32,
                &uri,
                &attachment.source,
                attachment.license.as_deref(),
            )
            .await?;
        }

        tx.commit()
            .await
            .context("failed to commit content transaction")?;

        // Post-persist steps: ingest compilation for LaTeX bodies, then
        // the raster preview for PDF-backed payloads.
        let payload = self.compile_if_latex(topic, author, &content, payload).await?;
        self.generate_preview(&content, &payload).await?;

        let snapshot = serde_json::to_value(&content).context("failed to snapshot content")?;
        self.revisions
            .record(RevisionEntity::Content, content.id, author.id, snapshot)
            .await?;

        info!(content_id = content.id, kind = %content.kind, topic_id = topic.id, "content stored");
        Ok(content)
    }

    /// Generate and record the preview image for a content item.
    ///
    /// Kinds without a preview capability return Ok(None); callers must
    /// not treat that as an error.
    pub async fn generate_preview(
        &self,
        content: &Content,
        payload: &Payload,
    ) -> Result<Option<String>, ContentError> {
        let Some(source) = previewable(payload) else {
            return Ok(None);
        };

        let topic = Topic::find_by_id(&self.pool, content.topic_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("content topic vanished"))?;
        let category = topic.display_string(&self.pool).await?;
        // Preview name is <topic>_<category>; collisions across topics in
        // the same category overwrite each other (known limitation).
        let stem = format!("{}_{}", topic.title, category_part(&category));

        match self.previews.generate(source.preview_pdf_uri(), &stem).await {
            Ok(uri) => {
                Content::set_preview(&self.pool, content.id, &uri).await?;
                Ok(Some(uri))
            }
            Err(e) => {
                // A missing preview never blocks the content itself.
                warn!(content_id = content.id, error = %e, "preview generation failed");
                Ok(None)
            }
        }
    }

    /// Render a content item's export fragment.
    pub fn render_export_fragment(&self, item: &ExportItem, export_pdf: bool) -> Vec<u8> {
        self.compositor.render_fragment(item, export_pdf)
    }

    /// Store the uploaded files a submission carries, after validating them.
    async fn store_payload_files(
        &self,
        submission: &ContentSubmission,
    ) -> Result<StoredFiles, ContentError> {
        let mut stored = StoredFiles::default();

        match submission.kind.as_str() {
            "image" => {
                let file = require_file(submission.file.as_ref(), "image")?;
                validate_image(&file.data)?;
                stored.primary = Some(self.files.store("contents", &file.filename, &file.data).await?);
            }
            "pdf" => {
                let file = require_file(submission.file.as_ref(), "pdf")?;
                validate_pdf(&file.filename, &file.data)?;
                stored.primary = Some(self.files.store("contents", &file.filename, &file.data).await?);
            }
            "exercise" => {
                let task = require_file(submission.file.as_ref(), "task")?;
                validate_pdf(&task.filename, &task.data)?;
                stored.primary = Some(self.files.store("contents", &task.filename, &task.data).await?);

                if let Some(solution) = submission.solution.as_ref().filter(|f| !f.is_empty()) {
                    validate_pdf(&solution.filename, &solution.data)?;
                    stored.solution =
                        Some(self.files.store("contents", &solution.filename, &solution.data).await?);
                }
            }
            _ => {}
        }

        Ok(stored)
    }

    /// Build the typed payload for the new content row.
    fn build_payload(
        &self,
        content_id: i64,
        submission: &ContentSubmission,
        stored: StoredFiles,
    ) -> Result<Payload, ContentError> {
        let payload = match submission.kind.as_str() {
            "textfield" => Payload::Text(TextPayload {
                content_id,
                body: require_text(submission.body.as_deref(), "body")?,
                source: submission.source.clone().unwrap_or_default(),
                license: submission.license.clone(),
            }),
            "latex" => Payload::Latex(LatexPayload {
                content_id,
                body: require_text(submission.body.as_deref(), "body")?,
                source: submission.source.clone().unwrap_or_default(),
                // Filled in by the ingest compilation step.
                pdf_uri: String::new(),
            }),
            "markdown" => Payload::Markdown(MarkdownPayload {
                content_id,
                body: require_text(submission.body.as_deref(), "body")?,
                source: submission.source.clone().unwrap_or_default(),
            }),
            "image" => Payload::Image(ImagePayload {
                content_id,
                image_uri: stored.primary.ok_or(ContentError::MissingField("image"))?,
                source: submission.source.clone().unwrap_or_default(),
                license: submission.license.clone(),
            }),
            "pdf" => Payload::Pdf(PdfPayload {
                content_id,
                pdf_uri: stored.primary.ok_or(ContentError::MissingField("pdf"))?,
                source: submission.source.clone().unwrap_or_default(),
                license: submission.license.clone(),
            }),
            "youtube" => {
                let url = require_text(submission.url.as_deref(), "url")?;
                if !is_youtube_url(&url) {
                    return Err(ContentError::InvalidVideoUrl(url));
                }
                Payload::Youtube(YoutubePayload {
                    content_id,
                    url,
                    start_time: submission.start_time.unwrap_or(0),
                    end_time: submission.end_time.unwrap_or(0),
                })
            }
            "exercise" => Payload::Exercise(ExercisePayload {
                content_id,
                task_uri: stored.primary.ok_or(ContentError::MissingField("task"))?,
                solution_uri: stored.solution,
            }),
            other => return Err(ContentError::UnknownKind(other.to_string())),
        };

        Ok(payload)
    }

    /// Compile a LaTeX body to PDF and attach it to the payload.
    ///
    /// The single-item compose path is reused, so a body that fails to
    /// compile still yields a PDF carrying the diagnostics.
    async fn compile_if_latex(
        &self,
        topic: &Topic,
        author: &Profile,
        content: &Content,
        payload: Payload,
    ) -> Result<Payload, ContentError> {
        let mut latex = match payload {
            Payload::Latex(latex) => latex,
            other => return Ok(other),
        };

        let attachments = ImageAttachment::list_for_content(&self.pool, content.id).await?;
        let item = ExportItem {
            content: content.clone(),
            payload: Some(Payload::Latex(latex.clone())),
            attachments,
            topic_title: topic.title.clone(),
        };

        let document = self
            .compositor
            .compose_single(topic, author, &item)
            .await
            .map_err(|e| anyhow::anyhow!("ingest compilation failed: {e}"))?;

        let uri = self
            .files
            .store("contents", &format!("latex_{}.pdf", content.id), &document.pdf)
            .await?;
        LatexPayload::set_pdf(&self.pool, content.id, &uri).await?;
        latex.pdf_uri = uri;

        Ok(Payload::Latex(latex))
    }
}

/// Storage URIs of a submission's uploaded files.
#[derive(Debug, Default)]
struct StoredFiles {
    primary: Option<String>,
    solution: Option<String>,
}

fn require_file<'a>(
    file: Option<&'a UploadedFile>,
    field: &'static str,
) -> Result<&'a UploadedFile, ContentError> {
    file.filter(|f| !f.is_empty())
        .ok_or(ContentError::MissingField(field))
}

fn require_text(value: Option<&str>, field: &'static str) -> Result<String, ContentError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(ContentError::MissingField(field)),
    }
}

fn is_youtube_url(value: &str) -> bool {
    url::Url::parse(value)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .is_some_and(|host| {
            host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
        })
}

/// The category part of a "title (category)" display string.
fn category_part(display: &str) -> &str {
    display
        .rsplit_once('(')
        .map(|(_, rest)| rest.trim_end_matches(')'))
        .unwrap_or(display)
}

impl std::fmt::Debug for ContentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPipeline").finish()
    }
}
