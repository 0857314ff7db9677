//! Content routes: add, view, compile, delete.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    routing::{get, post},
};
use serde::Serialize;

use crate::content::{AttachmentUpload, ContentSubmission, UploadedFile, render_markdown};
use crate::error::{AppError, AppResult};
use crate::export::ExportItem;
use crate::file::FileStorage;
use crate::models::{Content, ImageAttachment, Payload, Rating, Topic};
use crate::session::CurrentUser;
use crate::state::AppState;

/// Build the content router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/topic/{id}/content", post(add_content).get(list_content))
        .route("/api/content/{id}", get(view_content).delete(delete_content))
        .route("/api/content/{id}/pdf", get(content_pdf))
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
struct ContentResponse {
    #[serde(flatten)]
    content: Content,
    payload: Option<Payload>,
    /// Sanitized HTML for text-like kinds, None otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    body_html: Option<String>,
    attachments: Vec<AttachmentResponse>,
    rating: Option<f64>,
    rating_count: i64,
    preview_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct AttachmentResponse {
    ordinal: i32,
    url: String,
    source: String,
    license: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Add a content item to a topic from a multipart form.
async fn add_content(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<Content>> {
    let topic = Topic::find_by_id(state.db(), topic_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let submission = parse_submission(multipart).await?;
    let content = state
        .pipeline()
        .validate_and_store(&topic, &user, submission)
        .await?;

    Ok(Json(content))
}

#[derive(Debug, serde::Deserialize)]
struct ListQuery {
    kind: Option<String>,
    sort: Option<String>,
}

/// List a topic's contents, optionally filtered by kind or sorted by rating.
async fn list_content(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
    axum::extract::Query(query): axum::extract::Query<ListQuery>,
) -> AppResult<Json<Vec<Content>>> {
    let topic = Topic::find_by_id(state.db(), topic_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let contents = match query.sort.as_deref() {
        Some("rating") => Content::list_by_topic_rated(state.db(), topic.id).await?,
        _ => Content::list_by_topic(state.db(), topic.id, query.kind.as_deref()).await?,
    };

    Ok(Json(contents))
}

/// A content item with its payload, attachments, and rating aggregate.
async fn view_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ContentResponse>> {
    let content = Content::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let payload = Payload::load(state.db(), &content).await?;
    let attachments = ImageAttachment::list_for_content(state.db(), content.id).await?;
    let rating = Rating::average_for_content(state.db(), content.id).await?;
    let rating_count = Rating::count_for_content(state.db(), content.id).await?;

    let body_html = match &payload {
        Some(Payload::Markdown(markdown)) => Some(render_markdown(
            &markdown.body,
            &attachments,
            |attachment| state.storage().public_url(&attachment.image_uri),
        )),
        Some(Payload::Text(text)) => Some(ammonia::clean_text(&text.body)),
        _ => None,
    };

    let preview_url = content
        .preview_uri
        .as_deref()
        .map(|uri| state.storage().public_url(uri));

    let attachments = attachments
        .into_iter()
        .map(|attachment| AttachmentResponse {
            ordinal: attachment.ordinal,
            url: state.storage().public_url(&attachment.image_uri),
            source: attachment.source,
            license: attachment.license,
        })
        .collect();

    Ok(Json(ContentResponse {
        content,
        payload,
        body_html,
        attachments,
        rating: rating.filter(|_| rating_count > 0),
        rating_count,
        preview_url,
    }))
}

/// Compile a single content item to PDF and return it.
async fn content_pdf(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let content = Content::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;
    let topic = Topic::find_by_id(state.db(), content.topic_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let payload = Payload::load(state.db(), &content).await?;
    let attachments = ImageAttachment::list_for_content(state.db(), content.id).await?;

    let item = ExportItem {
        topic_title: topic.title.clone(),
        content,
        payload,
        attachments,
    };

    let document = state.compositor().compose_single(&topic, &user, &item).await?;

    pdf_response(document.pdf, "content.pdf")
}

/// Delete a content item. Only the author may delete, and not when the
/// content is marked read-only.
async fn delete_content(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let content = Content::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    if content.author_id != user.id {
        return Err(AppError::Forbidden);
    }
    if content.readonly {
        return Err(AppError::BadRequest("content is read-only".to_string()));
    }

    Content::delete(state.db(), id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// =============================================================================
// Helpers
// =============================================================================

/// Build a PDF download response.
pub(crate) fn pdf_response(pdf: Vec<u8>, filename: &str) -> AppResult<Response> {
    Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={filename}"),
        )
        .body(pdf.into())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build response: {e}")))
}

/// Collect the multipart form into a [`ContentSubmission`].
///
/// Attachment rows use `attachment-<n>-image`, `attachment-<n>-source`,
/// and `attachment-<n>-license` field names.
async fn parse_submission(mut multipart: Multipart) -> AppResult<ContentSubmission> {
    let mut submission = ContentSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(rest) = name.strip_prefix("attachment-") {
            let Some((index, attachment_field)) = rest.split_once('-') else {
                return Err(AppError::BadRequest(format!("bad attachment field: {name}")));
            };
            let index: usize = index
                .parse()
                .map_err(|_| AppError::BadRequest(format!("bad attachment index: {name}")))?;
            if submission.attachments.len() <= index {
                submission
                    .attachments
                    .resize_with(index + 1, AttachmentUpload::default);
            }

            match attachment_field {
                "image" => {
                    let filename = field.file_name().unwrap_or("attachment").to_string();
                    let data = read_field_bytes(field).await?;
                    submission.attachments[index].image = Some(UploadedFile { filename, data });
                }
                "source" => {
                    submission.attachments[index].source = read_field_text(field).await?;
                }
                "license" => {
                    submission.attachments[index].license = Some(read_field_text(field).await?);
                }
                other => {
                    return Err(AppError::BadRequest(format!(
                        "unknown attachment field: {other}"
                    )));
                }
            }
            continue;
        }

        match name.as_str() {
            "kind" => submission.kind = read_field_text(field).await?,
            "description" => submission.description = read_field_text(field).await?,
            "language" => submission.language = read_field_text(field).await?,
            "public" => submission.public = read_field_text(field).await? == "true",
            "body" => submission.body = Some(read_field_text(field).await?),
            "source" => submission.source = Some(read_field_text(field).await?),
            "license" => submission.license = Some(read_field_text(field).await?),
            "url" => submission.url = Some(read_field_text(field).await?),
            "start_time" => submission.start_time = Some(parse_seconds(field).await?),
            "end_time" => submission.end_time = Some(parse_seconds(field).await?),
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = read_field_bytes(field).await?;
                submission.file = Some(UploadedFile { filename, data });
            }
            "solution" => {
                let filename = field.file_name().unwrap_or("solution").to_string();
                let data = read_field_bytes(field).await?;
                submission.solution = Some(UploadedFile { filename, data });
            }
            other => {
                return Err(AppError::BadRequest(format!("unknown form field: {other}")));
            }
        }
    }

    Ok(submission)
}

async fn read_field_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid form field: {e}")))
}

async fn read_field_bytes(field: axum::extract::multipart::Field<'_>) -> AppResult<Vec<u8>> {
    Ok(field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid file upload: {e}")))?
        .to_vec())
}

async fn parse_seconds(field: axum::extract::multipart::Field<'_>) -> AppResult<i32> {
    read_field_text(field)
        .await?
        .parse()
        .map_err(|_| AppError::BadRequest("time offset must be a number of seconds".to_string()))
}
