//! Coursebook export route.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::export::ExportItem;
use crate::models::{Course, Favorite, ImageAttachment, Payload, Topic};
use crate::session::CurrentUser;
use crate::state::AppState;

use super::content::pdf_response;

/// Build the export router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/course/{id}/coursebook", get(export_coursebook))
}

/// Compile the user's favorited content in a course into one PDF.
///
/// Items are exported in favorite insertion order, which is not
/// guaranteed to match the course structure order.
async fn export_coursebook(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let contents = Favorite::contents_for_export(state.db(), user.id, course.id).await?;

    let mut items = Vec::with_capacity(contents.len());
    for content in contents {
        let payload = Payload::load(state.db(), &content).await?;
        let attachments = ImageAttachment::list_for_content(state.db(), content.id).await?;
        let topic_title = Topic::find_by_id(state.db(), content.topic_id)
            .await?
            .map(|topic| topic.title)
            .unwrap_or_default();

        items.push(ExportItem {
            content,
            payload,
            attachments,
            topic_title,
        });
    }

    let document = state
        .compositor()
        .compose_coursebook(&course, &user, &items)
        .await?;

    info!(
        course_id = course.id,
        user = %user.username,
        items = items.len(),
        errors = document.errors.len(),
        "coursebook exported"
    );

    pdf_response(document.pdf, "coursebook.pdf")
}
