//! Favorite routes: mark and unmark content for the personal coursebook.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};

use crate::error::{AppError, AppResult};
use crate::models::{Content, Course, Favorite};
use crate::session::CurrentUser;
use crate::state::AppState;

/// Build the favorite router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/course/{course_id}/content/{content_id}/favorite",
            put(add_favorite).delete(remove_favorite),
        )
        .route("/api/course/{id}/favorites", get(list_favorites))
}

async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> AppResult<Json<serde_json::Value>> {
    let course = Course::find_by_id(state.db(), course_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Content::find_by_id(state.db(), content_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Favorite::add(state.db(), user.id, course.id, content_id).await?;
    Ok(Json(serde_json::json!({ "favorited": true })))
}

async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = Favorite::remove(state.db(), user.id, course_id, content_id).await?;
    Ok(Json(serde_json::json!({ "favorited": false, "removed": removed })))
}

/// The user's favorited contents in a course, in insertion order.
async fn list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Content>>> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let contents = Favorite::contents_for_export(state.db(), user.id, course.id).await?;
    Ok(Json(contents))
}
