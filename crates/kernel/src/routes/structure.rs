//! Course structure routes.
//!
//! The client edits the structure as a nested JSON tree; the reconciler
//! keeps the flat persisted form in sync with it.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{Course, RevisionEntity};
use crate::session::CurrentUser;
use crate::state::AppState;
use crate::structure::{self, TopicNode};

/// Build the structure router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/course/{id}/structure",
        get(get_structure).put(put_structure),
    )
}

/// The course structure in nested wire form.
async fn get_structure(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<TopicNode>>> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let nested = structure::to_nested(state.db(), course.id).await?;
    Ok(Json(nested))
}

/// Replace the course structure with the submitted tree.
///
/// Concurrent edits to the same course are last-write-wins; the
/// transaction inside the reconciler keeps the dense-index invariant
/// intact either way.
async fn put_structure(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(tree): Json<Vec<TopicNode>>,
) -> AppResult<Json<Vec<TopicNode>>> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    if course.restrict_changes && !course.is_owner(state.db(), user.id).await? {
        return Err(AppError::Forbidden);
    }

    structure::apply(state.db(), course.id, &tree).await?;

    state
        .revisions()
        .record(
            RevisionEntity::Course,
            course.id,
            user.id,
            json!({ "structure": tree }),
        )
        .await?;

    let nested = structure::to_nested(state.db(), course.id).await?;
    Ok(Json(nested))
}
