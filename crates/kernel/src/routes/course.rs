//! Course routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{Category, Course, CreateCourse, StructureEntry};
use crate::session::CurrentUser;
use crate::state::AppState;
use crate::structure::StructureIndex;

/// Build the course router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/categories", get(list_categories))
        .route("/api/course/{id}", get(course_detail))
        .route("/api/course/{id}/topics", post(create_topic))
}

#[derive(Debug, Serialize)]
struct TopicListing {
    index: String,
    is_sub: bool,
    topic_id: i64,
    title: String,
    display: String,
}

#[derive(Debug, Serialize)]
struct CourseDetail {
    #[serde(flatten)]
    course: Course,
    topics: Vec<TopicListing>,
}

async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(Course::list(state.db()).await?))
}

async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(Category::list(state.db()).await?))
}

async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCourse>,
) -> AppResult<Json<Course>> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("course title must not be empty".to_string()));
    }

    let course = Course::create(state.db(), input, user.id).await?;
    Ok(Json(course))
}

/// Course detail with its (sub-)topics in structure order.
async fn course_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CourseDetail>> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let topics = StructureEntry::list_for_course(state.db(), id)
        .await?
        .into_iter()
        .map(|row| {
            let index = StructureIndex::from_columns(row.position, row.sub_position);
            TopicListing {
                index: index.to_string(),
                is_sub: index.is_sub(),
                topic_id: row.topic_id,
                title: row.topic_title.clone(),
                display: format!("{} ({})", row.topic_title, row.category_title),
            }
        })
        .collect();

    Ok(Json(CourseDetail { course, topics }))
}

#[derive(Debug, serde::Deserialize)]
struct CreateTopicRequest {
    title: String,
}

/// Create-or-get a topic by title for the structure editor's autocomplete.
///
/// The topic lands in the course's category; it only becomes part of the
/// structure once a structure edit references it.
async fn create_topic(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<CreateTopicRequest>,
) -> AppResult<Json<crate::models::Topic>> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("topic title must not be empty".to_string()));
    }

    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let topic = crate::models::Topic::get_or_create(state.db(), title, course.category_id).await?;
    Ok(Json(topic))
}
