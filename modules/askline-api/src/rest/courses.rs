use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use askline_common::{AsklineError, Course};
use askline_core::CourseStore;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Deserialize)]
pub struct CreateCourse {
    course_code: String,
    course_name: String,
    semester: String,
    description: Option<String>,
    #[serde(default)]
    teacher_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateCourse {
    course_code: Option<String>,
    course_name: Option<String>,
    semester: Option<String>,
    description: Option<String>,
    teacher_ids: Option<Vec<String>>,
    is_active: Option<bool>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let courses = state.courses.list(query.include_inactive).await?;
    Ok(envelope::data(courses))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCourse>,
) -> ApiResult {
    if body.course_code.trim().is_empty() || body.course_name.trim().is_empty() {
        return Err(AsklineError::Validation("course_code and course_name are required".into()).into());
    }
    let now = Utc::now();
    let course = state
        .courses
        .create(&Course {
            id: Uuid::new_v4(),
            course_code: body.course_code.trim().to_string(),
            course_name: body.course_name.trim().to_string(),
            semester: body.semester,
            description: body.description,
            teacher_ids: body.teacher_ids,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(envelope::data(course))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let course = state
        .courses
        .get_course(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("course {id}")))?;
    Ok(envelope::data(course))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCourse>,
) -> ApiResult {
    let mut course = state
        .courses
        .get_course(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("course {id}")))?;

    if let Some(course_code) = body.course_code {
        course.course_code = course_code;
    }
    if let Some(course_name) = body.course_name {
        course.course_name = course_name;
    }
    if let Some(semester) = body.semester {
        course.semester = semester;
    }
    if body.description.is_some() {
        course.description = body.description;
    }
    if let Some(teacher_ids) = body.teacher_ids {
        course.teacher_ids = teacher_ids;
    }
    if let Some(is_active) = body.is_active {
        course.is_active = is_active;
    }

    state.courses.update(&course).await?;
    Ok(envelope::data(course))
}

pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    if !state.courses.deactivate(id).await? {
        return Err(AsklineError::NotFound(format!("course {id}")).into());
    }
    Ok(envelope::message("course deactivated"))
}
