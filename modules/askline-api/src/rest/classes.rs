use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use askline_common::{AsklineError, Class};
use askline_core::CourseStore;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    course_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateClass {
    course_id: Uuid,
    class_code: String,
    class_name: String,
    line_group_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateClass {
    class_code: Option<String>,
    class_name: Option<String>,
    line_group_id: Option<String>,
    is_active: Option<bool>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let classes = state.classes.list_for_course(query.course_id).await?;
    Ok(envelope::data(classes))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateClass>,
) -> ApiResult {
    if state.courses.get_course(body.course_id).await?.is_none() {
        return Err(AsklineError::InvalidCourse(body.course_id.to_string()).into());
    }
    if body.class_code.trim().is_empty() {
        return Err(AsklineError::Validation("class_code is required".into()).into());
    }
    let now = Utc::now();
    let class = state
        .classes
        .create(&Class {
            id: Uuid::new_v4(),
            course_id: body.course_id,
            class_code: body.class_code.trim().to_string(),
            class_name: body.class_name,
            line_group_id: body.line_group_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(envelope::data(class))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let class = state
        .classes
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("class {id}")))?;
    Ok(envelope::data(class))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClass>,
) -> ApiResult {
    let mut class = state
        .classes
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("class {id}")))?;

    if let Some(class_code) = body.class_code {
        class.class_code = class_code;
    }
    if let Some(class_name) = body.class_name {
        class.class_name = class_name;
    }
    if body.line_group_id.is_some() {
        class.line_group_id = body.line_group_id;
    }
    if let Some(is_active) = body.is_active {
        class.is_active = is_active;
    }

    state.classes.update(&class).await?;
    Ok(envelope::data(class))
}

pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    if !state.classes.deactivate(id).await? {
        return Err(AsklineError::NotFound(format!("class {id}")).into());
    }
    Ok(envelope::message("class deactivated"))
}
