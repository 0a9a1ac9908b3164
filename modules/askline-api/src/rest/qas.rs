use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use askline_common::{AsklineError, Qa};
use askline_core::CourseStore;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    course_id: Uuid,
    #[serde(default)]
    published_only: bool,
}

#[derive(Deserialize)]
pub struct CreateQa {
    course_id: Uuid,
    class_id: Option<Uuid>,
    question: String,
    answer: String,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    related_question_ids: Vec<Uuid>,
    created_by: String,
}

#[derive(Deserialize)]
pub struct UpdateQa {
    question: Option<String>,
    answer: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    related_question_ids: Option<Vec<Uuid>>,
    is_published: Option<bool>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let qas = state
        .qas
        .list_for_course(query.course_id, query.published_only)
        .await?;
    Ok(envelope::data(qas))
}

pub async fn create(State(state): State<Arc<AppState>>, Json(body): Json<CreateQa>) -> ApiResult {
    if state.courses.get_course(body.course_id).await?.is_none() {
        return Err(AsklineError::InvalidCourse(body.course_id.to_string()).into());
    }
    if body.question.trim().is_empty() || body.answer.trim().is_empty() {
        return Err(AsklineError::Validation("question and answer are required".into()).into());
    }
    let now = Utc::now();
    let qa = state
        .qas
        .create(&Qa {
            id: Uuid::new_v4(),
            course_id: body.course_id,
            class_id: body.class_id,
            question: body.question.trim().to_string(),
            answer: body.answer.trim().to_string(),
            category: body.category,
            tags: body.tags,
            related_question_ids: body.related_question_ids,
            is_published: false,
            publish_date: None,
            created_by: body.created_by,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(envelope::data(qa))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let qa = state
        .qas
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("qa {id}")))?;
    Ok(envelope::data(qa))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQa>,
) -> ApiResult {
    let mut qa = state
        .qas
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("qa {id}")))?;

    if let Some(question) = body.question {
        qa.question = question;
    }
    if let Some(answer) = body.answer {
        qa.answer = answer;
    }
    if body.category.is_some() {
        qa.category = body.category;
    }
    if let Some(tags) = body.tags {
        qa.tags = tags;
    }
    if let Some(related_question_ids) = body.related_question_ids {
        qa.related_question_ids = related_question_ids;
    }
    if let Some(is_published) = body.is_published {
        qa.is_published = is_published;
        if is_published && qa.publish_date.is_none() {
            qa.publish_date = Some(Utc::now());
        }
    }

    state.qas.update(&qa).await?;
    Ok(envelope::data(qa))
}

pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    if !state.qas.delete(id).await? {
        return Err(AsklineError::NotFound(format!("qa {id}")).into());
    }
    Ok(envelope::message("qa deleted"))
}
