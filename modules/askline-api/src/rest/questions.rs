use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use askline_common::{AsklineError, QuestionStatus};
use askline_core::QuestionStore;
use askline_store::QuestionFilter;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    course_id: Option<Uuid>,
    class_id: Option<Uuid>,
    status: Option<String>,
    cluster_id: Option<Uuid>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatusChange {
    status: String,
    reason: Option<String>,
}

#[derive(Deserialize)]
pub struct StatisticsQuery {
    course_id: Uuid,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    question_ids: Vec<Uuid>,
    qa_id: Uuid,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            QuestionStatus::parse(s)
                .ok_or_else(|| AsklineError::Validation(format!("unknown status: {s}")))
        })
        .transpose()?;

    let questions = state
        .question_store
        .list(&QuestionFilter {
            course_id: query.course_id,
            class_id: query.class_id,
            status,
            cluster_id: query.cluster_id,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(envelope::data(questions))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let question = state
        .lifecycle
        .questions()
        .get_question(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("question {id}")))?;
    Ok(envelope::data(question))
}

/// `PATCH /questions/{id}/status` — drives the lifecycle state machine.
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> ApiResult {
    let target = QuestionStatus::parse(&body.status)
        .ok_or_else(|| AsklineError::Validation(format!("unknown status: {}", body.status)))?;
    let question = state.lifecycle.transition(id, target, body.reason).await?;
    Ok(envelope::data(question))
}

/// `DELETE /questions/{id}` — logical deletion via the state machine.
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    state
        .lifecycle
        .transition(id, QuestionStatus::Deleted, None)
        .await?;
    Ok(envelope::message("question deleted"))
}

pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult {
    let stats = state.question_store.statistics(query.course_id).await?;
    Ok(envelope::data(stats))
}

/// `POST /questions/merge` — bulk-mark questions as merged into a Q&A.
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MergeRequest>,
) -> ApiResult {
    if body.question_ids.is_empty() {
        return Err(AsklineError::Validation("question_ids is empty".into()).into());
    }
    if state.qas.get(body.qa_id).await?.is_none() {
        return Err(AsklineError::NotFound(format!("qa {}", body.qa_id)).into());
    }
    let merged = state
        .lifecycle
        .merge_to_qa(&body.question_ids, body.qa_id)
        .await?;
    Ok(envelope::data(serde_json::json!({ "merged": merged })))
}
