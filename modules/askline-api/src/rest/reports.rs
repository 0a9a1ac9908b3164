use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use askline_core::ClusterStore;
use askline_store::QuestionFilter;

use crate::envelope::ApiResult;
use crate::export;
use crate::AppState;

#[derive(Deserialize)]
pub struct ExportQuery {
    course_id: Uuid,
    status: Option<String>,
}

fn csv_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// `GET /reports/questions/export` — all non-deleted questions for a course.
pub async fn questions_export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> ApiResult {
    let status = query
        .status
        .as_deref()
        .and_then(askline_common::QuestionStatus::parse);
    let questions = state
        .question_store
        .list(&QuestionFilter {
            course_id: Some(query.course_id),
            status,
            limit: Some(1000),
            ..Default::default()
        })
        .await?;
    let bytes = export::questions_csv(&questions)?;
    Ok(csv_response("questions.csv", bytes))
}

/// `GET /reports/clusters/export` — cluster summary for a course.
pub async fn clusters_export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> ApiResult {
    let clusters = state.clusters.clusters_for_course(query.course_id).await?;
    let bytes = export::clusters_csv(&clusters)?;
    Ok(csv_response("clusters.csv", bytes))
}
