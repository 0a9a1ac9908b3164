// AI-facing staff endpoints: pending-question feed, analysis triggers, and
// cluster generation/management. Long-running work is spawned and reported
// back as "processing started"; per-course serialization comes from the job
// registry.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use askline_common::AsklineError;
use askline_core::{
    analyze_and_store, analyze_new_question, ClusterAdmin, ClusterStore, CourseStore,
    QuestionStore, Reconciler,
};

use crate::envelope::{self, ApiResult};
use crate::AppState;

const DEFAULT_CLUSTER_CEILING: usize = 10;

#[derive(Deserialize)]
pub struct PendingQuery {
    course_id: Uuid,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    course_id: Uuid,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct SingleRequest {
    question_id: Uuid,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    course_id: Uuid,
    max_clusters: Option<usize>,
}

#[derive(Deserialize)]
pub struct ClustersQuery {
    course_id: Uuid,
}

#[derive(Deserialize)]
pub struct PatchCluster {
    manual_label: String,
}

#[derive(Deserialize)]
pub struct CreateCluster {
    course_id: Uuid,
    topic_label: String,
    #[serde(default)]
    summary: String,
}

/// `GET /ai/questions/pending` — de-identified questions awaiting analysis.
pub async fn pending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingQuery>,
) -> ApiResult {
    let pending = state
        .lifecycle
        .list_pending_for_ai(query.course_id, query.limit.unwrap_or(50))
        .await?;
    Ok(envelope::data(pending))
}

/// `POST /ai/analysis/single` — analyze one question inline and return it.
pub async fn analyze_single(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SingleRequest>,
) -> ApiResult {
    let question = state
        .lifecycle
        .questions()
        .get_question(body.question_id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("question {}", body.question_id)))?;

    let updated = analyze_and_store(
        &state.gateway,
        &state.lifecycle,
        question.id,
        &question.question_text,
    )
    .await?;
    Ok(envelope::data(updated))
}

/// `POST /ai/analysis/batch` — spawn analysis for the pending backlog.
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchRequest>,
) -> ApiResult {
    let pending = state
        .lifecycle
        .list_pending_for_ai(body.course_id, body.limit.unwrap_or(50))
        .await?;
    let count = pending.len();

    let state = state.clone();
    tokio::spawn(async move {
        for question in pending {
            analyze_new_question(
                &state.gateway,
                &state.lifecycle,
                question.id,
                &question.question_text,
            )
            .await;
        }
        info!(count, "batch analysis finished");
    });

    Ok(envelope::data(serde_json::json!({
        "message": "processing started",
        "queued": count,
    })))
}

/// `POST /ai/clusters/generate` — kick off clustering reconciliation for a
/// course. A second trigger while one is running gets a 409.
pub async fn generate_clusters(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateRequest>,
) -> ApiResult {
    if state.courses.get_course(body.course_id).await?.is_none() {
        return Err(AsklineError::InvalidCourse(body.course_id.to_string()).into());
    }
    let ceiling = body.max_clusters.unwrap_or(DEFAULT_CLUSTER_CEILING);
    let lock = state.jobs.try_acquire(body.course_id)?;

    let course_id = body.course_id;
    let state = state.clone();
    tokio::spawn(async move {
        let _lock = lock;
        let reconciler = Reconciler::new(
            state.question_store.clone(),
            state.clusters.clone(),
            state.gateway.clone(),
        );
        match reconciler.run(course_id, ceiling).await {
            Ok(stats) => info!(?stats, "clustering finished"),
            Err(e) => error!(error = %e, "clustering failed"),
        }
    });

    Ok(envelope::data(serde_json::json!({
        "message": "processing started",
        "course_id": body.course_id,
        "max_clusters": ceiling,
    })))
}

/// `GET /ai/clusters` — clusters for a course, biggest first.
pub async fn list_clusters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClustersQuery>,
) -> ApiResult {
    let clusters = state.clusters.clusters_for_course(query.course_id).await?;
    Ok(envelope::data(clusters))
}

/// `PATCH /ai/clusters/{id}` — staff relabel; locks the cluster.
pub async fn patch_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchCluster>,
) -> ApiResult {
    let admin = ClusterAdmin::new(state.clusters.clone(), state.question_store.clone());
    let cluster = admin.rename(id, &body.manual_label).await?;
    Ok(envelope::data(cluster))
}

/// `POST /ai/clusters` — manual empty cluster, always locked.
pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCluster>,
) -> ApiResult {
    if state.courses.get_course(body.course_id).await?.is_none() {
        return Err(AsklineError::InvalidCourse(body.course_id.to_string()).into());
    }
    let admin = ClusterAdmin::new(state.clusters.clone(), state.question_store.clone());
    let cluster = admin
        .create_manual(body.course_id, &body.topic_label, &body.summary)
        .await?;
    Ok(envelope::data(cluster))
}

/// `DELETE /ai/clusters/{id}` — removes the cluster and releases members.
pub async fn delete_cluster(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let admin = ClusterAdmin::new(state.clusters.clone(), state.question_store.clone());
    let released = admin.delete(id).await?;
    if released > 0 {
        warn!(cluster_id = %id, released, "cluster deleted with members attached");
    }
    Ok(envelope::data(serde_json::json!({ "released": released })))
}
