use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use askline_common::{Announcement, AsklineError};
use askline_core::CourseStore;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    course_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateAnnouncement {
    course_id: Uuid,
    class_id: Option<Uuid>,
    title: String,
    content: String,
    #[serde(default)]
    related_qa_ids: Vec<Uuid>,
    created_by: String,
}

#[derive(Deserialize)]
pub struct UpdateAnnouncement {
    title: Option<String>,
    content: Option<String>,
    related_qa_ids: Option<Vec<Uuid>>,
    is_published: Option<bool>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let announcements = state.announcements.list_for_course(query.course_id).await?;
    Ok(envelope::data(announcements))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAnnouncement>,
) -> ApiResult {
    if state.courses.get_course(body.course_id).await?.is_none() {
        return Err(AsklineError::InvalidCourse(body.course_id.to_string()).into());
    }
    if body.title.trim().is_empty() {
        return Err(AsklineError::Validation("title is required".into()).into());
    }
    let now = Utc::now();
    let announcement = state
        .announcements
        .create(&Announcement {
            id: Uuid::new_v4(),
            course_id: body.course_id,
            class_id: body.class_id,
            title: body.title.trim().to_string(),
            content: body.content,
            related_qa_ids: body.related_qa_ids,
            is_published: false,
            publish_date: None,
            sent_to_line: false,
            line_message_id: None,
            created_by: body.created_by,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(envelope::data(announcement))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let announcement = state
        .announcements
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("announcement {id}")))?;
    Ok(envelope::data(announcement))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAnnouncement>,
) -> ApiResult {
    let mut announcement = state
        .announcements
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("announcement {id}")))?;

    if let Some(title) = body.title {
        announcement.title = title;
    }
    if let Some(content) = body.content {
        announcement.content = content;
    }
    if let Some(related_qa_ids) = body.related_qa_ids {
        announcement.related_qa_ids = related_qa_ids;
    }
    if let Some(is_published) = body.is_published {
        announcement.is_published = is_published;
        if is_published && announcement.publish_date.is_none() {
            announcement.publish_date = Some(Utc::now());
        }
    }

    state.announcements.update(&announcement).await?;
    Ok(envelope::data(announcement))
}

/// `POST /announcements/{id}/send` — push the announcement to the class's
/// LINE group and record the outcome.
pub async fn send_to_line(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let announcement = state
        .announcements
        .get(id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("announcement {id}")))?;

    let class_id = announcement
        .class_id
        .ok_or_else(|| AsklineError::Validation("announcement has no class".into()))?;
    let class = state
        .classes
        .get(class_id)
        .await?
        .ok_or_else(|| AsklineError::NotFound(format!("class {class_id}")))?;
    let group_id = class
        .line_group_id
        .ok_or_else(|| AsklineError::Validation("class has no LINE group".into()))?;

    let text = format!("{}\n\n{}", announcement.title, announcement.content);
    match state.line.push(&group_id, &text).await {
        Ok(line_message_id) => {
            state
                .announcements
                .mark_sent_to_line(id, line_message_id.as_deref())
                .await?;
            Ok(envelope::message("announcement sent"))
        }
        Err(e) => {
            warn!(announcement_id = %id, error = %e, "Failed to push announcement");
            Ok(envelope::reject(
                axum::http::StatusCode::BAD_GATEWAY,
                "LINE push failed",
            ))
        }
    }
}

pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    if !state.announcements.delete(id).await? {
        return Err(AsklineError::NotFound(format!("announcement {id}")).into());
    }
    Ok(envelope::message("announcement deleted"))
}
