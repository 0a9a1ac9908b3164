// Row structs mirroring the tables, plus conversions into the domain
// types. Enums travel as text, string lists as JSONB.

use askline_common::{
    Announcement, AsklineError, ChatMessage, Class, Cluster, Course, DifficultyLevel,
    MessageDirection, Qa, Question, QuestionStatus,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn string_list(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

pub(crate) fn uuid_list(value: serde_json::Value) -> Vec<Uuid> {
    serde_json::from_value(value).unwrap_or_default()
}

pub(crate) fn json_list<T: serde::Serialize>(items: &[T]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_else(|_| serde_json::Value::Array(vec![]))
}

fn bad_enum(column: &str, value: &str) -> AsklineError {
    AsklineError::Database(format!("unexpected {column} value in row: {value}"))
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub semester: String,
    pub description: Option<String>,
    pub teacher_ids: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(r: CourseRow) -> Self {
        Course {
            id: r.id,
            course_code: r.course_code,
            course_name: r.course_name,
            semester: r.semester,
            description: r.description,
            teacher_ids: string_list(r.teacher_ids),
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClassRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_code: String,
    pub class_name: String,
    pub line_group_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClassRow> for Class {
    fn from(r: ClassRow) -> Self {
        Class {
            id: r.id,
            course_id: r.course_id,
            class_code: r.class_code,
            class_name: r.class_name,
            line_group_id: r.line_group_id,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuestionRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub pseudonym: String,
    pub question_text: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub cluster_id: Option<Uuid>,
    pub difficulty_score: Option<f32>,
    pub difficulty_level: Option<String>,
    pub keywords: serde_json::Value,
    pub ai_response_draft: Option<String>,
    pub ai_summary: Option<String>,
    pub sentiment_score: Option<f32>,
    pub is_merged: bool,
    pub merged_to_qa_id: Option<Uuid>,
    pub origin_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AsklineError;

    fn try_from(r: QuestionRow) -> Result<Self, AsklineError> {
        let status =
            QuestionStatus::parse(&r.status).ok_or_else(|| bad_enum("status", &r.status))?;
        let difficulty_level = match r.difficulty_level {
            Some(level) => Some(
                DifficultyLevel::parse(&level)
                    .ok_or_else(|| bad_enum("difficulty_level", &level))?,
            ),
            None => None,
        };
        Ok(Question {
            id: r.id,
            course_id: r.course_id,
            class_id: r.class_id,
            pseudonym: r.pseudonym,
            question_text: r.question_text,
            status,
            rejection_reason: r.rejection_reason,
            cluster_id: r.cluster_id,
            difficulty_score: r.difficulty_score,
            difficulty_level,
            keywords: string_list(r.keywords),
            ai_response_draft: r.ai_response_draft,
            ai_summary: r.ai_summary,
            sentiment_score: r.sentiment_score,
            is_merged: r.is_merged,
            merged_to_qa_id: r.merged_to_qa_id,
            origin_message_id: r.origin_message_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClusterRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub topic_label: String,
    pub summary: String,
    pub question_count: i32,
    pub avg_difficulty: f32,
    pub is_locked: bool,
    pub manual_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClusterRow> for Cluster {
    fn from(r: ClusterRow) -> Self {
        Cluster {
            id: r.id,
            course_id: r.course_id,
            topic_label: r.topic_label,
            summary: r.summary,
            question_count: r.question_count,
            avg_difficulty: r.avg_difficulty,
            is_locked: r.is_locked,
            manual_label: r.manual_label,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QaRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub tags: serde_json::Value,
    pub related_question_ids: serde_json::Value,
    pub is_published: bool,
    pub publish_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QaRow> for Qa {
    fn from(r: QaRow) -> Self {
        Qa {
            id: r.id,
            course_id: r.course_id,
            class_id: r.class_id,
            question: r.question,
            answer: r.answer,
            category: r.category,
            tags: string_list(r.tags),
            related_question_ids: uuid_list(r.related_question_ids),
            is_published: r.is_published,
            publish_date: r.publish_date,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnnouncementRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub related_qa_ids: serde_json::Value,
    pub is_published: bool,
    pub publish_date: Option<DateTime<Utc>>,
    pub sent_to_line: bool,
    pub line_message_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(r: AnnouncementRow) -> Self {
        Announcement {
            id: r.id,
            course_id: r.course_id,
            class_id: r.class_id,
            title: r.title,
            content: r.content,
            related_qa_ids: uuid_list(r.related_qa_ids),
            is_published: r.is_published,
            publish_date: r.publish_date,
            sent_to_line: r.sent_to_line,
            line_message_id: r.line_message_id,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ChatMessageRow {
    pub id: Uuid,
    pub user_id: String,
    pub pseudonym: String,
    pub direction: String,
    pub content: String,
    pub question_id: Option<Uuid>,
    pub line_message_id: Option<String>,
    pub reply_token: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = AsklineError;

    fn try_from(r: ChatMessageRow) -> Result<Self, AsklineError> {
        let direction = MessageDirection::parse(&r.direction)
            .ok_or_else(|| bad_enum("direction", &r.direction))?;
        Ok(ChatMessage {
            id: r.id,
            user_id: r.user_id,
            pseudonym: r.pseudonym,
            direction,
            content: r.content,
            question_id: r.question_id,
            line_message_id: r.line_message_id,
            reply_token: r.reply_token,
            error_message: r.error_message,
            created_at: r.created_at,
        })
    }
}
