use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Lifecycle status of a student question. DELETED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Pending,
    Approved,
    Rejected,
    Deleted,
    Withdrawn,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Pending => "PENDING",
            QuestionStatus::Approved => "APPROVED",
            QuestionStatus::Rejected => "REJECTED",
            QuestionStatus::Deleted => "DELETED",
            QuestionStatus::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(QuestionStatus::Pending),
            "APPROVED" => Some(QuestionStatus::Approved),
            "REJECTED" => Some(QuestionStatus::Rejected),
            "DELETED" => Some(QuestionStatus::Deleted),
            "WITHDRAWN" => Some(QuestionStatus::Withdrawn),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    /// Derive the level from a 0–1 difficulty score with the fixed
    /// thresholds (easy < 0.3, medium < 0.7, hard otherwise).
    pub fn from_score(score: f32) -> Self {
        if score < 0.3 {
            DifficultyLevel::Easy
        } else if score < 0.7 {
            DifficultyLevel::Medium
        } else {
            DifficultyLevel::Hard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(DifficultyLevel::Easy),
            "medium" => Some(DifficultyLevel::Medium),
            "hard" => Some(DifficultyLevel::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a logged chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Received,
    Sent,
    Failed,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Received => "received",
            MessageDirection::Sent => "sent",
            MessageDirection::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(MessageDirection::Received),
            "sent" => Some(MessageDirection::Sent),
            "failed" => Some(MessageDirection::Failed),
            _ => None,
        }
    }
}

// --- Course / Class ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub semester: String,
    pub description: Option<String>,
    #[serde(default)]
    pub teacher_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_code: String,
    pub class_name: String,
    /// LINE group this class chats in, when bound.
    pub line_group_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Question ---

/// A student question. The raw chat user id never appears here — only the
/// derived pseudonym, which is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub pseudonym: String,
    pub question_text: String,
    pub status: QuestionStatus,
    pub rejection_reason: Option<String>,

    // AI-derived fields, filled by analysis and reconciliation.
    pub cluster_id: Option<Uuid>,
    pub difficulty_score: Option<f32>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub ai_response_draft: Option<String>,
    pub ai_summary: Option<String>,
    pub sentiment_score: Option<f32>,

    // Merge bookkeeping.
    #[serde(default)]
    pub is_merged: bool,
    pub merged_to_qa_id: Option<Uuid>,

    /// Id of the originating chat message, when the question came in
    /// through the webhook.
    pub origin_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// De-identified projection handed to the AI layer: no raw user id, no
/// status, no staff-facing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: Uuid,
    pub pseudonym: String,
    pub question_text: String,
    pub created_at: DateTime<Utc>,
}

/// AI analysis payload applied to a question. Overwrites are idempotent;
/// `difficulty_level` is always recomputed from `difficulty_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub difficulty_score: f32,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub cluster_id: Option<Uuid>,
    pub response_draft: Option<String>,
    pub summary: Option<String>,
    pub sentiment_score: Option<f32>,
}

// --- Cluster ---

/// A named topic grouping questions that share a semantic theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Uuid,
    pub course_id: Uuid,
    /// Natural join key for reconciliation: identical labels within a
    /// course are the same cluster.
    pub topic_label: String,
    pub summary: String,
    /// Maintained additively by reconciliation, never by recount.
    pub question_count: i32,
    pub avg_difficulty: f32,
    /// Locked clusters are never relabeled automatically.
    #[serde(default)]
    pub is_locked: bool,
    /// Staff override of the AI-chosen label.
    pub manual_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cluster {
    /// The label staff see: the manual override when present, otherwise
    /// the AI-chosen one.
    pub fn display_label(&self) -> &str {
        self.manual_label.as_deref().unwrap_or(&self.topic_label)
    }
}

// --- Q&A / Announcement ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qa {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_question_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_published: bool,
    pub publish_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub related_qa_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_published: bool,
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_to_line: bool,
    pub line_message_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Chat message log ---

/// A logged inbound or outbound chat message. This is the one place the
/// raw chat user id is stored; it never leaves the private log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: String,
    pub pseudonym: String,
    pub direction: MessageDirection,
    pub content: String,
    pub question_id: Option<Uuid>,
    pub line_message_id: Option<String>,
    pub reply_token: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}
