use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use askline_common::pseudonym::generate_pseudonym;
use askline_common::{
    AiAnalysis, AsklineError, DifficultyLevel, PendingQuestion, Question, QuestionStatus,
};

use crate::traits::{AnalysisFields, CourseStore, QuestionStore, StoreResult};

/// Hard cap on `list_pending_for_ai` regardless of the requested limit.
pub const PENDING_LIMIT_MAX: usize = 500;

/// Whether `from -> to` is a legal status move. DELETED is always a legal
/// target (the escape hatch) and never a legal source.
pub fn transition_allowed(from: QuestionStatus, to: QuestionStatus) -> bool {
    use QuestionStatus::*;
    if to == Deleted {
        return true;
    }
    match from {
        Pending => matches!(to, Approved | Rejected | Withdrawn),
        Approved | Rejected | Withdrawn | Deleted => false,
    }
}

/// Owns question creation, the status state machine, and the AI-field
/// overwrite path. Generic over storage so the whole thing runs against
/// in-memory mocks in tests.
pub struct LifecycleManager<C, Q> {
    courses: C,
    questions: Q,
    pseudonym_salt: String,
}

impl<C: CourseStore, Q: QuestionStore> LifecycleManager<C, Q> {
    pub fn new(courses: C, questions: Q, pseudonym_salt: impl Into<String>) -> Self {
        Self {
            courses,
            questions,
            pseudonym_salt: pseudonym_salt.into(),
        }
    }

    pub fn questions(&self) -> &Q {
        &self.questions
    }

    /// Create a PENDING question from an inbound chat message. The raw chat
    /// user id is pseudonymized here and never persisted.
    pub async fn create(
        &self,
        course_id: Uuid,
        class_id: Option<Uuid>,
        chat_user_id: &str,
        text: &str,
        origin_message_id: Option<String>,
    ) -> StoreResult<Question> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| AsklineError::InvalidCourse(course_id.to_string()))?;
        if !course.is_active {
            return Err(AsklineError::InvalidCourse(course_id.to_string()));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(AsklineError::Validation("question text is empty".into()));
        }

        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            course_id,
            class_id,
            pseudonym: generate_pseudonym(chat_user_id, &self.pseudonym_salt),
            question_text: text.to_string(),
            status: QuestionStatus::Pending,
            rejection_reason: None,
            cluster_id: None,
            difficulty_score: None,
            difficulty_level: None,
            keywords: Vec::new(),
            ai_response_draft: None,
            ai_summary: None,
            sentiment_score: None,
            is_merged: false,
            merged_to_qa_id: None,
            origin_message_id,
            created_at: now,
            updated_at: now,
        };

        self.questions.insert_question(&question).await?;
        info!(question_id = %question.id, course_id = %course_id, "question created");
        Ok(question)
    }

    /// Move a question through the state machine. The rejection reason is
    /// persisted only when the target status is REJECTED.
    pub async fn transition(
        &self,
        question_id: Uuid,
        target: QuestionStatus,
        reason: Option<String>,
    ) -> StoreResult<Question> {
        let question = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| AsklineError::NotFound(format!("question {question_id}")))?;

        if !transition_allowed(question.status, target) {
            return Err(AsklineError::IllegalTransition {
                from: question.status.to_string(),
                to: target.to_string(),
            });
        }

        let reason = match target {
            QuestionStatus::Rejected => reason,
            _ => None,
        };
        self.questions
            .set_status(question_id, target, reason.as_deref())
            .await?;

        info!(question_id = %question_id, from = %question.status, to = %target, "status transition");

        self.questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| AsklineError::NotFound(format!("question {question_id}")))
    }

    /// Idempotent overwrite of the AI-derived fields. Recomputes the
    /// difficulty level from the score; never touches status.
    pub async fn apply_ai_analysis(
        &self,
        question_id: Uuid,
        analysis: &AiAnalysis,
    ) -> StoreResult<Question> {
        if self.questions.get_question(question_id).await?.is_none() {
            return Err(AsklineError::NotFound(format!("question {question_id}")));
        }

        let fields = AnalysisFields {
            difficulty_score: Some(analysis.difficulty_score),
            difficulty_level: Some(DifficultyLevel::from_score(analysis.difficulty_score)),
            keywords: analysis.keywords.clone(),
            cluster_id: analysis.cluster_id,
            response_draft: analysis.response_draft.clone(),
            summary: analysis.summary.clone(),
            sentiment_score: analysis.sentiment_score,
        };
        self.questions.write_analysis(question_id, &fields).await?;

        self.questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| AsklineError::NotFound(format!("question {question_id}")))
    }

    /// De-identified PENDING questions with no cluster yet, for the AI layer.
    pub async fn list_pending_for_ai(
        &self,
        course_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<PendingQuestion>> {
        let limit = limit.clamp(1, PENDING_LIMIT_MAX);
        self.questions.pending_for_ai(course_id, limit).await
    }

    /// Bulk-mark questions as merged into a published Q&A.
    pub async fn merge_to_qa(&self, question_ids: &[Uuid], qa_id: Uuid) -> StoreResult<u64> {
        self.questions.mark_merged(question_ids, qa_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockCourseStore, MockQuestionStore};
    use askline_common::AiAnalysis;

    const SALT: &str = "test-salt";

    fn manager(
        courses: MockCourseStore,
        questions: MockQuestionStore,
    ) -> LifecycleManager<MockCourseStore, MockQuestionStore> {
        LifecycleManager::new(courses, questions, SALT)
    }

    fn analysis(score: f32) -> AiAnalysis {
        AiAnalysis {
            difficulty_score: score,
            keywords: vec!["loops".into(), "loops".into()],
            cluster_id: None,
            response_draft: Some("draft".into()),
            summary: Some("summary".into()),
            sentiment_score: Some(0.0),
        }
    }

    #[tokio::test]
    async fn create_pseudonymizes_and_starts_pending() {
        let courses = MockCourseStore::with_active_course();
        let course_id = courses.course_id();
        let m = manager(courses, MockQuestionStore::new());

        let q = m
            .create(course_id, None, "U-raw-user-id", " why segfault ", Some("msg1".into()))
            .await
            .unwrap();

        assert_eq!(q.status, QuestionStatus::Pending);
        assert_eq!(q.question_text, "why segfault");
        assert!(!q.pseudonym.contains("U-raw-user-id"));
        assert_eq!(q.pseudonym.len(), 64);
        assert!(q.cluster_id.is_none());
        assert!(q.keywords.is_empty());
        assert!(q.difficulty_score.is_none());
    }

    #[tokio::test]
    async fn create_rejects_unknown_and_inactive_courses() {
        let m = manager(MockCourseStore::empty(), MockQuestionStore::new());
        let err = m
            .create(Uuid::new_v4(), None, "U1", "text", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AsklineError::InvalidCourse(_)));

        let courses = MockCourseStore::with_inactive_course();
        let course_id = courses.course_id();
        let m = manager(courses, MockQuestionStore::new());
        let err = m.create(course_id, None, "U1", "text", None).await.unwrap_err();
        assert!(matches!(err, AsklineError::InvalidCourse(_)));
    }

    #[tokio::test]
    async fn deleted_is_terminal() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Deleted);
        let m = manager(MockCourseStore::empty(), questions);

        for target in [
            QuestionStatus::Pending,
            QuestionStatus::Approved,
            QuestionStatus::Rejected,
            QuestionStatus::Withdrawn,
        ] {
            let err = m.transition(id, target, None).await.unwrap_err();
            assert!(matches!(err, AsklineError::IllegalTransition { .. }));
            let stored = m.questions().get_question(id).await.unwrap().unwrap();
            assert_eq!(stored.status, QuestionStatus::Deleted);
        }
    }

    #[tokio::test]
    async fn illegal_transitions_leave_status_unchanged() {
        // Everything not in the allowed table (target != DELETED) must fail.
        let legal: &[(QuestionStatus, QuestionStatus)] = &[
            (QuestionStatus::Pending, QuestionStatus::Approved),
            (QuestionStatus::Pending, QuestionStatus::Rejected),
            (QuestionStatus::Pending, QuestionStatus::Withdrawn),
        ];
        let all = [
            QuestionStatus::Pending,
            QuestionStatus::Approved,
            QuestionStatus::Rejected,
            QuestionStatus::Deleted,
            QuestionStatus::Withdrawn,
        ];

        for from in all {
            for to in all {
                if to == QuestionStatus::Deleted || legal.contains(&(from, to)) {
                    continue;
                }
                let questions = MockQuestionStore::new();
                let id = questions.seed_question(Uuid::new_v4(), from);
                let m = manager(MockCourseStore::empty(), questions);

                let err = m.transition(id, to, None).await.unwrap_err();
                assert!(
                    matches!(err, AsklineError::IllegalTransition { .. }),
                    "{from} -> {to} should be illegal"
                );
                let stored = m.questions().get_question(id).await.unwrap().unwrap();
                assert_eq!(stored.status, from, "{from} -> {to} must not change status");
            }
        }
    }

    #[tokio::test]
    async fn any_status_can_be_deleted() {
        for from in [
            QuestionStatus::Pending,
            QuestionStatus::Approved,
            QuestionStatus::Rejected,
            QuestionStatus::Withdrawn,
        ] {
            let questions = MockQuestionStore::new();
            let id = questions.seed_question(Uuid::new_v4(), from);
            let m = manager(MockCourseStore::empty(), questions);
            let q = m.transition(id, QuestionStatus::Deleted, None).await.unwrap();
            assert_eq!(q.status, QuestionStatus::Deleted);
        }
    }

    #[tokio::test]
    async fn rejection_reason_persists_only_for_rejected() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let m = manager(MockCourseStore::empty(), questions);

        let q = m
            .transition(id, QuestionStatus::Rejected, Some("off topic".into()))
            .await
            .unwrap();
        assert_eq!(q.rejection_reason.as_deref(), Some("off topic"));

        // A reason on a non-REJECTED transition is ignored.
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let m = manager(MockCourseStore::empty(), questions);
        let q = m
            .transition(id, QuestionStatus::Approved, Some("ignored".into()))
            .await
            .unwrap();
        assert!(q.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn transition_on_missing_question_is_not_found() {
        let m = manager(MockCourseStore::empty(), MockQuestionStore::new());
        let err = m
            .transition(Uuid::new_v4(), QuestionStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AsklineError::NotFound(_)));
    }

    #[tokio::test]
    async fn apply_ai_analysis_is_idempotent_and_recomputes_level() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let m = manager(MockCourseStore::empty(), questions);

        let first = m.apply_ai_analysis(id, &analysis(0.65)).await.unwrap();
        let second = m.apply_ai_analysis(id, &analysis(0.65)).await.unwrap();

        assert_eq!(first.difficulty_level, Some(DifficultyLevel::Medium));
        assert_eq!(first.difficulty_level, second.difficulty_level);
        assert_eq!(first.keywords, second.keywords);
        // Duplicates in the keyword list are preserved, order intact.
        assert_eq!(second.keywords, vec!["loops", "loops"]);
        // Status untouched.
        assert_eq!(second.status, QuestionStatus::Pending);
    }

    #[tokio::test]
    async fn level_tracks_score_across_overwrites() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let m = manager(MockCourseStore::empty(), questions);

        for (score, level) in [
            (0.1, DifficultyLevel::Easy),
            (0.5, DifficultyLevel::Medium),
            (0.9, DifficultyLevel::Hard),
        ] {
            let q = m.apply_ai_analysis(id, &analysis(score)).await.unwrap();
            assert_eq!(q.difficulty_level, Some(level));
            assert_eq!(q.difficulty_score, Some(score));
        }
    }

    #[tokio::test]
    async fn pending_projection_is_deidentified() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        questions.seed_pending_with_text(course_id, "U-raw-1", "what is a pointer");
        questions.seed_pending_with_text(course_id, "U-raw-2", "why NaN");
        let m = manager(MockCourseStore::empty(), questions);

        let pending = m.list_pending_for_ai(course_id, 10).await.unwrap();
        assert_eq!(pending.len(), 2);
        for row in &pending {
            // Only pseudonym + text identify the row; raw ids never appear.
            assert!(!row.pseudonym.contains("U-raw"));
            let as_json = serde_json::to_string(row).unwrap();
            assert!(!as_json.contains("U-raw"));
        }
    }

    #[tokio::test]
    async fn pending_excludes_clustered_and_non_pending() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        questions.seed_pending_with_text(course_id, "U1", "unclustered pending");
        let clustered = questions.seed_pending_with_text(course_id, "U2", "already clustered");
        questions.set_cluster_direct(clustered, Uuid::new_v4());
        let approved = questions.seed_pending_with_text(course_id, "U3", "approved");
        questions.set_status_direct(approved, QuestionStatus::Approved);
        let m = manager(MockCourseStore::empty(), questions);

        let pending = m.list_pending_for_ai(course_id, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].question_text, "unclustered pending");
    }

    #[tokio::test]
    async fn pending_respects_limit() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        for i in 0..5 {
            questions.seed_pending_with_text(course_id, "U", &format!("q{i}"));
        }
        let m = manager(MockCourseStore::empty(), questions);
        assert_eq!(m.list_pending_for_ai(course_id, 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn merge_marks_questions() {
        let questions = MockQuestionStore::new();
        let a = questions.seed_question(Uuid::new_v4(), QuestionStatus::Approved);
        let b = questions.seed_question(Uuid::new_v4(), QuestionStatus::Approved);
        let m = manager(MockCourseStore::empty(), questions);

        let qa_id = Uuid::new_v4();
        let changed = m.merge_to_qa(&[a, b], qa_id).await.unwrap();
        assert_eq!(changed, 2);
        let stored = m.questions().get_question(a).await.unwrap().unwrap();
        assert!(stored.is_merged);
        assert_eq!(stored.merged_to_qa_id, Some(qa_id));
    }

    #[test]
    fn transition_table_is_exhaustive() {
        use QuestionStatus::*;
        assert!(transition_allowed(Pending, Approved));
        assert!(transition_allowed(Pending, Rejected));
        assert!(transition_allowed(Pending, Withdrawn));
        assert!(transition_allowed(Pending, Deleted));
        assert!(transition_allowed(Approved, Deleted));
        assert!(transition_allowed(Rejected, Deleted));
        assert!(transition_allowed(Withdrawn, Deleted));
        assert!(!transition_allowed(Approved, Pending));
        assert!(!transition_allowed(Approved, Rejected));
        assert!(!transition_allowed(Rejected, Approved));
        assert!(!transition_allowed(Withdrawn, Pending));
        assert!(!transition_allowed(Deleted, Pending));
        assert!(!transition_allowed(Deleted, Approved));
    }
}
