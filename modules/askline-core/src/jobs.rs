use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};
use uuid::Uuid;

use askline_ai::{AiGateway, QuestionAnalysis};
use askline_common::{AiAnalysis, AsklineError, Question};

use crate::lifecycle::LifecycleManager;
use crate::traits::{CourseStore, QuestionStore, StoreResult};

/// Tracks in-flight background jobs so reconciliation is serialized per
/// course: the question_count bump is additive, and two concurrent runs for
/// one course would double-count.
#[derive(Debug, Default)]
pub struct JobRegistry {
    in_flight: Mutex<HashSet<Uuid>>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the reconciliation slot for a course. Fails with
    /// `ReconcileInFlight` when a run is already active; the returned guard
    /// releases the slot on drop.
    pub fn try_acquire(self: &Arc<Self>, course_id: Uuid) -> Result<CourseLock, AsklineError> {
        let mut in_flight = self.in_flight.lock().expect("job registry lock poisoned");
        if !in_flight.insert(course_id) {
            return Err(AsklineError::ReconcileInFlight);
        }
        Ok(CourseLock {
            registry: Arc::clone(self),
            course_id,
        })
    }

    pub fn is_in_flight(&self, course_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .expect("job registry lock poisoned")
            .contains(&course_id)
    }

    fn release(&self, course_id: Uuid) {
        self.in_flight
            .lock()
            .expect("job registry lock poisoned")
            .remove(&course_id);
    }
}

/// RAII claim on a course's reconciliation slot. Held by the spawned job
/// for its whole lifetime, released even when the job panics or errors.
#[derive(Debug)]
pub struct CourseLock {
    registry: Arc<JobRegistry>,
    course_id: Uuid,
}

impl CourseLock {
    pub fn course_id(&self) -> Uuid {
        self.course_id
    }
}

impl Drop for CourseLock {
    fn drop(&mut self) {
        self.registry.release(self.course_id);
    }
}

/// Map the model's sentiment word onto the stored score.
fn sentiment_score(sentiment: &str) -> f32 {
    match sentiment {
        "negative" => -1.0,
        "positive" => 1.0,
        _ => 0.0,
    }
}

/// Analyze one question and store the AI fields. Gateway failure degrades
/// to defaults rather than erroring; only storage problems propagate.
pub async fn analyze_and_store<G, C, Q>(
    gateway: &G,
    lifecycle: &LifecycleManager<C, Q>,
    question_id: Uuid,
    text: &str,
) -> StoreResult<Question>
where
    G: AiGateway,
    C: CourseStore,
    Q: QuestionStore,
{
    let analysis = match gateway.analyze(text).await {
        Ok(a) => a,
        Err(e) => {
            warn!(question_id = %question_id, error = %e, "analysis unavailable, storing defaults");
            QuestionAnalysis::default()
        }
    };
    let draft = gateway.draft_reply(text).await;

    let payload = AiAnalysis {
        difficulty_score: analysis.difficulty_score,
        keywords: analysis.keywords,
        cluster_id: None,
        response_draft: Some(draft),
        summary: Some(analysis.summary),
        sentiment_score: Some(sentiment_score(&analysis.sentiment)),
    };

    lifecycle.apply_ai_analysis(question_id, &payload).await
}

/// Background analysis for a freshly created question. Any error here is
/// logged, never propagated — the triggering request has long since returned.
pub async fn analyze_new_question<G, C, Q>(
    gateway: &G,
    lifecycle: &LifecycleManager<C, Q>,
    question_id: Uuid,
    text: &str,
) where
    G: AiGateway,
    C: CourseStore,
    Q: QuestionStore,
{
    match analyze_and_store(gateway, lifecycle, question_id, text).await {
        Ok(_) => info!(question_id = %question_id, "background analysis stored"),
        Err(e) => error!(question_id = %question_id, error = %e, "background analysis failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockCourseStore, MockGateway, MockQuestionStore};
    use askline_common::{DifficultyLevel, QuestionStatus};

    #[test]
    fn second_acquire_conflicts_until_release() {
        let registry = JobRegistry::new();
        let course = Uuid::new_v4();

        let lock = registry.try_acquire(course).unwrap();
        assert!(registry.is_in_flight(course));
        assert!(matches!(
            registry.try_acquire(course).unwrap_err(),
            AsklineError::ReconcileInFlight
        ));

        drop(lock);
        assert!(!registry.is_in_flight(course));
        registry.try_acquire(course).unwrap();
    }

    #[test]
    fn locks_are_per_course() {
        let registry = JobRegistry::new();
        let _a = registry.try_acquire(Uuid::new_v4()).unwrap();
        // A different course is unaffected.
        registry.try_acquire(Uuid::new_v4()).unwrap();
    }

    #[test]
    fn sentiment_words_map_to_scores() {
        assert_eq!(sentiment_score("negative"), -1.0);
        assert_eq!(sentiment_score("positive"), 1.0);
        assert_eq!(sentiment_score("neutral"), 0.0);
        assert_eq!(sentiment_score("confused"), 0.0);
    }

    #[tokio::test]
    async fn analysis_failure_degrades_to_defaults() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let lifecycle = LifecycleManager::new(MockCourseStore::empty(), questions, "salt");
        let gateway = MockGateway::failing();

        analyze_new_question(&gateway, &lifecycle, id, "why segfault").await;

        let q = lifecycle.questions().get_question(id).await.unwrap().unwrap();
        assert_eq!(q.difficulty_score, Some(0.0));
        assert_eq!(q.difficulty_level, Some(DifficultyLevel::Easy));
        assert!(q.keywords.is_empty());
        assert_eq!(q.sentiment_score, Some(0.0));
        // draft_reply degrades to the sentinel rather than failing.
        assert_eq!(q.ai_response_draft.as_deref(), Some(askline_ai::DRAFT_UNAVAILABLE));
        // Status is never the AI path's to change.
        assert_eq!(q.status, QuestionStatus::Pending);
    }

    #[tokio::test]
    async fn analysis_success_fills_ai_fields() {
        let questions = MockQuestionStore::new();
        let id = questions.seed_question(Uuid::new_v4(), QuestionStatus::Pending);
        let lifecycle = LifecycleManager::new(MockCourseStore::empty(), questions, "salt");
        let gateway = MockGateway::analyzing(QuestionAnalysis {
            keywords: vec!["pointers".into()],
            difficulty_score: 0.8,
            sentiment: "negative".into(),
            summary: "pointer confusion".into(),
        });

        analyze_new_question(&gateway, &lifecycle, id, "why segfault").await;

        let q = lifecycle.questions().get_question(id).await.unwrap().unwrap();
        assert_eq!(q.difficulty_level, Some(DifficultyLevel::Hard));
        assert_eq!(q.keywords, vec!["pointers"]);
        assert_eq!(q.sentiment_score, Some(-1.0));
        assert_eq!(q.ai_summary.as_deref(), Some("pointer confusion"));
    }
}
