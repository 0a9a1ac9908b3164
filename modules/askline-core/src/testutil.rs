// In-memory mock stores and gateway for core tests: deterministic, no
// network, no database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use askline_ai::{
    AiGateway, ClusterLabel, ClusterProposal, GatewayError, GatewayResult, QuestionAnalysis,
    DRAFT_UNAVAILABLE,
};
use askline_common::pseudonym::generate_pseudonym;
use askline_common::{Cluster, Course, PendingQuestion, Question, QuestionStatus};

use crate::traits::{
    AnalysisFields, ClusterStore, CourseStore, QuestionStore, StoreResult,
};

const MOCK_SALT: &str = "mock-salt";

// ---------------------------------------------------------------------------
// MockCourseStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockCourseStore {
    courses: Arc<Mutex<HashMap<Uuid, Course>>>,
    course_id: Uuid,
}

impl MockCourseStore {
    pub fn empty() -> Self {
        Self {
            courses: Arc::new(Mutex::new(HashMap::new())),
            course_id: Uuid::nil(),
        }
    }

    pub fn with_active_course() -> Self {
        Self::with_course(true)
    }

    pub fn with_inactive_course() -> Self {
        Self::with_course(false)
    }

    fn with_course(is_active: bool) -> Self {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            course_code: "CS101".into(),
            course_name: "Intro to Programming".into(),
            semester: "113-1".into(),
            description: None,
            teacher_ids: vec![],
            is_active,
            created_at: now,
            updated_at: now,
        };
        let id = course.id;
        let mut map = HashMap::new();
        map.insert(id, course);
        Self {
            courses: Arc::new(Mutex::new(map)),
            course_id: id,
        }
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }
}

#[async_trait]
impl CourseStore for MockCourseStore {
    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.courses.lock().unwrap().get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockQuestionStore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockQuestionStore {
    inner: Arc<Mutex<QuestionStoreInner>>,
}

#[derive(Default)]
struct QuestionStoreInner {
    questions: HashMap<Uuid, Question>,
    order: Vec<Uuid>,
}

impl MockQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_question(&self, course_id: Uuid, status: QuestionStatus) -> Uuid {
        let id = self.seed_pending_with_text(course_id, "seed-user", "seed question");
        self.set_status_direct(id, status);
        id
    }

    pub fn seed_pending_with_text(&self, course_id: Uuid, chat_user_id: &str, text: &str) -> Uuid {
        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            course_id,
            class_id: None,
            pseudonym: generate_pseudonym(chat_user_id, MOCK_SALT),
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
            origin_message_id: None,
            created_at: now,
            updated_at: now,
        };
        let id = question.id;
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(id);
        inner.questions.insert(id, question);
        id
    }

    pub fn set_status_direct(&self, id: Uuid, status: QuestionStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.questions.get_mut(&id).unwrap().status = status;
    }

    pub fn set_cluster_direct(&self, id: Uuid, cluster_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        inner.questions.get_mut(&id).unwrap().cluster_id = Some(cluster_id);
    }

    pub fn get_direct(&self, id: Uuid) -> Question {
        self.inner.lock().unwrap().questions[&id].clone()
    }

    /// How many PENDING, unclustered questions a course still has.
    pub fn pending_for_course(&self, course_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .questions
            .values()
            .filter(|q| {
                q.course_id == course_id
                    && q.status == QuestionStatus::Pending
                    && q.cluster_id.is_none()
            })
            .count()
    }
}

#[async_trait]
impl QuestionStore for MockQuestionStore {
    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(question.id);
        inner.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>> {
        Ok(self.inner.lock().unwrap().questions.get(&id).cloned())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: QuestionStatus,
        rejection_reason: Option<&str>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(q) = inner.questions.get_mut(&id) {
            q.status = status;
            if let Some(reason) = rejection_reason {
                q.rejection_reason = Some(reason.to_string());
            }
            q.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn write_analysis(&self, id: Uuid, fields: &AnalysisFields) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(q) = inner.questions.get_mut(&id) {
            q.difficulty_score = fields.difficulty_score;
            q.difficulty_level = fields.difficulty_level;
            q.keywords = fields.keywords.clone();
            q.cluster_id = fields.cluster_id;
            q.ai_response_draft = fields.response_draft.clone();
            q.ai_summary = fields.summary.clone();
            q.sentiment_score = fields.sentiment_score;
            q.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn pending_for_ai(
        &self,
        course_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<PendingQuestion>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.questions.get(id))
            .filter(|q| {
                q.course_id == course_id
                    && q.status == QuestionStatus::Pending
                    && q.cluster_id.is_none()
            })
            .take(limit)
            .map(|q| PendingQuestion {
                id: q.id,
                pseudonym: q.pseudonym.clone(),
                question_text: q.question_text.clone(),
                created_at: q.created_at,
            })
            .collect())
    }

    async fn assign_cluster(&self, question_ids: &[Uuid], cluster_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for id in question_ids {
            if let Some(q) = inner.questions.get_mut(id) {
                q.cluster_id = Some(cluster_id);
                q.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn release_cluster(&self, cluster_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut released = 0;
        for q in inner.questions.values_mut() {
            if q.cluster_id == Some(cluster_id) {
                q.cluster_id = None;
                q.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }

    async fn mark_merged(&self, question_ids: &[Uuid], qa_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for id in question_ids {
            if let Some(q) = inner.questions.get_mut(id) {
                q.is_merged = true;
                q.merged_to_qa_id = Some(qa_id);
                q.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// MockClusterStore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockClusterStore {
    inner: Arc<Mutex<ClusterStoreInner>>,
}

#[derive(Default)]
struct ClusterStoreInner {
    clusters: HashMap<Uuid, Cluster>,
    order: Vec<Uuid>,
}

impl MockClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_cluster(&self, course_id: Uuid, label: &str, is_locked: bool) -> Uuid {
        self.seed(course_id, label, 0, is_locked)
    }

    pub fn seed_cluster_with_count(&self, course_id: Uuid, label: &str, count: i32) -> Uuid {
        self.seed(course_id, label, count, false)
    }

    fn seed(&self, course_id: Uuid, label: &str, count: i32, is_locked: bool) -> Uuid {
        let now = Utc::now();
        let cluster = Cluster {
            id: Uuid::new_v4(),
            course_id,
            topic_label: label.to_string(),
            summary: String::new(),
            question_count: count,
            avg_difficulty: 0.0,
            is_locked,
            manual_label: None,
            created_at: now,
            updated_at: now,
        };
        let id = cluster.id;
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(id);
        inner.clusters.insert(id, cluster);
        id
    }

    pub fn all_for_course(&self, course_id: Uuid) -> Vec<Cluster> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.clusters.get(id))
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect()
    }

    pub fn get_direct(&self, id: Uuid) -> Cluster {
        self.inner.lock().unwrap().clusters[&id].clone()
    }
}

#[async_trait]
impl ClusterStore for MockClusterStore {
    async fn get_cluster(&self, id: Uuid) -> StoreResult<Option<Cluster>> {
        Ok(self.inner.lock().unwrap().clusters.get(&id).cloned())
    }

    async fn clusters_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Cluster>> {
        Ok(self.all_for_course(course_id))
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(cluster.id);
        inner.clusters.insert(cluster.id, cluster.clone());
        Ok(())
    }

    async fn bump_question_count(&self, id: Uuid, by: i32) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(c) = inner.clusters.get_mut(&id) {
            c.question_count += by;
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn refresh_avg_difficulty(&self, _id: Uuid) -> StoreResult<()> {
        Ok(())
    }

    async fn set_manual_label(&self, id: Uuid, label: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.clusters.get_mut(&id) {
            Some(c) => {
                c.manual_label = Some(label.to_string());
                c.is_locked = true;
                c.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_cluster(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.order.retain(|c| *c != id);
        Ok(inner.clusters.remove(&id).is_some())
    }
}

// ---------------------------------------------------------------------------
// MockGateway
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockGateway {
    proposals: Vec<ClusterProposal>,
    analysis: Option<QuestionAnalysis>,
    failing: bool,
}

impl MockGateway {
    pub fn returning(proposals: Vec<ClusterProposal>) -> Self {
        Self {
            proposals,
            analysis: None,
            failing: false,
        }
    }

    pub fn analyzing(analysis: QuestionAnalysis) -> Self {
        Self {
            proposals: Vec::new(),
            analysis: Some(analysis),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            proposals: Vec::new(),
            analysis: None,
            failing: true,
        }
    }
}

#[async_trait]
impl AiGateway for MockGateway {
    async fn analyze(&self, _text: &str) -> GatewayResult<QuestionAnalysis> {
        if self.failing {
            return Err(GatewayError::Unavailable("mock failure".into()));
        }
        Ok(self.analysis.clone().unwrap_or_default())
    }

    async fn draft_reply(&self, _text: &str) -> String {
        if self.failing {
            DRAFT_UNAVAILABLE.to_string()
        } else {
            "mock draft reply".to_string()
        }
    }

    async fn label_cluster(&self, _texts: &[String]) -> GatewayResult<ClusterLabel> {
        if self.failing {
            return Err(GatewayError::Unavailable("mock failure".into()));
        }
        Ok(ClusterLabel {
            topic_label: "mock topic".into(),
            summary: "mock summary".into(),
        })
    }

    async fn cluster_many(
        &self,
        _texts: &[String],
        _max_new_topics: usize,
        _existing_topics: &[String],
    ) -> GatewayResult<Vec<ClusterProposal>> {
        if self.failing {
            return Err(GatewayError::Unavailable("mock failure".into()));
        }
        Ok(self.proposals.clone())
    }
}
