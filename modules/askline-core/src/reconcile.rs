use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use askline_ai::{AiGateway, GatewayError};
use askline_common::{AsklineError, Cluster};

use crate::traits::{ClusterStore, QuestionStore, StoreResult};

/// Max unclustered questions pulled into one reconciliation run.
pub const RECONCILE_BATCH: usize = 50;

/// Outcome counters for one reconciliation run.
#[derive(Debug, Default, Clone)]
pub struct ReconcileStats {
    pub batch_size: usize,
    pub matched_existing: usize,
    pub created: usize,
    pub assigned: usize,
    /// Indices the model returned that were out of range, duplicated, or in
    /// groups discarded by the quota clamp.
    pub discarded_indices: usize,
    /// Proposed-new groups dropped because the new-topic budget was spent.
    pub over_quota_groups: usize,
    pub status: String,
}

/// Assigns a batch of analyzed-but-unclustered PENDING questions to new or
/// existing topic clusters. Model output is untrusted: indices are
/// bounds-checked, duplicate labels fold into one cluster, and the
/// new-topic budget is enforced here regardless of what the prompt asked.
///
/// Runs must be serialized per course (see `JobRegistry`): the
/// question_count bump is additive and double-counts under a race.
pub struct Reconciler<Q, C, G> {
    questions: Q,
    clusters: C,
    gateway: G,
}

impl<Q: QuestionStore, C: ClusterStore, G: AiGateway> Reconciler<Q, C, G> {
    pub fn new(questions: Q, clusters: C, gateway: G) -> Self {
        Self {
            questions,
            clusters,
            gateway,
        }
    }

    pub async fn run(&self, course_id: Uuid, topic_ceiling: usize) -> StoreResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        // 1. Existing clusters: label -> id map and the remaining budget.
        let existing = self.clusters.clusters_for_course(course_id).await?;
        let mut label_map: HashMap<String, Uuid> =
            existing.iter().map(|c| (c.topic_label.clone(), c.id)).collect();
        let existing_labels: Vec<String> = existing.iter().map(|c| c.topic_label.clone()).collect();
        let remaining_quota = topic_ceiling.saturating_sub(existing.len());

        // 2. Batch of unclustered PENDING questions.
        let pending = self
            .questions
            .pending_for_ai(course_id, RECONCILE_BATCH)
            .await?;
        stats.batch_size = pending.len();
        if pending.is_empty() {
            stats.status = "no_pending".into();
            return Ok(stats);
        }
        let texts: Vec<String> = pending.iter().map(|p| p.question_text.clone()).collect();

        // 3. Ask the model. Total failure aborts the run quietly; partial
        //    writes from earlier runs stay committed.
        let proposals = match self
            .gateway
            .cluster_many(&texts, remaining_quota, &existing_labels)
            .await
        {
            Ok(p) => p,
            Err(GatewayError::Unavailable(msg)) => {
                warn!(course_id = %course_id, error = %msg, "clustering call failed, aborting run");
                return Err(AsklineError::AiUnavailable(msg));
            }
        };
        if proposals.is_empty() {
            stats.status = "no_clusters".into();
            return Ok(stats);
        }

        // 4-5. Resolve each group to a cluster id and assign members.
        let mut assigned_indices: HashSet<usize> = HashSet::new();
        let mut touched: HashSet<Uuid> = HashSet::new();

        for proposal in proposals {
            let label = proposal.topic_label.trim();
            if label.is_empty() {
                continue;
            }

            // Untrusted indices: in range, not already assigned this run.
            let mut member_indices = Vec::new();
            for &idx in &proposal.question_indices {
                if idx < pending.len() && assigned_indices.insert(idx) {
                    member_indices.push(idx);
                } else {
                    stats.discarded_indices += 1;
                }
            }
            if member_indices.is_empty() {
                continue;
            }

            let cluster_id = match label_map.get(label) {
                // Case-sensitive label match: same cluster. Later groups in
                // this response can match clusters created earlier in it.
                Some(&id) => {
                    self.clusters
                        .bump_question_count(id, member_indices.len() as i32)
                        .await?;
                    stats.matched_existing += 1;
                    id
                }
                None => {
                    if stats.created >= remaining_quota {
                        warn!(
                            course_id = %course_id,
                            label,
                            "model exceeded new-topic budget, discarding group"
                        );
                        stats.over_quota_groups += 1;
                        stats.discarded_indices += member_indices.len();
                        for idx in member_indices {
                            assigned_indices.remove(&idx);
                        }
                        continue;
                    }
                    let now = Utc::now();
                    let cluster = Cluster {
                        id: Uuid::new_v4(),
                        course_id,
                        topic_label: label.to_string(),
                        summary: proposal.summary.trim().to_string(),
                        question_count: member_indices.len() as i32,
                        avg_difficulty: 0.0,
                        is_locked: false,
                        manual_label: None,
                        created_at: now,
                        updated_at: now,
                    };
                    self.clusters.insert_cluster(&cluster).await?;
                    label_map.insert(label.to_string(), cluster.id);
                    stats.created += 1;
                    cluster.id
                }
            };

            let ids: Vec<Uuid> = member_indices.iter().map(|&i| pending[i].id).collect();
            stats.assigned += self.questions.assign_cluster(&ids, cluster_id).await? as usize;
            touched.insert(cluster_id);
        }

        for cluster_id in touched {
            self.clusters.refresh_avg_difficulty(cluster_id).await?;
        }

        stats.status = "reconciled".into();
        info!(
            course_id = %course_id,
            batch = stats.batch_size,
            created = stats.created,
            matched = stats.matched_existing,
            assigned = stats.assigned,
            discarded = stats.discarded_indices,
            "reconciliation finished"
        );
        Ok(stats)
    }
}

/// Staff-facing cluster management: rename/lock, manual creation, deletion.
pub struct ClusterAdmin<C, Q> {
    clusters: C,
    questions: Q,
}

impl<C: ClusterStore, Q: QuestionStore> ClusterAdmin<C, Q> {
    pub fn new(clusters: C, questions: Q) -> Self {
        Self { clusters, questions }
    }

    /// Rename a cluster. Sets `manual_label` and locks it so reconciliation
    /// treats the staff label as authoritative.
    pub async fn rename(&self, cluster_id: Uuid, label: &str) -> StoreResult<Cluster> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AsklineError::Validation("cluster label is empty".into()));
        }
        if !self.clusters.set_manual_label(cluster_id, label).await? {
            return Err(AsklineError::NotFound(format!("cluster {cluster_id}")));
        }
        self.clusters
            .get_cluster(cluster_id)
            .await?
            .ok_or_else(|| AsklineError::NotFound(format!("cluster {cluster_id}")))
    }

    /// Create an empty cluster by hand. Always locked.
    pub async fn create_manual(
        &self,
        course_id: Uuid,
        label: &str,
        summary: &str,
    ) -> StoreResult<Cluster> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AsklineError::Validation("cluster label is empty".into()));
        }
        let now = Utc::now();
        let cluster = Cluster {
            id: Uuid::new_v4(),
            course_id,
            topic_label: label.to_string(),
            summary: summary.trim().to_string(),
            question_count: 0,
            avg_difficulty: 0.0,
            is_locked: true,
            manual_label: Some(label.to_string()),
            created_at: now,
            updated_at: now,
        };
        self.clusters.insert_cluster(&cluster).await?;
        Ok(cluster)
    }

    /// Delete a cluster, releasing every member question back to
    /// `cluster_id = NULL` first so no dangling reference survives.
    pub async fn delete(&self, cluster_id: Uuid) -> StoreResult<u64> {
        if self.clusters.get_cluster(cluster_id).await?.is_none() {
            return Err(AsklineError::NotFound(format!("cluster {cluster_id}")));
        }
        let released = self.questions.release_cluster(cluster_id).await?;
        self.clusters.delete_cluster(cluster_id).await?;
        info!(cluster_id = %cluster_id, released, "cluster deleted");
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockClusterStore, MockGateway, MockQuestionStore};
    use askline_ai::ClusterProposal;

    fn proposal(label: &str, summary: &str, indices: &[usize]) -> ClusterProposal {
        ClusterProposal {
            topic_label: label.to_string(),
            summary: summary.to_string(),
            question_indices: indices.to_vec(),
        }
    }

    fn seed_pending(questions: &MockQuestionStore, course_id: Uuid, n: usize) -> Vec<Uuid> {
        (0..n)
            .map(|i| questions.seed_pending_with_text(course_id, "U", &format!("question {i}")))
            .collect()
    }

    #[tokio::test]
    async fn duplicate_label_folds_into_one_cluster() {
        // 3 pending questions, the model returns "syntax"
        // twice. Exactly one cluster, question_count == 3.
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        let ids = seed_pending(&questions, course_id, 3);
        let clusters = MockClusterStore::new();
        let gateway = MockGateway::returning(vec![
            proposal("syntax", "s", &[0, 2]),
            proposal("syntax", "s2", &[1]),
        ]);

        let r = Reconciler::new(questions.clone(), clusters.clone(), gateway);
        let stats = r.run(course_id, 10).await.unwrap();

        let stored = clusters.all_for_course(course_id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].topic_label, "syntax");
        assert_eq!(stored[0].question_count, 3);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.matched_existing, 1);
        assert_eq!(stats.assigned, 3);
        for id in ids {
            let q = questions.get_direct(id);
            assert_eq!(q.cluster_id, Some(stored[0].id));
        }
    }

    #[tokio::test]
    async fn quota_caps_new_clusters() {
        // Existing ["loops"], ceiling 2 => quota 1. Model proposes loops,
        // recursion, debugging: only one truly new cluster may be created.
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 3);
        let clusters = MockClusterStore::new();
        clusters.seed_cluster(course_id, "loops", false);
        let gateway = MockGateway::returning(vec![
            proposal("loops", "", &[0]),
            proposal("recursion", "", &[1]),
            proposal("debugging", "", &[2]),
        ]);

        let r = Reconciler::new(questions.clone(), clusters.clone(), gateway);
        let stats = r.run(course_id, 2).await.unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(stats.over_quota_groups, 1);
        let stored = clusters.all_for_course(course_id);
        assert_eq!(stored.len(), 2); // loops + recursion only
        assert!(stored.iter().any(|c| c.topic_label == "recursion"));
        assert!(!stored.iter().any(|c| c.topic_label == "debugging"));
        // The discarded group's question stays unclustered for a later run.
        let unassigned = questions.pending_for_course(course_id);
        assert_eq!(unassigned, 1);
    }

    #[tokio::test]
    async fn existing_label_match_bumps_additively() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 2);
        let clusters = MockClusterStore::new();
        let loops_id = clusters.seed_cluster_with_count(course_id, "loops", 5);
        let gateway = MockGateway::returning(vec![proposal("loops", "", &[0, 1])]);

        let r = Reconciler::new(questions, clusters.clone(), gateway);
        let stats = r.run(course_id, 10).await.unwrap();

        assert_eq!(stats.matched_existing, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(clusters.get_direct(loops_id).question_count, 7);
    }

    #[tokio::test]
    async fn label_matching_is_case_sensitive() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 1);
        let clusters = MockClusterStore::new();
        clusters.seed_cluster(course_id, "loops", false);
        let gateway = MockGateway::returning(vec![proposal("Loops", "", &[0])]);

        let r = Reconciler::new(questions, clusters.clone(), gateway);
        let stats = r.run(course_id, 10).await.unwrap();

        // "Loops" != "loops": a new cluster, not a match.
        assert_eq!(stats.created, 1);
        assert_eq!(stats.matched_existing, 0);
        assert_eq!(clusters.all_for_course(course_id).len(), 2);
    }

    #[tokio::test]
    async fn out_of_range_and_duplicate_indices_are_discarded() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 2);
        let clusters = MockClusterStore::new();
        let gateway = MockGateway::returning(vec![
            proposal("syntax", "", &[0, 7, 99]),
            proposal("types", "", &[1, 0]), // 0 already taken above
        ]);

        let r = Reconciler::new(questions.clone(), clusters.clone(), gateway);
        let stats = r.run(course_id, 10).await.unwrap();

        assert_eq!(stats.assigned, 2);
        assert_eq!(stats.discarded_indices, 3); // 7, 99, duplicate 0
        let stored = clusters.all_for_course(course_id);
        let syntax = stored.iter().find(|c| c.topic_label == "syntax").unwrap();
        assert_eq!(syntax.question_count, 1);
    }

    #[tokio::test]
    async fn empty_response_aborts_quietly() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 2);
        let clusters = MockClusterStore::new();
        let gateway = MockGateway::returning(vec![]);

        let r = Reconciler::new(questions, clusters.clone(), gateway);
        let stats = r.run(course_id, 10).await.unwrap();
        assert_eq!(stats.status, "no_clusters");
        assert!(clusters.all_for_course(course_id).is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_aborts_without_writes() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 2);
        let clusters = MockClusterStore::new();
        let gateway = MockGateway::failing();

        let r = Reconciler::new(questions.clone(), clusters.clone(), gateway);
        let err = r.run(course_id, 10).await.unwrap_err();
        assert!(matches!(err, AsklineError::AiUnavailable(_)));
        assert!(clusters.all_for_course(course_id).is_empty());
        assert_eq!(questions.pending_for_course(course_id), 2);
    }

    #[tokio::test]
    async fn no_pending_short_circuits_before_model_call() {
        let course_id = Uuid::new_v4();
        // A failing gateway proves the model is never consulted.
        let r = Reconciler::new(
            MockQuestionStore::new(),
            MockClusterStore::new(),
            MockGateway::failing(),
        );
        let stats = r.run(course_id, 10).await.unwrap();
        assert_eq!(stats.status, "no_pending");
    }

    #[tokio::test]
    async fn zero_quota_still_matches_existing() {
        // Ceiling already consumed: assignments to existing labels proceed,
        // anything new is discarded.
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        seed_pending(&questions, course_id, 2);
        let clusters = MockClusterStore::new();
        clusters.seed_cluster(course_id, "loops", false);
        clusters.seed_cluster(course_id, "types", false);
        let gateway = MockGateway::returning(vec![
            proposal("loops", "", &[0]),
            proposal("closures", "", &[1]),
        ]);

        let r = Reconciler::new(questions, clusters.clone(), gateway);
        let stats = r.run(course_id, 2).await.unwrap();
        assert_eq!(stats.matched_existing, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.over_quota_groups, 1);
        assert_eq!(clusters.all_for_course(course_id).len(), 2);
    }

    #[tokio::test]
    async fn delete_releases_all_members() {
        let course_id = Uuid::new_v4();
        let questions = MockQuestionStore::new();
        let clusters = MockClusterStore::new();
        let cluster_id = clusters.seed_cluster(course_id, "syntax", false);
        let a = questions.seed_pending_with_text(course_id, "U1", "q1");
        let b = questions.seed_pending_with_text(course_id, "U2", "q2");
        questions.set_cluster_direct(a, cluster_id);
        questions.set_cluster_direct(b, cluster_id);

        let admin = ClusterAdmin::new(clusters.clone(), questions.clone());
        let released = admin.delete(cluster_id).await.unwrap();

        assert_eq!(released, 2);
        assert!(questions.get_direct(a).cluster_id.is_none());
        assert!(questions.get_direct(b).cluster_id.is_none());
        assert!(clusters.all_for_course(course_id).is_empty());
    }

    #[tokio::test]
    async fn rename_locks_and_sets_manual_label() {
        let course_id = Uuid::new_v4();
        let clusters = MockClusterStore::new();
        let id = clusters.seed_cluster(course_id, "loops", false);
        let admin = ClusterAdmin::new(clusters.clone(), MockQuestionStore::new());

        let renamed = admin.rename(id, "Loops & iteration").await.unwrap();
        assert!(renamed.is_locked);
        assert_eq!(renamed.manual_label.as_deref(), Some("Loops & iteration"));
        assert_eq!(renamed.display_label(), "Loops & iteration");
        // The AI join key is untouched.
        assert_eq!(renamed.topic_label, "loops");
    }

    #[tokio::test]
    async fn manual_clusters_are_always_locked() {
        let admin = ClusterAdmin::new(MockClusterStore::new(), MockQuestionStore::new());
        let c = admin
            .create_manual(Uuid::new_v4(), "exam prep", "pre-exam questions")
            .await
            .unwrap();
        assert!(c.is_locked);
        assert_eq!(c.question_count, 0);
    }

    #[tokio::test]
    async fn admin_rejects_missing_cluster() {
        let admin = ClusterAdmin::new(MockClusterStore::new(), MockQuestionStore::new());
        assert!(matches!(
            admin.rename(Uuid::new_v4(), "x").await.unwrap_err(),
            AsklineError::NotFound(_)
        ));
        assert!(matches!(
            admin.delete(Uuid::new_v4()).await.unwrap_err(),
            AsklineError::NotFound(_)
        ));
    }
}
