use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::client::ChatClient;
use crate::prompts;
use crate::types::{ClusterLabel, ClusterProposal, ClusterProposalsWire, QuestionAnalysis};

/// Short timeout for webhook-path replies; the chat platform won't wait long.
const REPLY_TIMEOUT: Duration = Duration::from_secs(15);
/// Longer timeout for analysis and clustering, where model responses are slower.
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);

const REPLY_MAX_TOKENS: u32 = 500;
const ANALYSIS_MAX_TOKENS: u32 = 1024;
const CLUSTER_MAX_TOKENS: u32 = 4096;

/// Sentinel returned by `draft_reply` when the model can't be reached.
pub const DRAFT_UNAVAILABLE: &str =
    "The AI assistant is temporarily unavailable. A teaching assistant will follow up shortly.";

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transient failure (timeout, HTTP error, malformed JSON). Raw
    /// transport errors never cross this boundary.
    #[error("AI service unavailable: {0}")]
    Unavailable(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// The four AI operations the backend depends on. A trait so workflows can
/// be tested against an in-memory mock — no network, no live model.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Analyze one question text. Callers substitute
    /// `QuestionAnalysis::default()` on `Unavailable`.
    async fn analyze(&self, text: &str) -> GatewayResult<QuestionAnalysis>;

    /// Free-text draft reply. Degrades to [`DRAFT_UNAVAILABLE`] — never errors.
    async fn draft_reply(&self, text: &str) -> String;

    /// Concise label + summary for one group of question texts.
    async fn label_cluster(&self, texts: &[String]) -> GatewayResult<ClusterLabel>;

    /// Group a batch of indexed texts into topics. The response is a request
    /// contract with the model, not a guarantee — callers must bounds-check
    /// indices and re-enforce the new-topic budget.
    async fn cluster_many(
        &self,
        texts: &[String],
        max_new_topics: usize,
        existing_topics: &[String],
    ) -> GatewayResult<Vec<ClusterProposal>>;
}

/// Live gateway over a chat-completion endpoint.
#[derive(Clone)]
pub struct ChatGateway {
    client: ChatClient,
}

impl ChatGateway {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AiGateway for ChatGateway {
    async fn analyze(&self, text: &str) -> GatewayResult<QuestionAnalysis> {
        let raw = self
            .client
            .chat(prompts::ANALYZE_SYSTEM, text, ANALYSIS_TIMEOUT, ANALYSIS_MAX_TOKENS)
            .await
            .map_err(unavailable)?;
        let mut analysis: QuestionAnalysis = parse_strict_json(&raw)?;
        analysis.difficulty_score = analysis.difficulty_score.clamp(0.0, 1.0);
        Ok(analysis)
    }

    async fn draft_reply(&self, text: &str) -> String {
        match self
            .client
            .chat(prompts::DRAFT_SYSTEM, text, REPLY_TIMEOUT, REPLY_MAX_TOKENS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "draft reply failed, returning sentinel");
                DRAFT_UNAVAILABLE.to_string()
            }
        }
    }

    async fn label_cluster(&self, texts: &[String]) -> GatewayResult<ClusterLabel> {
        let user = prompts::label_user_prompt(texts);
        let raw = self
            .client
            .chat(prompts::LABEL_SYSTEM, &user, ANALYSIS_TIMEOUT, ANALYSIS_MAX_TOKENS)
            .await
            .map_err(unavailable)?;
        parse_strict_json(&raw)
    }

    async fn cluster_many(
        &self,
        texts: &[String],
        max_new_topics: usize,
        existing_topics: &[String],
    ) -> GatewayResult<Vec<ClusterProposal>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let user = prompts::cluster_user_prompt(texts, max_new_topics, existing_topics);
        let raw = self
            .client
            .chat(prompts::CLUSTER_SYSTEM, &user, ANALYSIS_TIMEOUT, CLUSTER_MAX_TOKENS)
            .await
            .map_err(unavailable)?;
        let wire: ClusterProposalsWire = parse_strict_json(&raw)?;
        Ok(wire.clusters)
    }
}

fn unavailable(e: anyhow::Error) -> GatewayError {
    GatewayError::Unavailable(e.to_string())
}

/// Parse a model response that was asked for as strict JSON. Tolerates the
/// model wrapping it in a markdown fence anyway; anything else unparsable
/// is a total failure.
fn parse_strict_json<T: DeserializeOwned>(raw: &str) -> GatewayResult<T> {
    let stripped = strip_code_fence(raw);
    serde_json::from_str(stripped)
        .map_err(|e| GatewayError::Unavailable(format!("malformed model JSON: {e}")))
}

/// Strip a markdown code fence from a response.
fn strip_code_fence(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
