use serde::{Deserialize, Serialize};

// =============================================================================
// Wire types (OpenAI-compatible chat completions)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChoiceMessage {
    pub content: Option<String>,
}

// =============================================================================
// Domain outputs
// =============================================================================

/// Result of analyzing one question text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty_score: f32,
    #[serde(default = "neutral")]
    pub sentiment: String,
    #[serde(default)]
    pub summary: String,
}

impl Default for QuestionAnalysis {
    /// The defaults callers substitute when the gateway is unavailable.
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            difficulty_score: 0.0,
            sentiment: neutral(),
            summary: String::new(),
        }
    }
}

fn neutral() -> String {
    "neutral".to_string()
}

/// Concise label + summary for one group of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub topic_label: String,
    #[serde(default)]
    pub summary: String,
}

/// One topic group proposed by the model. Indices refer to the input batch
/// and are untrusted until bounds-checked by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterProposal {
    pub topic_label: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub question_indices: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClusterProposalsWire {
    #[serde(default)]
    pub clusters: Vec<ClusterProposal>,
}
