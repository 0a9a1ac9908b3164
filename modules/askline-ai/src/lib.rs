pub mod client;
pub mod gateway;
mod prompts;
pub mod types;

pub use client::ChatClient;
pub use gateway::{AiGateway, ChatGateway, GatewayError, GatewayResult, DRAFT_UNAVAILABLE};
pub use types::{ClusterLabel, ClusterProposal, QuestionAnalysis};
