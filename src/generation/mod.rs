//! Generation capability consumed by the search.
//!
//! The search never produces or judges text itself. Every branch, simulated
//! turn and metric score comes from a [`GenerationService`]. The service is
//! shared across concurrent evaluation tasks, so implementations must be
//! `Send + Sync` and callable through `Arc<dyn GenerationService>`.

pub mod openai;
mod retry;
pub mod stub;
pub mod tools;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::SelectionSummary;
use crate::conversation::{Message, GENERAL_METRICS};

pub use retry::{call_with_retry, CallPolicy};

/// Result type for generation calls
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors returned by a generation service call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Capability not supported: {0}")]
    Unsupported(&'static str),

    #[error("Tool call failed: {0}")]
    Tool(String),
}

impl GenerationError {
    /// Check if another attempt of the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::InvalidResponse(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Unsupported(_) | Self::Tool(_) => false,
        }
    }
}

/// The five operations a generation service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Branch,
    Reaction,
    Continuation,
    Score,
    Explain,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Branch => "generate_branch",
            Capability::Reaction => "generate_reaction",
            Capability::Continuation => "generate_continuation",
            Capability::Score => "score",
            Capability::Explain => "explain_selection",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw metric scores for one simulated conversation
///
/// Values are reported as the service returned them. Clamping, defaulting
/// of missing general metrics and truncation of goal metrics happen in the
/// scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    #[serde(default, alias = "general_metrics")]
    pub general: BTreeMap<String, f64>,
    #[serde(default, alias = "goal_metrics")]
    pub goal: BTreeMap<String, f64>,
}

impl ScoreReport {
    /// Report with every general metric set to `value` and no goal metrics
    pub fn uniform(value: f64) -> Self {
        Self {
            general: GENERAL_METRICS.iter().map(|m| (m.to_string(), value)).collect(),
            goal: BTreeMap::new(),
        }
    }

    /// Add a goal metric
    pub fn with_goal_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.goal.insert(name.into(), value);
        self
    }
}

/// External service producing conversation content and quality scores
///
/// `conversation` is always the full message list up to the point being
/// extended or judged. `goal` is `None` when no goal is active.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Produce one candidate next response, different from `existing_responses`
    async fn generate_branch(
        &self,
        conversation: &[Message],
        existing_responses: &[String],
        goal: Option<&str>,
        max_tokens: u32,
    ) -> Result<String>;

    /// Produce the conversation partner's next turn
    async fn generate_reaction(&self, conversation: &[Message], goal: Option<&str>) -> Result<String>;

    /// Produce the searching side's next turn during a rollout
    async fn generate_continuation(&self, conversation: &[Message], max_tokens: u32) -> Result<String>;

    /// Score a simulated conversation
    async fn score(&self, conversation: &[Message], goal: Option<&str>) -> Result<ScoreReport>;

    /// Explain why the selected response won
    async fn explain_selection(
        &self,
        _conversation: &[Message],
        _summary: &SelectionSummary,
        _goal: Option<&str>,
        _max_tokens: u32,
    ) -> Result<String> {
        Err(GenerationError::Unsupported("explain_selection"))
    }
}
