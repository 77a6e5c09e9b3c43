//! Stored analysis record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::SearchOutcome;

/// Scores across the top-level branches
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallScores {
    pub best_score: f64,
    pub average_score: f64,
}

impl OverallScores {
    #[must_use]
    pub fn from_outcome(outcome: &SearchOutcome) -> Self {
        let scores: Vec<f64> = outcome.top_level().map(|(_, b)| b.score).collect();
        if scores.is_empty() {
            return Self::default();
        }
        Self {
            best_score: scores.iter().copied().fold(f64::MIN, f64::max),
            average_score: scores.iter().sum::<f64>() / scores.len() as f64,
        }
    }
}

/// One finished analysis, as written to a [`ResultSink`](super::ResultSink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
    pub conversation_goal: Option<String>,
    pub overall_scores: OverallScores,
    #[serde(flatten)]
    pub outcome: SearchOutcome,
}

impl AnalysisRecord {
    /// Wrap an outcome with a fresh id and the current time
    #[must_use]
    pub fn new(chat_id: impl Into<String>, conversation_goal: Option<String>, outcome: SearchOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id: chat_id.into(),
            created_at: Utc::now(),
            conversation_goal,
            overall_scores: OverallScores::from_outcome(&outcome),
            outcome,
        }
    }
}
