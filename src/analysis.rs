//! Selection rationale.
//!
//! After a search the service is asked to explain the pick, given a
//! summary of every top-level option. Any failure falls back to a fixed
//! template built from the winner's score and visits.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conversation::{preview, Message};
use crate::generation::{call_with_retry, CallPolicy, Capability, GenerationError, GenerationService};
use crate::search::BranchRecord;

/// Characters of each response shown in an option summary
pub const OPTION_PREVIEW_CHARS: usize = 100;

/// Highest metric of an option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStrength {
    pub metric: String,
    pub value: f64,
}

/// One top-level option as shown to the explainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSummary {
    /// Branch index
    pub index: usize,
    /// Truncated response text
    pub response: String,
    pub score: f64,
    pub visits: usize,
    pub key_strength: Option<KeyStrength>,
}

/// Input to `explain_selection`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub selected_index: usize,
    pub selected_response: String,
    pub selected_score: f64,
    pub selected_visits: usize,
    pub options: Vec<OptionSummary>,
}

fn key_strength(branch: &BranchRecord) -> Option<KeyStrength> {
    let mut best: Option<(&String, f64)> = None;
    for (name, &value) in branch.general_metrics.iter().chain(branch.goal_metrics.iter()) {
        match best {
            Some((_, b)) if value <= b => {}
            _ => best = Some((name, value)),
        }
    }
    best.map(|(metric, value)| KeyStrength { metric: metric.clone(), value })
}

impl SelectionSummary {
    /// Summarize the top-level branches around the branch at `selected`
    #[must_use]
    pub fn from_branches(branches: &[BranchRecord], selected: usize) -> Self {
        let options = branches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_top_level())
            .map(|(index, b)| OptionSummary {
                index,
                response: preview(&b.response, OPTION_PREVIEW_CHARS),
                score: b.score,
                visits: b.visits,
                key_strength: key_strength(b),
            })
            .collect();

        let winner = branches.get(selected);
        Self {
            selected_index: selected,
            selected_response: winner.map(|b| b.response.clone()).unwrap_or_default(),
            selected_score: winner.map_or(0.0, |b| b.score),
            selected_visits: winner.map_or(0, |b| b.visits),
            options,
        }
    }
}

/// Template rationale used whenever the service gives no explanation
#[must_use]
pub fn default_rationale(index: usize, score: f64, visits: usize) -> String {
    format!(
        "Selected response {} based on MCTS evaluation. This response achieved a score of {:.2} across {} simulations.",
        index + 1,
        score,
        visits
    )
}

/// Ask the service to explain the selection, falling back to the template
pub async fn explain(
    service: &dyn GenerationService,
    conversation: &[Message],
    summary: &SelectionSummary,
    goal: Option<&str>,
    max_tokens: u32,
    policy: &CallPolicy,
) -> String {
    let fallback = || default_rationale(summary.selected_index, summary.selected_score, summary.selected_visits);

    let explained = call_with_retry(policy, Capability::Explain, || {
        service.explain_selection(conversation, summary, goal, max_tokens)
    })
    .await;

    match explained {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            debug!("empty rationale, using template");
            fallback()
        }
        Err(GenerationError::Unsupported(_)) => fallback(),
        Err(err) => {
            warn!(error = %err, "rationale generation failed, using template");
            fallback()
        }
    }
}
