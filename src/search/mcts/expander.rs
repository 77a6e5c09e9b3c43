//! Branch expansion with diversity enforcement.
//!
//! Responses are requested one slot at a time so every request sees the
//! siblings produced so far. A candidate that duplicates a sibling is
//! regenerated up to `diversity_retries` times before the slot is given up.

use std::collections::HashSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::conversation::Message;
use crate::generation::{call_with_retry, CallPolicy, Capability, GenerationService};

/// What one expansion event produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionOutcome {
    /// Accepted responses, in slot order
    pub responses: Vec<String>,
    /// Slots whose generation call failed after retries
    pub failed_slots: usize,
    /// Candidates rejected as duplicates of a sibling
    pub rejected_duplicates: usize,
    /// The deadline passed before every slot was tried
    pub interrupted: bool,
}

/// Lowercase, keep alphanumerics, collapse whitespace
#[must_use]
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-set Jaccard similarity of two normalized texts
#[must_use]
pub fn jaccard(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

/// Returns true if `candidate` is empty or too close to any existing response
#[must_use]
pub fn is_near_duplicate(candidate: &str, existing: &[String], threshold: f64) -> bool {
    let norm = normalize(candidate);
    if norm.is_empty() {
        return true;
    }
    existing.iter().map(|e| normalize(e)).any(|e| e == norm || jaccard(&norm, &e) >= threshold)
}

/// Produce new responses for a node until it holds `num_branches` children
///
/// `siblings` are the responses the node already has. The deadline is
/// checked before each slot and bounds each slot's calls.
pub async fn expand(
    service: &dyn GenerationService,
    conversation: &[Message],
    siblings: &[String],
    config: &SearchConfig,
    policy: &CallPolicy,
    deadline: Option<Instant>,
) -> ExpansionOutcome {
    let mut outcome = ExpansionOutcome::default();
    let mut known: Vec<String> = siblings.to_vec();

    for slot in siblings.len()..config.num_branches {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            outcome.interrupted = true;
            break;
        }

        let fill = fill_slot(service, conversation, &known, config, policy);
        let slot_result = match deadline {
            Some(d) => match tokio::time::timeout_at(d, fill).await {
                Ok(result) => result,
                Err(_) => {
                    outcome.interrupted = true;
                    break;
                }
            },
            None => fill.await,
        };

        outcome.rejected_duplicates += slot_result.rejected;
        match slot_result.accepted {
            Some(text) => {
                debug!(slot, "branch accepted");
                known.push(text.clone());
                outcome.responses.push(text);
            }
            None => {
                if slot_result.failed {
                    outcome.failed_slots += 1;
                }
                debug!(slot, "slot yielded no branch");
            }
        }
    }

    outcome
}

#[derive(Debug, Default)]
struct SlotResult {
    accepted: Option<String>,
    rejected: usize,
    failed: bool,
}

async fn fill_slot(
    service: &dyn GenerationService,
    conversation: &[Message],
    known: &[String],
    config: &SearchConfig,
    policy: &CallPolicy,
) -> SlotResult {
    let goal = config.goal();
    let mut result = SlotResult::default();
    for attempt in 0..=config.diversity_retries {
        let generated = call_with_retry(policy, Capability::Branch, || {
            service.generate_branch(conversation, known, goal, config.max_tokens)
        })
        .await;

        let text = match generated {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!(error = %err, "branch generation failed");
                result.failed = true;
                return result;
            }
        };

        if is_near_duplicate(&text, known, config.similarity_threshold) {
            result.rejected += 1;
            debug!(attempt, "rejected near-duplicate branch");
            continue;
        }
        result.accepted = Some(text);
        return result;
    }
    result
}
