//! Metric requests and score aggregation.
//!
//! Raw reports are sanitized before use: missing general metrics count as
//! 0, values are clamped to `[0, 1]` (non-finite become 0), and at most
//! [`MAX_GOAL_METRICS`] goal metrics are kept, in name order.

use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::debug;

use super::simulator::Rollout;
use super::Reward;
use crate::conversation::{GENERAL_METRICS, MAX_GOAL_METRICS};
use crate::generation::{call_with_retry, CallPolicy, Capability, GenerationService, ScoreReport};

/// A sanitized report for one rollout
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutScore {
    /// Exactly the six general metrics
    pub general: BTreeMap<String, f64>,
    pub goal: BTreeMap<String, f64>,
}

impl RolloutScore {
    /// Mean over the general metrics
    #[must_use]
    pub fn general_mean(&self) -> f64 {
        mean(self.general.values().copied())
    }

    /// Scalar score of this rollout alone
    #[must_use]
    pub fn combined(&self, goal_active: bool) -> Reward {
        blend(self.general_mean(), &self.goal, goal_active)
    }
}

/// Node-level aggregate over the scored rollouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateScore {
    pub score: Reward,
    pub general: BTreeMap<String, f64>,
    pub goal: BTreeMap<String, f64>,
}

fn clamp_metric(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn blend(general_mean: f64, goal: &BTreeMap<String, f64>, goal_active: bool) -> Reward {
    if goal_active && !goal.is_empty() {
        0.5 * general_mean + 0.5 * mean(goal.values().copied())
    } else {
        general_mean
    }
}

/// Normalize a raw report
#[must_use]
pub fn sanitize(report: &ScoreReport) -> RolloutScore {
    let general = GENERAL_METRICS
        .iter()
        .map(|&name| (name.to_string(), clamp_metric(report.general.get(name).copied().unwrap_or(0.0))))
        .collect();
    let goal = report
        .goal
        .iter()
        .take(MAX_GOAL_METRICS)
        .map(|(name, v)| (name.clone(), clamp_metric(*v)))
        .collect();
    RolloutScore { general, goal }
}

/// Average metrics across rollouts and combine them into one score
///
/// With a goal active and goal metrics reported, the score is
/// `0.5 * mean(general) + 0.5 * mean(goal)`; otherwise `mean(general)`.
/// Goal metrics average over every rollout, a rollout lacking a name
/// counting as 0 for it. An empty slice yields score 0.
#[must_use]
pub fn aggregate(scores: &[RolloutScore], goal_active: bool) -> AggregateScore {
    if scores.is_empty() {
        return AggregateScore::default();
    }

    let general: BTreeMap<String, f64> = GENERAL_METRICS
        .iter()
        .map(|&name| {
            let avg = mean(scores.iter().filter_map(|s| s.general.get(name).copied()));
            (name.to_string(), avg)
        })
        .collect();

    let mut goal_sums: BTreeMap<String, f64> = BTreeMap::new();
    if goal_active {
        for s in scores {
            for (name, v) in &s.goal {
                *goal_sums.entry(name.clone()).or_insert(0.0) += v;
            }
        }
    }
    let rollouts = scores.len() as f64;
    let goal: BTreeMap<String, f64> = goal_sums
        .into_iter()
        .take(MAX_GOAL_METRICS)
        .map(|(name, sum)| (name, sum / rollouts))
        .collect();

    let score = blend(mean(general.values().copied()), &goal, goal_active);
    AggregateScore { score: clamp_metric(score), general, goal }
}

/// Score every rollout concurrently; failed calls yield `None`
pub async fn score_rollouts(
    service: &dyn GenerationService,
    rollouts: &[Rollout],
    goal: Option<&str>,
    policy: &CallPolicy,
) -> Vec<Option<RolloutScore>> {
    let calls = rollouts.iter().map(|r| async move {
        call_with_retry(policy, Capability::Score, || service.score(&r.conversation, goal)).await
    });
    join_all(calls)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(report) => Some(sanitize(&report)),
            Err(err) => {
                debug!(error = %err, "rollout excluded from scoring");
                None
            }
        })
        .collect()
}
