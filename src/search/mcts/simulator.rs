//! Multi-turn rollouts after a candidate response.

use futures::future::join_all;
use tracing::debug;

use crate::config::SearchConfig;
use crate::conversation::Message;
use crate::generation::{call_with_retry, CallPolicy, Capability, GenerationService, Result};

/// One simulated continuation of a node's conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    /// Snapshot plus every simulated turn
    pub conversation: Vec<Message>,
    /// Number of leading messages taken from the node snapshot
    pub snapshot_len: usize,
}

impl Rollout {
    /// Messages simulated after the snapshot
    #[must_use]
    pub fn simulated(&self) -> &[Message] {
        &self.conversation[self.snapshot_len.min(self.conversation.len())..]
    }

    /// Simulated user turns, in order
    #[must_use]
    pub fn reactions(&self) -> Vec<String> {
        self.simulated()
            .iter()
            .filter(|m| m.role == crate::conversation::Role::User)
            .map(|m| m.content.clone())
            .collect()
    }
}

/// Run `reaction_samples` rollouts from `snapshot` concurrently
///
/// Rollouts whose calls fail after retries are dropped, so the result may
/// hold fewer than `reaction_samples` entries, or none.
pub async fn simulate(
    service: &dyn GenerationService,
    snapshot: &[Message],
    config: &SearchConfig,
    policy: &CallPolicy,
) -> Vec<Rollout> {
    let runs = (0..config.reaction_samples).map(|_| rollout(service, snapshot, config, policy));
    let results = join_all(runs).await;

    let total = results.len();
    let rollouts: Vec<Rollout> = results
        .into_iter()
        .enumerate()
        .filter_map(|(sample, r)| match r {
            Ok(rollout) => Some(rollout),
            Err(err) => {
                debug!(sample, error = %err, "rollout dropped");
                None
            }
        })
        .collect();
    debug!(survived = rollouts.len(), total, "rollouts finished");
    rollouts
}

/// User reaction, then `simulation_depth` continuation/reaction pairs
async fn rollout(
    service: &dyn GenerationService,
    snapshot: &[Message],
    config: &SearchConfig,
    policy: &CallPolicy,
) -> Result<Rollout> {
    let goal = config.goal();
    let mut conversation = snapshot.to_vec();

    let reaction = call_with_retry(policy, Capability::Reaction, || {
        service.generate_reaction(&conversation, goal)
    })
    .await?;
    conversation.push(Message::user(reaction));

    for _ in 0..config.simulation_depth {
        let continuation = call_with_retry(policy, Capability::Continuation, || {
            service.generate_continuation(&conversation, config.max_tokens)
        })
        .await?;
        conversation.push(Message::assistant(continuation));

        let reaction = call_with_retry(policy, Capability::Reaction, || {
            service.generate_reaction(&conversation, goal)
        })
        .await?;
        conversation.push(Message::user(reaction));
    }

    Ok(Rollout { conversation, snapshot_len: snapshot.len() })
}
