//! MCTS search algorithm implementation.
//!
//! This module contains the iteration loop: selection, expansion, the
//! concurrent evaluation batch, backpropagation and periodic pruning, all
//! bounded by the iteration and wall-clock budgets.

use std::cmp::Ordering;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::result::{branch_index, BranchRecord, IterationRecord, SearchOutcome, SearchState};
use super::stats::{SearchCounters, SearchStatistics};
use crate::analysis::{default_rationale, explain, SelectionSummary};
use crate::config::{validate_config, SearchConfig};
use crate::conversation::Message;
use crate::error::{Error, Result};
use crate::generation::{CallPolicy, GenerationService};
use crate::search::mcts::backprop::backpropagate_batch;
use crate::search::mcts::evaluate::{evaluate_node, NodeEvaluation};
use crate::search::mcts::expander::expand;
use crate::search::mcts::node::{Node, NodeId, NodeStatus};
use crate::search::mcts::pruner::prune;
use crate::search::mcts::selector::select;
use crate::search::mcts::tree::SearchTree;

type Batch = Vec<(NodeId, NodeEvaluation)>;

/// How a single iteration ended
enum Step {
    Completed,
    /// No live frontier remains
    Exhausted,
    /// The deadline passed mid-iteration; nothing was applied
    TimedOut,
}

/// What to evaluate after the expansion phase
enum Frontier {
    /// New children of the frontier
    Expanded(Vec<NodeId>),
    /// The frontier evaluates itself
    SelfEvaluated,
    /// The expansion event yielded nothing; the frontier is now Failed
    Failed,
    /// The deadline passed mid-expansion; accepted children were kept
    Interrupted,
}

/// Main MCTS search over conversation continuations
pub struct MctsSearch {
    /// Search tree
    tree: SearchTree,
    /// Configuration, shared with evaluation tasks
    config: Arc<SearchConfig>,
    service: Arc<dyn GenerationService>,
    policy: CallPolicy,
    state: SearchState,
    counters: SearchCounters,
    log: Vec<IterationRecord>,
}

impl std::fmt::Debug for MctsSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MctsSearch")
            .field("state", &self.state)
            .field("nodes", &self.tree.size())
            .field("iterations", &self.tree.iterations())
            .finish()
    }
}

impl MctsSearch {
    /// Create a search rooted at `history`
    ///
    /// The configuration is validated here, before any call is made.
    pub fn new(history: Vec<Message>, config: SearchConfig, service: Arc<dyn GenerationService>) -> Result<Self> {
        validate_config(&config)?;
        let policy = CallPolicy::from_config(&config);
        Ok(Self {
            tree: SearchTree::new(history),
            config: Arc::new(config),
            service,
            policy,
            state: SearchState::Idle,
            counters: SearchCounters::default(),
            log: Vec::new(),
        })
    }

    /// The search tree, as of the last completed iteration
    #[must_use]
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run iterations until a budget runs out or no frontier remains
    ///
    /// Returns [`Error::TotalExhaustion`] if the root produced no branch.
    /// Running again continues on the same tree; only the remaining
    /// iteration budget is used.
    pub async fn run(&mut self) -> Result<SearchOutcome> {
        self.state = SearchState::Running;
        let started = Instant::now();
        let deadline = self.config.time_budget().map(|budget| started + budget);
        info!(
            branches = self.config.num_branches,
            iterations = self.config.mcts_iterations,
            budget_secs = ?self.config.time_budget_secs,
            goal = self.config.goal().is_some(),
            "search started"
        );

        let mut timed_out = false;
        while self.tree.iterations() < self.config.mcts_iterations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out = true;
                break;
            }
            match self.iterate(deadline).await {
                Step::Completed => {}
                Step::Exhausted => {
                    info!(iterations = self.tree.iterations(), "no live frontier, stopping early");
                    break;
                }
                Step::TimedOut => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            warn!(iterations = self.tree.iterations(), "search time budget exhausted");
        }
        let outcome = self.finish(timed_out, deadline).await;
        info!(
            state = ?self.state,
            iterations = self.tree.iterations(),
            nodes = self.tree.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        outcome
    }

    /// One iteration: select, expand, evaluate, join, backpropagate, prune
    async fn iterate(&mut self, deadline: Option<Instant>) -> Step {
        let Some(frontier) = select(&self.tree, &self.config) else {
            return Step::Exhausted;
        };
        let iteration = self.tree.iterations() + 1;

        let (batch, expanded) = match self.expand_frontier(frontier, deadline).await {
            Frontier::Expanded(children) => (children, true),
            Frontier::SelfEvaluated => (vec![frontier], false),
            // A failed root leaves nothing to select; the iteration is not counted.
            Frontier::Failed if frontier == self.tree.root_id() => return Step::Exhausted,
            Frontier::Failed => (Vec::new(), true),
            Frontier::Interrupted => return Step::TimedOut,
        };
        debug!(iteration, frontier = frontier.value(), batch = batch.len(), expanded, "evaluating batch");

        let mut tasks = JoinSet::new();
        for &id in &batch {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            tasks.spawn(evaluate_node(
                Arc::clone(&self.service),
                id,
                node.conversation.clone(),
                Arc::clone(&self.config),
                self.policy,
            ));
        }
        self.counters.launched += tasks.len();

        let Some(mut results) = join_batch(&mut tasks, deadline).await else {
            tasks.abort_all();
            debug!(iteration, "deadline hit while joining, batch discarded");
            return Step::TimedOut;
        };
        // Join order is completion order; apply in creation order.
        results.sort_by_key(|(id, _)| *id);

        self.counters.evaluated += results.len();
        self.counters.failed_evaluations += results.iter().filter(|(_, e)| e.simulation_failed()).count();
        let mean_score = backpropagate_batch(&mut self.tree, frontier, &results);
        self.tree.advance_iteration();

        let pruned = if iteration % self.config.pruning_interval == 0 {
            prune(&mut self.tree, &self.config)
        } else {
            Vec::new()
        };
        self.counters.pruned += pruned.len();

        info!(
            iteration,
            frontier = frontier.value(),
            batch = results.len(),
            mean_score = ?mean_score,
            pruned = pruned.len(),
            "iteration complete"
        );
        self.log.push(IterationRecord {
            iteration,
            frontier: branch_index(frontier),
            batch: results.iter().filter_map(|(id, _)| branch_index(*id)).collect(),
            expanded,
            mean_score,
            pruned: pruned.into_iter().filter_map(branch_index).collect(),
        });
        Step::Completed
    }

    /// Expand the frontier when it may be expanded
    ///
    /// The root always may; any other node only after it was visited, so
    /// an unscored node is evaluated before it grows children. Only the
    /// slots still missing are requested.
    async fn expand_frontier(&mut self, frontier: NodeId, deadline: Option<Instant>) -> Frontier {
        let Some(node) = self.tree.get(frontier) else {
            return Frontier::Failed;
        };
        if !(node.is_root() || node.stats.visits > 0) {
            return Frontier::SelfEvaluated;
        }

        let conversation = node.conversation.clone();
        let siblings: Vec<String> = self.tree.children(frontier).iter().map(|c| c.response.clone()).collect();
        let outcome = expand(self.service.as_ref(), &conversation, &siblings, &self.config, &self.policy, deadline).await;

        if outcome.interrupted {
            let kept = outcome.responses.into_iter().filter_map(|r| self.tree.add_child(frontier, r)).count();
            debug!(frontier = frontier.value(), kept, "expansion interrupted");
            return Frontier::Interrupted;
        }
        if outcome.rejected_duplicates > 0 || outcome.failed_slots > 0 {
            debug!(
                frontier = frontier.value(),
                rejected = outcome.rejected_duplicates,
                failed = outcome.failed_slots,
                "expansion left slots empty"
            );
        }

        let children: Vec<NodeId> =
            outcome.responses.into_iter().filter_map(|response| self.tree.add_child(frontier, response)).collect();
        if !children.is_empty() {
            return Frontier::Expanded(children);
        }

        warn!(frontier = frontier.value(), existing = siblings.len(), "expansion produced no branches");
        if let Some(node) = self.tree.get_mut(frontier) {
            node.status = NodeStatus::Failed;
        }
        Frontier::Failed
    }

    async fn finish(&mut self, timed_out: bool, deadline: Option<Instant>) -> Result<SearchOutcome> {
        let Some(winner) = select_winner(&self.tree) else {
            self.state = SearchState::Failed;
            warn!("root produced no branches");
            return Err(Error::TotalExhaustion("root produced no branches".to_string()));
        };
        self.state = if timed_out { SearchState::TimedOut } else { SearchState::Completed };

        let branches: Vec<BranchRecord> =
            self.tree.nodes().filter(|n| !n.is_root()).map(BranchRecord::from_node).collect();
        let selected_branch_index = branch_index(winner).unwrap_or_default();
        let summary = SelectionSummary::from_branches(&branches, selected_branch_index);

        let fallback = || default_rationale(selected_branch_index, summary.selected_score, summary.selected_visits);
        // Past the deadline no further call is made.
        let rationale = if timed_out {
            fallback()
        } else {
            let explained = explain(
                self.service.as_ref(),
                &self.tree.root().conversation,
                &summary,
                self.config.goal(),
                self.config.max_tokens,
                &self.policy,
            );
            match deadline {
                Some(d) => match tokio::time::timeout_at(d, explained).await {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("time budget ran out during rationale, using template");
                        fallback()
                    }
                },
                None => explained.await,
            }
        };

        Ok(SearchOutcome {
            selected_response: summary.selected_response.clone(),
            selected_branch_index,
            rationale,
            mcts_statistics: SearchStatistics::collect(&self.tree, &self.counters, timed_out),
            state: self.state,
            iterations: self.log.clone(),
            branches,
        })
    }
}

/// Wait for every task, or give up at the deadline
async fn join_batch(tasks: &mut JoinSet<(NodeId, NodeEvaluation)>, deadline: Option<Instant>) -> Option<Batch> {
    let drain = async {
        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => warn!(error = %err, "evaluation task failed"),
            }
        }
        results
    };
    match deadline {
        Some(d) => tokio::time::timeout_at(d, drain).await.ok(),
        None => Some(drain.await),
    }
}

/// Ordering of root children, best first
fn rank(a: &Node, b: &Node) -> Ordering {
    b.avg_score()
        .total_cmp(&a.avg_score())
        .then_with(|| b.stats.visits.cmp(&a.stats.visits))
        .then_with(|| a.rollout_variance().total_cmp(&b.rollout_variance()))
        .then_with(|| a.order().cmp(&b.order()))
}

/// Best child of the root
///
/// Higher average wins, then more visits, then lower rollout variance,
/// then earlier creation. Active children are preferred; if every child
/// was pruned or failed they are ranked all the same. `None` when the root
/// has no children.
#[must_use]
pub fn select_winner(tree: &SearchTree) -> Option<NodeId> {
    let children = tree.children(tree.root_id());
    let active: Vec<&Node> = children.iter().copied().filter(|n| n.status.is_active()).collect();
    let pool = if active.is_empty() { children } else { active };
    pool.into_iter().min_by(|a, b| rank(a, b)).map(|n| n.id)
}
