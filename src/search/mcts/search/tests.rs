//! Tests for the MCTS search controller.

#![cfg(test)]

use super::*;
use crate::config::SearchConfig;
use crate::conversation::Message;
use crate::error::Error;
use crate::generation::stub::ScriptedService;
use crate::generation::{Capability, GenerationError, GenerationService, ScoreReport};
use crate::search::mcts::node::{NodeId, NodeStatus};
use crate::search::mcts::tree::SearchTree;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn history() -> Vec<Message> {
    vec![Message::user("I think I bombed my job interview today.")]
}

fn quick_config() -> SearchConfig {
    SearchConfig::default()
        .with_branches(2)
        .with_simulation_depth(1)
        .with_reaction_samples(2)
        .with_retries(0)
}

fn mentions(conversation: &[Message], needle: &str) -> bool {
    conversation.iter().any(|m| m.content.contains(needle))
}

/// Checks the structural invariants every finished tree must hold
fn assert_tree_invariants(tree: &SearchTree) {
    let roots = tree.nodes().filter(|n| n.parent.is_none()).count();
    assert_eq!(roots, 1);
    assert_eq!(tree.root().stats.visits, tree.iterations());

    for node in tree.nodes() {
        if node.stats.visits > 0 {
            let avg = node.avg_score();
            assert!((0.0..=1.0).contains(&avg), "avg {avg} out of range");
        }
        let mut seen = node.children.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), node.children.len());
        for &cid in &node.children {
            let child = tree.get(cid).expect("child should exist");
            assert_eq!(child.parent, Some(node.id));
            assert_eq!(child.depth, node.depth + 1);
        }
    }
}

#[tokio::test]
async fn test_single_iteration_picks_best_scoring_branch() {
    let service = ScriptedService::new().with_scores(|conversation| {
        Ok(ScoreReport::uniform(if mentions(conversation, "Candidate response 1") { 0.9 } else { 0.3 }))
    });
    let config = quick_config().with_iterations(1);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.state, SearchState::Completed);
    assert_eq!(outcome.selected_branch_index, 0);
    assert_eq!(outcome.branches.len(), 2);
    assert!(outcome.selected_response.starts_with("Candidate response 1"));
    assert_eq!(outcome.mcts_statistics.total_iterations, 1);
    assert_eq!(outcome.mcts_statistics.nodes_created, 2);
    assert_eq!(outcome.mcts_statistics.nodes_evaluated, 2);
    assert_eq!(outcome.mcts_statistics.parallel_evaluations, 2);
    assert!(!outcome.mcts_statistics.partial);
    assert!((outcome.branches[0].score - 0.9).abs() < 1e-12);
    assert!(outcome.rationale.starts_with("Selected response 1"));
    assert_eq!(search.state(), SearchState::Completed);
}

#[tokio::test]
async fn test_partial_expansion_keeps_surviving_branch() {
    let service = ScriptedService::new().with_branches(|_, existing| {
        if existing.is_empty() {
            Ok("Want to talk through the questions?".to_string())
        } else {
            Err(GenerationError::Transport("connection reset".into()))
        }
    });
    let config = quick_config().with_iterations(1);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.branches.len(), 1);
    assert_eq!(outcome.selected_branch_index, 0);
    assert_eq!(outcome.branches[0].visits, 1);
}

#[tokio::test]
async fn test_failed_slot_is_retried_then_root_fails() {
    let service = Arc::new(ScriptedService::new().with_branches(|_, existing| {
        if existing.is_empty() {
            Ok("Want to talk through the questions?".to_string())
        } else {
            Err(GenerationError::Transport("connection reset".into()))
        }
    }));
    let config = quick_config().with_iterations(10);
    let mut search = MctsSearch::new(history(), config, service.clone()).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.branches.len(), 1);
    assert_eq!(outcome.branches[0].parent_index, None);
    assert_eq!(outcome.state, SearchState::Completed);
    assert_eq!(outcome.mcts_statistics.total_iterations, 1);
    // Slot two is asked for again on the second iteration before the root gives up.
    assert_eq!(service.calls(Capability::Branch), 3);
    assert_eq!(search.tree().root().status, NodeStatus::Failed);
    assert_tree_invariants(search.tree());
}

#[tokio::test]
async fn test_short_root_is_refilled_before_descending() {
    let attempts = AtomicUsize::new(0);
    let service = ScriptedService::new().with_branches(move |conversation, existing| {
        // The root's second slot fails once, then succeeds.
        let root_second_slot = conversation.len() == 1 && existing.len() == 1;
        if root_second_slot && attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(GenerationError::Transport("flaky".into()));
        }
        Ok(format!("Candidate response {} at turn {}", existing.len() + 1, conversation.len()))
    });
    let config = quick_config().with_iterations(2);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    let second = &outcome.iterations[1];
    assert_eq!(second.frontier, None);
    assert!(second.expanded);
    assert_eq!(second.batch, vec![1]);
    assert_eq!(outcome.top_level().count(), 2);
    assert_eq!(outcome.branches.len(), 2);
    assert_tree_invariants(search.tree());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_root_expansion_keeps_branches() {
    let service = Arc::new(ScriptedService::new().with_latency(Duration::from_secs(1)));
    let config = quick_config().with_branches(5).with_time_budget(Duration::from_millis(3500));
    let mut search = MctsSearch::new(history(), config, service.clone()).expect("config is valid");
    let outcome = search.run().await.expect("timeout is not an error");

    assert_eq!(outcome.state, SearchState::TimedOut);
    assert!(outcome.is_partial());
    assert_eq!(outcome.branches.len(), 3);
    assert!(outcome.branches.iter().all(|b| b.visits == 0));
    assert_eq!(outcome.selected_branch_index, 0);
    assert_eq!(outcome.mcts_statistics.total_iterations, 0);
    assert_eq!(outcome.mcts_statistics.parallel_evaluations, 0);
    assert_eq!(service.calls(Capability::Explain), 0);
    assert_eq!(outcome.rationale, crate::analysis::default_rationale(0, 0.0, 0));
    assert_tree_invariants(search.tree());
}

#[tokio::test(start_paused = true)]
async fn test_rationale_call_is_bounded_by_time_budget() {
    let service = Arc::new(
        ScriptedService::new()
            .with_analysis(|_| Ok("It acknowledges the feeling first.".to_string()))
            .with_capability_latency(Capability::Explain, Duration::from_secs(30)),
    );
    let config = quick_config().with_iterations(1).with_time_budget(Duration::from_secs(10));
    let started = tokio::time::Instant::now();
    let mut search = MctsSearch::new(history(), config, service.clone()).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert!(started.elapsed() < Duration::from_secs(11));
    assert_eq!(outcome.state, SearchState::Completed);
    assert!(!outcome.is_partial());
    assert_eq!(service.calls(Capability::Explain), 1);
    assert!(outcome.rationale.starts_with("Selected response"));
}

#[tokio::test]
async fn test_total_exhaustion_when_root_yields_nothing() {
    let service = ScriptedService::new().with_branches(|_, _| Err(GenerationError::Transport("down".into())));
    let mut search = MctsSearch::new(history(), quick_config(), Arc::new(service)).expect("config is valid");
    let err = search.run().await.unwrap_err();

    assert!(matches!(err, Error::TotalExhaustion(_)));
    assert_eq!(search.state(), SearchState::Failed);
    assert_eq!(search.tree().root().status, NodeStatus::Failed);
}

#[test]
fn test_invalid_config_is_rejected_before_search() {
    let service: Arc<dyn GenerationService> = Arc::new(ScriptedService::new());
    let err = MctsSearch::new(history(), SearchConfig::default().with_branches(0), Arc::clone(&service)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let err = MctsSearch::new(history(), SearchConfig::default().with_exploration(-1.0), service).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_yields_partial_outcome() {
    let service = Arc::new(ScriptedService::new().with_latency(Duration::from_secs(1)));
    let config = quick_config()
        .with_reaction_samples(1)
        .with_iterations(10)
        .with_time_budget(Duration::from_secs(10));
    let mut search = MctsSearch::new(history(), config, service.clone()).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.state, SearchState::TimedOut);
    assert!(outcome.is_partial());
    assert!(outcome.mcts_statistics.total_iterations < 10);
    assert_eq!(outcome.mcts_statistics.total_iterations, 1);
    // The discarded second batch still counts as launched.
    assert_eq!(outcome.mcts_statistics.parallel_evaluations, 4);
    assert_eq!(outcome.mcts_statistics.nodes_evaluated, 2);
    assert_eq!(search.tree().root().stats.visits, 1);
    assert_eq!(service.calls(Capability::Explain), 0);
    assert!(outcome.rationale.starts_with("Selected response"));
}

#[tokio::test]
async fn test_exhausted_tree_completes_early() {
    let service = ScriptedService::new().with_branches(|conversation, _| {
        if conversation.len() == 1 {
            Ok("Interviews are rarely as bad as they feel.".to_string())
        } else {
            Err(GenerationError::Status { status: 400, body: "bad request".into() })
        }
    });
    let config = quick_config().with_branches(1).with_iterations(8);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.state, SearchState::Completed);
    assert_eq!(outcome.mcts_statistics.total_iterations, 2);
    assert_eq!(outcome.branches[0].status, NodeStatus::Failed);
    assert_eq!(outcome.selected_branch_index, 0);
    assert_tree_invariants(search.tree());
}

#[tokio::test]
async fn test_pruned_branch_is_never_revisited() {
    let service = ScriptedService::new()
        .with_branches(|conversation, existing| {
            if conversation.len() == 1 {
                Ok(["warm reply", "cold reply"][existing.len() % 2].to_string())
            } else {
                Ok(format!("follow-up {} {}", conversation.len(), existing.len() + 1))
            }
        })
        .with_scores(|conversation| Ok(ScoreReport::uniform(if mentions(conversation, "cold") { 0.2 } else { 0.9 })));
    let config = quick_config().with_exploration(3.0).with_pruning(1, 0.2).with_iterations(5);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    let cold = outcome.branches.iter().position(|b| b.response == "cold reply").expect("cold branch exists");
    assert_eq!(outcome.branches[cold].status, NodeStatus::Pruned);

    let pruned_at = outcome
        .iterations
        .iter()
        .find(|r| r.pruned.contains(&cold))
        .map(|r| r.iteration)
        .expect("cold branch pruned");
    assert_eq!(pruned_at, 3);
    for record in outcome.iterations.iter().filter(|r| r.iteration > pruned_at) {
        assert_ne!(record.frontier, Some(cold));
        let path_hits_cold = record.frontier.is_some_and(|f| outcome.branches[f].parent_index == Some(cold));
        assert!(!path_hits_cold);
    }

    assert_eq!(outcome.selected_response, "warm reply");
    assert_eq!(outcome.mcts_statistics.total_iterations, 5);
    assert_eq!(outcome.mcts_statistics.pruned_branches, 1);
    assert_tree_invariants(search.tree());
}

#[tokio::test]
async fn test_search_is_deterministic_with_scripted_service() {
    async fn once() -> SearchOutcome {
        let service = ScriptedService::new().with_scores(|conversation| {
            Ok(ScoreReport::uniform((conversation.len() % 5) as f64 / 5.0).with_goal_metric("reassurance", 0.6))
        });
        let config = quick_config().with_iterations(6).with_goal("help the user feel calmer");
        let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
        search.run().await.expect("search should succeed")
    }

    assert_eq!(once().await, once().await);
}

#[tokio::test]
async fn test_iteration_log_and_branch_links() {
    let config = quick_config().with_iterations(3);
    let mut search = MctsSearch::new(history(), config, Arc::new(ScriptedService::new())).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.iterations.len(), 3);
    let first = &outcome.iterations[0];
    assert_eq!(first.frontier, None);
    assert!(first.expanded);
    assert_eq!(first.batch, vec![0, 1]);

    for (index, branch) in outcome.branches.iter().enumerate() {
        for &child in &branch.children_indices {
            assert_eq!(outcome.branches[child].parent_index, Some(index));
        }
    }
    assert!(outcome.top_level().count() == 2);
    assert!(outcome.mcts_statistics.average_depth_explored >= 1.0);
    assert_tree_invariants(search.tree());
}

#[tokio::test]
async fn test_goal_metrics_exported() {
    let service = ScriptedService::new().with_scores(|_| Ok(ScoreReport::uniform(0.4).with_goal_metric("trust", 1.0)));
    let config = quick_config().with_iterations(1).with_goal("build trust");
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
    let outcome = search.run().await.expect("search should succeed");

    let branch = outcome.selected().expect("winner exists");
    assert!((branch.goal_metrics["trust"] - 1.0).abs() < 1e-12);
    assert!((branch.score - 0.7).abs() < 1e-12);
    assert_eq!(branch.general_metrics.len(), 6);
    assert_eq!(branch.simulated_reactions.len(), 2);
}

#[test]
fn test_select_winner_tiebreaks() {
    let mut tree = SearchTree::new(history());
    let root = tree.root_id();
    let a = tree.add_child(root, "a".into()).expect("parent should exist");
    let b = tree.add_child(root, "b".into()).expect("parent should exist");
    let c = tree.add_child(root, "c".into()).expect("parent should exist");
    assert_eq!(select_winner(&tree), Some(a));

    for (id, rewards, means) in [
        (a, vec![0.6], vec![0.2, 1.0]),
        (b, vec![0.6, 0.6], vec![0.2, 1.0]),
        (c, vec![0.6, 0.6], vec![0.6, 0.6]),
    ] {
        let node = tree.get_mut(id).expect("node should exist");
        for r in rewards {
            node.stats.update(r);
        }
        node.rollout_means = means;
    }
    // Equal averages: more visits first, then lower variance.
    assert_eq!(select_winner(&tree), Some(c));

    if let Some(node) = tree.get_mut(c) {
        node.status = NodeStatus::Pruned;
    }
    assert_eq!(select_winner(&tree), Some(b));
}

#[test]
fn test_select_winner_empty_root() {
    let tree = SearchTree::new(history());
    assert_eq!(select_winner(&tree), None);
    assert_eq!(branch_index(NodeId::new(0)), None);
    assert_eq!(branch_index(NodeId::new(3)), Some(2));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_search_invariants_hold(branches in 1usize..4, iterations in 1usize..7, salt in 0usize..5) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime should build");

        let service = ScriptedService::new().with_scores(move |conversation| {
            let len: usize = conversation.iter().map(|m| m.content.len()).sum();
            Ok(ScoreReport::uniform(((len + salt) % 11) as f64 / 10.0))
        });
        let config = quick_config().with_branches(branches).with_iterations(iterations).with_pruning(2, 0.1);
        let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config is valid");
        let outcome = runtime.block_on(search.run()).expect("search should succeed");

        prop_assert_eq!(outcome.mcts_statistics.total_iterations, search.tree().iterations());
        prop_assert!(search.tree().iterations() <= iterations);
        prop_assert!(outcome.branches[outcome.selected_branch_index].is_top_level());
        assert_tree_invariants(search.tree());
    }
}
