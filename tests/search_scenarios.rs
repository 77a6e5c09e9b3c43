//! Integration tests for the conversation search

use colloquy::config::SearchConfig;
use colloquy::generation::stub::ScriptedService;
use colloquy::generation::{Capability, GenerationError, ScoreReport};
use colloquy::search::{MctsSearch, NodeStatus, SearchState, SearchTree};
use colloquy::{Error, Message};
use std::sync::Arc;
use std::time::Duration;

fn history() -> Vec<Message> {
    vec![
        Message::user("My best friend forgot my birthday."),
        Message::assistant("Oh no, that must have stung."),
        Message::user("Yeah. Should I say something?"),
    ]
}

fn config() -> SearchConfig {
    SearchConfig::default()
        .with_branches(2)
        .with_simulation_depth(1)
        .with_reaction_samples(2)
        .with_retries(0)
}

fn mentions(conversation: &[Message], needle: &str) -> bool {
    conversation.iter().any(|m| m.content.contains(needle))
}

fn check_tree(tree: &SearchTree) {
    assert_eq!(tree.root().stats.visits, tree.iterations());
    for node in tree.nodes() {
        for &cid in &node.children {
            let child = tree.get(cid).expect("child should exist");
            assert_eq!(child.parent, Some(node.id));
            assert_eq!(child.depth, node.depth + 1);
        }
        if node.stats.visits > 0 {
            assert!((0.0..=1.0).contains(&node.avg_score()));
        }
    }
}

#[tokio::test]
async fn test_best_branch_selected_after_one_iteration() {
    let service = ScriptedService::new().with_scores(|conversation| {
        let score = if mentions(conversation, "Candidate response 1") { 0.9 } else { 0.3 };
        Ok(ScoreReport::uniform(score))
    });
    let mut search = MctsSearch::new(history(), config().with_iterations(1), Arc::new(service))
        .expect("config should be valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.selected_branch_index, 0);
    assert_eq!(outcome.mcts_statistics.total_iterations, 1);
    assert!((outcome.branches[0].score - 0.9).abs() < 1e-12);
    assert!((outcome.branches[1].score - 0.3).abs() < 1e-12);
    check_tree(search.tree());
}

#[tokio::test]
async fn test_failed_slots_leave_fewer_branches() {
    let service = ScriptedService::new().with_branches(|_, existing| {
        if existing.is_empty() {
            Ok("Tell them how it made you feel.".to_string())
        } else {
            Err(GenerationError::Transport("timeout".into()))
        }
    });
    let mut search = MctsSearch::new(history(), config().with_iterations(10), Arc::new(service))
        .expect("config should be valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.branches.len(), 1);
    assert_eq!(outcome.selected_response, "Tell them how it made you feel.");
    assert_eq!(outcome.state, SearchState::Completed);
    assert_eq!(search.tree().root().status, NodeStatus::Failed);
    check_tree(search.tree());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_mid_expansion_is_partial_not_exhausted() {
    let service = ScriptedService::new().with_latency(Duration::from_secs(1));
    let config = config().with_branches(5).with_time_budget(Duration::from_millis(3500));
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config should be valid");
    let outcome = search.run().await.expect("a timeout still yields an outcome");

    assert_eq!(outcome.state, SearchState::TimedOut);
    assert!(outcome.mcts_statistics.partial);
    assert_eq!(outcome.branches.len(), 3);
    assert!(outcome.selected_response.starts_with("Candidate response 1"));
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_marks_outcome_partial() {
    let service = Arc::new(ScriptedService::new().with_latency(Duration::from_millis(500)));
    let config = config().with_iterations(50).with_time_budget(Duration::from_secs(8));
    let mut search = MctsSearch::new(history(), config, service.clone()).expect("config should be valid");
    let outcome = search.run().await.expect("search should succeed");

    assert_eq!(outcome.state, SearchState::TimedOut);
    assert!(outcome.mcts_statistics.partial);
    assert!(outcome.mcts_statistics.total_iterations < 50);
    assert_eq!(service.calls(Capability::Explain), 0);
    assert_eq!(search.tree().root().stats.visits, search.tree().iterations());
}

#[tokio::test]
async fn test_trailing_branch_is_pruned_and_left_alone() {
    let service = ScriptedService::new()
        .with_branches(|conversation, existing| {
            if conversation.len() == 3 {
                Ok(["Gently tell them", "Give them the cold shoulder"][existing.len() % 2].to_string())
            } else {
                Ok(format!("follow-up {} {}", conversation.len(), existing.len() + 1))
            }
        })
        .with_scores(|conversation| Ok(ScoreReport::uniform(if mentions(conversation, "cold") { 0.2 } else { 0.9 })));
    let config = config().with_exploration(3.0).with_pruning(1, 0.2).with_iterations(6);
    let mut search = MctsSearch::new(history(), config, Arc::new(service)).expect("config should be valid");
    let outcome = search.run().await.expect("search should succeed");

    let cold = 1;
    assert_eq!(outcome.branches[cold].status, NodeStatus::Pruned);
    let pruned_at = outcome
        .iterations
        .iter()
        .find(|r| r.pruned.contains(&cold))
        .map(|r| r.iteration)
        .expect("cold branch should be pruned");
    assert!(outcome
        .iterations
        .iter()
        .filter(|r| r.iteration > pruned_at)
        .all(|r| r.frontier != Some(cold) && !r.batch.iter().any(|b| outcome.branches[*b].parent_index == Some(cold))));
    assert_eq!(outcome.selected_response, "Gently tell them");
    check_tree(search.tree());
}

#[tokio::test]
async fn test_root_without_branches_is_exhaustion() {
    let service = ScriptedService::new().with_branches(|_, _| Ok("   ".to_string()));
    let mut search = MctsSearch::new(history(), config(), Arc::new(service)).expect("config should be valid");
    let err = search.run().await.unwrap_err();
    assert!(matches!(err, Error::TotalExhaustion(_)));
}

#[tokio::test]
async fn test_identical_inputs_identical_outcomes() {
    async fn run() -> colloquy::SearchOutcome {
        let service = ScriptedService::new()
            .with_scores(|conversation| Ok(ScoreReport::uniform((conversation.len() % 3) as f64 / 3.0)));
        let mut search = MctsSearch::new(history(), config().with_iterations(5), Arc::new(service))
            .expect("config should be valid");
        search.run().await.expect("search should succeed")
    }
    assert_eq!(run().await, run().await);
}

#[tokio::test]
async fn test_outcome_serializes_with_statistics() {
    let mut search = MctsSearch::new(history(), config().with_iterations(2), Arc::new(ScriptedService::new()))
        .expect("config should be valid");
    let outcome = search.run().await.expect("search should succeed");

    let json = serde_json::to_value(&outcome).expect("serialization should succeed");
    for key in ["branches", "selected_branch_index", "selected_response", "rationale", "mcts_statistics"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    let stats = &json["mcts_statistics"];
    for key in [
        "total_iterations",
        "nodes_created",
        "nodes_evaluated",
        "pruned_branches",
        "parallel_evaluations",
        "average_depth_explored",
        "partial",
    ] {
        assert!(stats.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["state"], "completed");
}
