//! Deterministic in-process generation service.
//!
//! `ScriptedService` answers every capability from plain closures over the
//! request, so the same inputs always yield the same outputs. It backs the
//! test suites and lets the search run without a model endpoint.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{Capability, GenerationError, GenerationService, Result, ScoreReport};
use crate::analysis::SelectionSummary;
use crate::conversation::Message;

type BranchFn = dyn Fn(&[Message], &[String]) -> Result<String> + Send + Sync;
type TurnFn = dyn Fn(&[Message]) -> Result<String> + Send + Sync;
type ScoreFn = dyn Fn(&[Message]) -> Result<ScoreReport> + Send + Sync;
type AnalysisFn = dyn Fn(&SelectionSummary) -> Result<String> + Send + Sync;

/// Scripted [`GenerationService`] with per-capability call counters
pub struct ScriptedService {
    branches: Arc<BranchFn>,
    reactions: Arc<TurnFn>,
    continuations: Arc<TurnFn>,
    scores: Arc<ScoreFn>,
    analysis: Option<Arc<AnalysisFn>>,
    latency: Duration,
    capability_latency: BTreeMap<Capability, Duration>,
    calls: Mutex<BTreeMap<Capability, usize>>,
}

impl ScriptedService {
    /// Service with distinct numbered branches, fixed turns and uniform 0.5 scores
    pub fn new() -> Self {
        Self {
            branches: Arc::new(|conversation, existing| {
                Ok(format!("Candidate response {} at turn {}", existing.len() + 1, conversation.len()))
            }),
            reactions: Arc::new(|_| Ok("That makes sense, thank you.".to_string())),
            continuations: Arc::new(|_| Ok("I'm glad that helps. What would you like to do next?".to_string())),
            scores: Arc::new(|_| Ok(ScoreReport::uniform(0.5))),
            analysis: None,
            latency: Duration::ZERO,
            capability_latency: BTreeMap::new(),
            calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// Script `generate_branch` from the conversation and the sibling texts so far
    pub fn with_branches<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Message], &[String]) -> Result<String> + Send + Sync + 'static,
    {
        self.branches = Arc::new(f);
        self
    }

    /// Script `generate_reaction`
    pub fn with_reactions<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String> + Send + Sync + 'static,
    {
        self.reactions = Arc::new(f);
        self
    }

    /// Script `generate_continuation`
    pub fn with_continuations<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String> + Send + Sync + 'static,
    {
        self.continuations = Arc::new(f);
        self
    }

    /// Script `score` from the simulated conversation
    pub fn with_scores<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Message]) -> Result<ScoreReport> + Send + Sync + 'static,
    {
        self.scores = Arc::new(f);
        self
    }

    /// Script `explain_selection`; without it the call is unsupported
    pub fn with_analysis<F>(mut self, f: F) -> Self
    where
        F: Fn(&SelectionSummary) -> Result<String> + Send + Sync + 'static,
    {
        self.analysis = Some(Arc::new(f));
        self
    }

    /// Sleep this long before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sleep this long before answering calls for one capability
    pub fn with_capability_latency(mut self, capability: Capability, latency: Duration) -> Self {
        self.capability_latency.insert(capability, latency);
        self
    }

    /// Number of calls received for a capability, including failed ones
    pub fn calls(&self, capability: Capability) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.get(&capability).copied().unwrap_or(0)
    }

    /// Total calls received across all capabilities
    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.values().sum()
    }

    async fn enter(&self, capability: Capability) {
        {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            *calls.entry(capability).or_insert(0) += 1;
        }
        let latency = self.capability_latency.get(&capability).copied().unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedService")
            .field("latency", &self.latency)
            .field("scripted_analysis", &self.analysis.is_some())
            .finish()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate_branch(
        &self,
        conversation: &[Message],
        existing_responses: &[String],
        _goal: Option<&str>,
        _max_tokens: u32,
    ) -> Result<String> {
        self.enter(Capability::Branch).await;
        (self.branches)(conversation, existing_responses)
    }

    async fn generate_reaction(&self, conversation: &[Message], _goal: Option<&str>) -> Result<String> {
        self.enter(Capability::Reaction).await;
        (self.reactions)(conversation)
    }

    async fn generate_continuation(&self, conversation: &[Message], _max_tokens: u32) -> Result<String> {
        self.enter(Capability::Continuation).await;
        (self.continuations)(conversation)
    }

    async fn score(&self, conversation: &[Message], _goal: Option<&str>) -> Result<ScoreReport> {
        self.enter(Capability::Score).await;
        (self.scores)(conversation)
    }

    async fn explain_selection(
        &self,
        _conversation: &[Message],
        summary: &SelectionSummary,
        _goal: Option<&str>,
        _max_tokens: u32,
    ) -> Result<String> {
        self.enter(Capability::Explain).await;
        match &self.analysis {
            Some(f) => f(summary),
            None => Err(GenerationError::Unsupported("explain_selection")),
        }
    }
}
