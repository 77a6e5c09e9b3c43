//! End-to-end analysis of a stored conversation.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationService;
use crate::persistence::{AnalysisRecord, HistoryStore, ResultSink};
use crate::search::MctsSearch;

/// Fetches a history, searches it and stores the resulting record
pub struct AnalysisService {
    generation: Arc<dyn GenerationService>,
    history: Arc<dyn HistoryStore>,
    sink: Arc<dyn ResultSink>,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService").finish_non_exhaustive()
    }
}

impl AnalysisService {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        history: Arc<dyn HistoryStore>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self { generation, history, sink }
    }

    /// Analyze one chat
    ///
    /// Fails with [`Error::NoHistory`] when the chat has no messages, with
    /// [`Error::InvalidConfig`] before any generation call, and with
    /// [`Error::TotalExhaustion`] when no branch could be produced. Nothing
    /// is stored on failure.
    #[instrument(skip(self, config), fields(iterations = config.mcts_iterations))]
    pub async fn analyze(&self, chat_id: &str, config: SearchConfig) -> Result<AnalysisRecord> {
        let history = self.history.fetch_history(chat_id).await?;
        if history.is_empty() {
            return Err(Error::NoHistory(chat_id.to_string()));
        }

        let goal = config.goal().map(str::to_string);
        let mut search = MctsSearch::new(history, config, Arc::clone(&self.generation))?;
        let outcome = search.run().await?;

        let record = AnalysisRecord::new(chat_id, goal, outcome);
        self.sink.store_result(&record).await?;
        info!(
            record_id = %record.id,
            selected = record.outcome.selected_branch_index,
            best_score = record.overall_scores.best_score,
            partial = record.outcome.is_partial(),
            "analysis stored"
        );
        Ok(record)
    }
}
