//! Storage traits

use async_trait::async_trait;

use super::error::Result;
use super::record::AnalysisRecord;
use crate::conversation::Message;

/// Source of conversation histories
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Messages of a chat in order; an unknown chat may return an empty list
    async fn fetch_history(&self, chat_id: &str) -> Result<Vec<Message>>;
}

/// Destination for analysis records
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store_result(&self, record: &AnalysisRecord) -> Result<()>;
}
