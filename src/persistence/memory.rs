//! In-memory store implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::error::Result;
use super::record::AnalysisRecord;
use super::traits::{HistoryStore, ResultSink};
use crate::conversation::Message;

/// In-memory history source and result sink
#[derive(Debug, Default)]
pub struct InMemoryStore {
    histories: Mutex<HashMap<String, Vec<Message>>>,
    results: Mutex<Vec<AnalysisRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a chat history
    pub fn with_history(self, chat_id: impl Into<String>, messages: Vec<Message>) -> Self {
        self.insert_history(chat_id, messages);
        self
    }

    pub fn insert_history(&self, chat_id: impl Into<String>, messages: Vec<Message>) {
        let mut histories = self.histories.lock().unwrap_or_else(PoisonError::into_inner);
        histories.insert(chat_id.into(), messages);
    }

    /// Records stored so far, oldest first
    pub fn results(&self) -> Vec<AnalysisRecord> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn fetch_history(&self, chat_id: &str) -> Result<Vec<Message>> {
        let histories = self.histories.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(histories.get(chat_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ResultSink for InMemoryStore {
    async fn store_result(&self, record: &AnalysisRecord) -> Result<()> {
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results.push(record.clone());
        Ok(())
    }
}
