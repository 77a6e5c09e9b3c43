//! JSON directory store
//!
//! Histories are read from `<dir>/<chat_id>.json`, a JSON array of
//! `{"role", "content"}` messages. Records are written to
//! `<dir>/<chat_id>.analysis.json`, replacing any earlier one.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{Result, StorageError};
use super::record::AnalysisRecord;
use super::traits::{HistoryStore, ResultSink};
use crate::conversation::Message;

/// File-backed store over one directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self, chat_id: &str) -> PathBuf {
        self.dir.join(format!("{chat_id}.json"))
    }

    pub fn result_path(&self, chat_id: &str) -> PathBuf {
        self.dir.join(format!("{chat_id}.analysis.json"))
    }

    fn check_id(chat_id: &str) -> Result<()> {
        if chat_id.is_empty() || chat_id.contains(['/', '\\']) || chat_id.starts_with('.') {
            return Err(StorageError::NotFound(format!("invalid chat id: {chat_id:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonDirStore {
    async fn fetch_history(&self, chat_id: &str) -> Result<Vec<Message>> {
        Self::check_id(chat_id)?;
        let path = self.history_path(chat_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let messages: Vec<Message> = serde_json::from_str(&raw)?;
        debug!(chat_id, messages = messages.len(), "history loaded");
        Ok(messages)
    }
}

#[async_trait]
impl ResultSink for JsonDirStore {
    async fn store_result(&self, record: &AnalysisRecord) -> Result<()> {
        Self::check_id(&record.chat_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.result_path(&record.chat_id);
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        debug!(path = %path.display(), "analysis stored");
        Ok(())
    }
}
