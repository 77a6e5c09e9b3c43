//! History sources and result sinks.
//!
//! The search reads a conversation history and writes one analysis record
//! per run. Both sides are async traits so the analysis service can sit in
//! front of any store.
//!
//! # Example
//!
//! ```ignore
//! use colloquy::persistence::{HistoryStore, InMemoryStore};
//!
//! let store = InMemoryStore::new().with_history("chat-7", history);
//! let messages = store.fetch_history("chat-7").await?;
//! ```

mod error;
mod json_dir;
mod memory;
mod record;
mod traits;

pub use error::{Result, StorageError};
pub use json_dir::JsonDirStore;
pub use memory::InMemoryStore;
pub use record::{AnalysisRecord, OverallScores};
pub use traits::{HistoryStore, ResultSink};
