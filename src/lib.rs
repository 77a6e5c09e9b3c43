//! Colloquy: tree search over conversation continuations.
//!
//! Given a conversation history, colloquy explores candidate next responses
//! with Monte Carlo Tree Search. An external generative service is the only
//! source of content (new branches, simulated reactions, continuations) and
//! of quality signal (metric scores). The search returns the best next
//! response, a rationale, the explored branch list, and search statistics.
//!
//! # Modules
//!
//! - [`search`]: the MCTS core (tree, selector, expander, simulator, scorer,
//!   backpropagation, pruning, controller)
//! - [`generation`]: the generation capability trait, call retry policy,
//!   an OpenAI-compatible client and a scripted stub
//! - [`config`]: `SearchConfig`, YAML loading and validation
//! - [`persistence`]: history sources and result sinks
//! - [`service`]: end-to-end analysis (fetch, search, explain, store)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use colloquy::config::SearchConfig;
//! use colloquy::conversation::Message;
//! use colloquy::generation::stub::ScriptedService;
//! use colloquy::search::MctsSearch;
//!
//! # async fn run() -> colloquy::Result<()> {
//! let history = vec![Message::user("I failed my driving test again.")];
//! let config = SearchConfig::default().with_branches(3).with_iterations(4);
//! let mut search = MctsSearch::new(history, config, Arc::new(ScriptedService::new()))?;
//! let outcome = search.run().await?;
//! println!("{}", outcome.selected_response);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod search;
pub mod service;

pub use config::SearchConfig;
pub use conversation::{Message, Role};
pub use error::{Error, Result};
pub use generation::{GenerationError, GenerationService, ScoreReport};
pub use search::{MctsSearch, SearchOutcome, SearchState};
pub use service::AnalysisService;
