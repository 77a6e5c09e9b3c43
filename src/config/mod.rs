//! Search configuration: schema, YAML loading, and validation.
//!
//! A single immutable [`SearchConfig`] is built once per search and passed
//! explicitly to every component. Nothing reads configuration from ambient
//! state once the search has started.

mod loader;
mod search;
mod validate;

pub use loader::{load_config, parse_config};
pub use search::SearchConfig;
pub use validate::{validate_config, ValidationError};
