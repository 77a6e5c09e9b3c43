//! Configuration validation
//!
//! Rejects configurations that would make the search meaningless before any
//! external call is made.

mod error;
mod validator;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;

pub use error::ValidationError;
pub use validator::validate_config;
