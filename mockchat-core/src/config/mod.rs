//! Configuration management
//!
//! Handles loading and validation of mockchat configuration from
//! `config.json` and `MOCKCHAT__*` environment variables.

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::ConfigLoader;
pub use schema::*;
