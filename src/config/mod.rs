//! Configuration module for the minipack build
//!
//! Provides types and parsing for `minipack.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
