#![deny(unsafe_code, rust_2018_idioms)]

//! This crate contains fixtures and in-memory collaborators that are useful for writing tests
//! across the sourcing engine crates.

/// Introspection fixture builders.
pub mod fixtures;
/// Tokio test runtime utils.
pub mod runtime;

mod host;
mod logging;
mod mock_api;

pub use fixtures::blog_schema;
pub use host::{InMemoryCursor, InMemoryFiles, InMemoryNodeStore, MutationCounts, RecordingReporter, TestHost};
pub use logging::init_logger;
pub use mock_api::MockApi;
