//! CLI command handlers module
//!
//! - serve: API server
//! - index: Venue ingestion
//! - query: Search and question answering
//! - info: Status and configuration display

pub mod index;
pub mod info;
pub mod query;
pub mod serve;

pub use index::*;
pub use info::*;
pub use query::*;
pub use serve::*;
