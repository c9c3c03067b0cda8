pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod districts;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod recommend;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::AppConfig;
pub use errors::*;
