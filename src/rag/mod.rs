//! RAG (Retrieval-Augmented Generation) module
//!
//! End-to-end question answering over the venue index:
//! - Query classification and filter extraction
//! - Semantic retrieval with district/type/price filters
//! - Context assembly from retrieved venues
//! - LLM-based answer generation, with a search-only fallback
//!
//! # Examples
//!
//! ```rust,no_run
//! use topgo_rag::config::AppConfig;
//! use topgo_rag::rag::AnswerRequest;
//! use topgo_rag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config).await?;
//!
//!     let response = service.answer(AnswerRequest::new("quán lẩu ngon ở Cầu Giấy")).await?;
//!     println!("Answer: {}", response.answer);
//!     println!("Sources: {} venues", response.num_sources);
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pipeline;
pub mod postprocess;
pub mod query_analysis;
pub mod retriever;

pub use context::ContextAssembler;
pub use pipeline::AnswerMode;
pub use pipeline::AnswerRequest;
pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use query_analysis::Classification;
pub use query_analysis::QueryAnalyzer;
pub use query_analysis::ResponseType;
pub use retriever::VenueRetriever;
