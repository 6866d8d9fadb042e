//! CaseForge Common Library
//!
//! Retrieval-augmented answering over a portfolio of company case studies:
//! - Configuration management
//! - Embedding client abstraction
//! - Vector similarity search
//! - Relevance filtering, context formatting and answer synthesis
//! - Error types and handling
//! - Metrics and observability
//! - Chat-transport rendering helpers

pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod render;
pub mod search;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{extract_links, ComplexityTier, RagAnswer, RagOrchestrator, SourceLink};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use search::{Candidate, VectorSearch};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
