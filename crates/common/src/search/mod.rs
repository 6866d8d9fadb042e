//! Similarity search over the case-study index
//!
//! The index itself lives in an external vector store; this module only
//! speaks its query contract. Results come back score-descending and are
//! passed on untouched: no caching, no retry.

mod pinecone;

pub use pinecone::PineconeClient;

use crate::config::VectorStoreConfig;
use crate::embeddings::EmbeddingVector;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Descriptive fields stored next to each case-study vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub client: String,

    /// Ordered technology list. The ingestion side stores it comma-joined.
    #[serde(default, deserialize_with = "technologies_from_any")]
    pub technologies: Vec<String>,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub category: String,
}

/// A ranked search hit. Immutable once returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,

    /// Cosine similarity in [-1, 1]
    pub score: f32,

    #[serde(default)]
    pub metadata: CaseMetadata,
}

/// Equality filter on metadata fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub category: Option<String>,
    pub client: Option<String>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.client.is_none()
    }

    /// Render in the store's `{"field": {"$eq": value}}` syntax
    pub fn to_store_filter(&self) -> Option<serde_json::Value> {
        if self.is_empty() {
            return None;
        }

        let mut filter = serde_json::Map::new();
        if let Some(category) = &self.category {
            filter.insert("category".to_string(), serde_json::json!({ "$eq": category }));
        }
        if let Some(client) = &self.client {
            filter.insert("client".to_string(), serde_json::json!({ "$eq": client }));
        }
        Some(serde_json::Value::Object(filter))
    }
}

/// Index statistics used by readiness probes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub dimension: usize,
}

/// Query contract of the external vector store
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return up to `top_k` candidates, highest score first
    async fn search(
        &self,
        vector: &EmbeddingVector,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>>;

    /// Cheap liveness probe of the index
    async fn stats(&self) -> Result<IndexStats>;
}

/// Create a vector search client based on configuration
pub async fn create_vector_search(config: &VectorStoreConfig) -> Result<Arc<dyn VectorSearch>> {
    match config.provider.as_str() {
        "pinecone" => Ok(Arc::new(PineconeClient::connect(config).await?)),
        other => Err(AppError::Configuration {
            message: format!("Unknown vector store provider: {}", other),
        }),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Technologies {
    List(Vec<String>),
    Joined(String),
}

fn technologies_from_any<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Technologies>::deserialize(deserializer)?;
    let items = match raw {
        None => Vec::new(),
        Some(Technologies::List(items)) => items,
        Some(Technologies::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(items
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
