//! Pinecone REST client
//!
//! Index host resolution happens once at construction; a missing index is a
//! startup failure, not a per-request one.

use super::{Candidate, IndexStats, MetadataFilter, VectorSearch};
use crate::config::VectorStoreConfig;
use crate::embeddings::EmbeddingVector;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2024-07";

/// Vector store client for a single Pinecone index
pub struct PineconeClient {
    client: reqwest::Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl PineconeClient {
    /// Connect to the configured index, resolving its data plane host
    pub async fn connect(config: &VectorStoreConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "vector_store.api_key is required".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| not_initialized(format!("Failed to create HTTP client: {}", e)))?;

        let host = match &config.index_host {
            Some(host) => normalize_host(host),
            None => resolve_host(&client, &api_key, config).await?,
        };

        tracing::info!(index = %config.index_name, host = %host, "Connected to vector index");

        Ok(Self {
            client,
            api_key,
            host,
            namespace: config.namespace.clone(),
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

async fn resolve_host(
    client: &reqwest::Client,
    api_key: &str,
    config: &VectorStoreConfig,
) -> Result<String> {
    let url = format!(
        "{}/indexes/{}",
        config.control_plane_url.trim_end_matches('/'),
        config.index_name
    );

    let response = client
        .get(&url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await
        .map_err(|e| not_initialized(format!("Control plane unreachable: {}", e)))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(not_initialized(format!("Index {} not found", config.index_name)));
    }
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(not_initialized(format!("Describe index failed {}: {}", status, body)));
    }

    let described: DescribeIndexResponse = response
        .json()
        .await
        .map_err(|e| not_initialized(format!("Failed to parse index description: {}", e)))?;

    Ok(normalize_host(&described.host))
}

fn not_initialized(message: String) -> AppError {
    AppError::ServiceNotInitialized {
        service: "vector_store".to_string(),
        message,
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn unavailable(message: String) -> AppError {
    AppError::SearchUnavailable { message }
}

#[async_trait]
impl VectorSearch for PineconeClient {
    async fn search(
        &self,
        vector: &EmbeddingVector,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        let body = QueryRequest {
            vector: vector.as_slice(),
            top_k,
            include_metadata: true,
            include_values: false,
            filter: filter.and_then(MetadataFilter::to_store_filter),
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .request("query")
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("Query request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("Query error {}: {}", status, body)));
        }

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse query response: {}", e)))?;

        tracing::debug!(top_k, matches = result.matches.len(), "Vector query completed");
        Ok(result.matches)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response = self
            .request("describe_index_stats")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| unavailable(format!("Stats request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("Stats error {}", response.status())));
        }

        let stats: StatsResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse stats: {}", e)))?;

        Ok(IndexStats {
            total_vectors: stats.total_vector_count,
            dimension: stats.dimension,
        })
    }
}
