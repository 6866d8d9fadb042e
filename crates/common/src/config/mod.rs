//! Configuration management for CaseForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector store configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Generation provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval policy
    #[serde(default)]
    pub rag: RagConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Input is cut to this many characters before submission
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Vector store provider: pinecone
    #[serde(default = "default_vector_provider")]
    pub provider: String,

    /// API key for the vector store
    pub api_key: Option<String>,

    /// Index holding the case-study vectors
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Data plane host; resolved through the control plane when absent
    pub index_host: Option<String>,

    /// Control plane base URL
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    /// Optional namespace inside the index
    pub namespace: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key for the chat completion endpoint
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Output bound for answers
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for answers
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Output bound for auxiliary extraction
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,

    /// Sampling temperature for auxiliary extraction
    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

/// Retrieval and relevance policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Candidates must score strictly above this to pass the primary filter
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Candidates kept when nothing clears the threshold
    #[serde(default = "default_fallback_count")]
    pub fallback_count: usize,

    /// top_k used when the caller does not pick one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound accepted from callers
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Longest accepted query, in characters
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    /// Company named in the system instruction
    #[serde(default = "default_company_name")]
    pub company_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_max_input_chars() -> usize { 8000 }
fn default_upstream_timeout() -> u64 { 30 }
fn default_vector_provider() -> String { "pinecone".to_string() }
fn default_index_name() -> String { "eora-cases".to_string() }
fn default_control_plane_url() -> String { "https://api.pinecone.io".to_string() }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_llm_max_tokens() -> u32 { 1000 }
fn default_llm_temperature() -> f32 { 0.7 }
fn default_extraction_max_tokens() -> u32 { 100 }
fn default_extraction_temperature() -> f32 { 0.3 }
fn default_relevance_threshold() -> f32 { 0.35 }
fn default_fallback_count() -> usize { 2 }
fn default_top_k() -> usize { 3 }
fn default_max_top_k() -> usize { 20 }
fn default_max_query_chars() -> usize { 1000 }
fn default_company_name() -> String { "EORA".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "caseforge".to_string() }
fn default_rate_limit() -> u32 { 10 }
fn default_burst() -> u32 { 20 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RAG__RELEVANCE_THRESHOLD=0.4
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_provider(),
            api_key: None,
            index_name: default_index_name(),
            index_host: None,
            control_plane_url: default_control_plane_url(),
            namespace: None,
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            extraction_max_tokens: default_extraction_max_tokens(),
            extraction_temperature: default_extraction_temperature(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            fallback_count: default_fallback_count(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            max_query_chars: default_max_query_chars(),
            company_name: default_company_name(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}
