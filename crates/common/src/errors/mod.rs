//! Error types for CaseForge services
//!
//! Provides a single error type threaded through every pipeline stage:
//! - Typed failure reasons per stage (embed, search, generate)
//! - HTTP status code mapping for transports
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    EmptyInput,

    // Rate limiting (6xxx)
    RateLimited,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingFailure,
    SearchUnavailable,
    GenerationFailure,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceNotInitialized,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::EmptyInput => 1002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingFailure => 8002,
            ErrorCode::SearchUnavailable => 8003,
            ErrorCode::GenerationFailure => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceNotInitialized => 9999,
        }
    }
}

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Embed,
    Search,
    Generate,
    Startup,
    Transport,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Embed => "embed",
            Stage::Search => "search",
            Stage::Generate => "generate",
            Stage::Startup => "startup",
            Stage::Transport => "transport",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Query is empty")]
    EmptyInput,

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Pipeline stage failures
    #[error("Embedding failed: {message}")]
    EmbeddingFailure { message: String },

    #[error("Vector search unavailable: {message}")]
    SearchUnavailable { message: String },

    #[error("Answer generation failed: {message}")]
    GenerationFailure { message: String },

    #[error("Service not initialized: {service}: {message}")]
    ServiceNotInitialized { service: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::EmptyInput => ErrorCode::EmptyInput,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::EmbeddingFailure { .. } => ErrorCode::EmbeddingFailure,
            AppError::SearchUnavailable { .. } => ErrorCode::SearchUnavailable,
            AppError::GenerationFailure { .. } => ErrorCode::GenerationFailure,
            AppError::ServiceNotInitialized { .. } => ErrorCode::ServiceNotInitialized,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Pipeline stage this error belongs to, used as log context
    pub fn stage(&self) -> Stage {
        match self {
            AppError::EmptyInput | AppError::Validation { .. } => Stage::Input,
            AppError::EmbeddingFailure { .. } => Stage::Embed,
            AppError::SearchUnavailable { .. } => Stage::Search,
            AppError::GenerationFailure { .. } => Stage::Generate,
            AppError::ServiceNotInitialized { .. } | AppError::Configuration { .. } => Stage::Startup,
            AppError::RateLimited { .. } | AppError::HttpClient(_) => Stage::Transport,
            AppError::Internal { .. } | AppError::Serialization(_) | AppError::Other(_) => {
                Stage::Transport
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::EmptyInput |
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingFailure { .. } |
            AppError::GenerationFailure { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::SearchUnavailable { .. } |
            AppError::ServiceNotInitialized { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                stage = self.stage().as_str(),
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                stage = self.stage().as_str(),
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
