//! Chat handler - one question in, one grounded answer out

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use caseforge_common::{
    context::{ComplexityTier, SourceLink},
    errors::{AppError, Result},
    metrics,
    render::{markdown_to_chat_html, split_message, CHAT_MESSAGE_LIMIT},
};

/// How the answer text is returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Generated markdown as is
    #[default]
    Markdown,
    /// HTML subset for messaging platforms, split into sendable messages
    ChatHtml,
}

/// Chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    pub message: String,

    /// simple, medium or hard; medium when absent
    #[serde(default)]
    pub complexity_level: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,

    /// Candidates to retrieve; the configured default when absent
    #[serde(default)]
    #[validate(range(min = 1))]
    pub top_k: Option<usize>,

    #[serde(default)]
    pub format: ResponseFormat,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub complexity_level: ComplexityTier,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceLink>,
    /// `response` split at the chat platform's size cap; chat_html only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    /// Seconds
    pub processing_time: f64,
}

/// Answer a question about the portfolio
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let timer = metrics::RequestMetrics::start("POST", "/v1/chat");

    let result = answer(&state, request).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    timer.finish(status);

    result.map(Json)
}

async fn answer(state: &AppState, request: ChatRequest) -> Result<ChatResponse> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let tier = match request.complexity_level.as_deref() {
        Some(level) => level.parse::<ComplexityTier>()?,
        None => ComplexityTier::default(),
    };
    let top_k = request.top_k.unwrap_or(state.orchestrator.config().default_top_k);

    tracing::info!(
        user_id = request.user_id.as_deref().unwrap_or("anonymous"),
        tier = tier.as_str(),
        top_k,
        "Chat request"
    );

    let answer = state.orchestrator.process(&request.message, tier, top_k).await?;

    let sources = answer.sources();
    let (response, messages) = match request.format {
        ResponseFormat::Markdown => (answer.text, Vec::new()),
        ResponseFormat::ChatHtml => {
            let html = markdown_to_chat_html(&answer.text);
            let messages = split_message(&html, CHAT_MESSAGE_LIMIT);
            (html, messages)
        }
    };

    Ok(ChatResponse {
        sources,
        messages,
        response,
        complexity_level: answer.tier,
        processing_time: answer.processing_time.as_secs_f64(),
    })
}
