//! LLM Synthesizer - generates grounded answers from formatted context
//!
//! Provides:
//! - Fixed grounding-only system instruction
//! - Per-tier user instruction (source style and verbosity)
//! - Chat-completion client for the generation provider
//! - Short auxiliary extraction used during corpus enrichment

use super::tier::ComplexityTier;
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const EXTRACTION_SYSTEM_PROMPT: &str =
    "You extract and analyse information from text. Answer briefly and precisely.";

const PROBE_SYSTEM_PROMPT: &str = "Reply with the single word: ok.";

/// Generation provider contract
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Complete one system + user exchange
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Sampling parameters for the two kinds of generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub extraction_max_tokens: u32,
    pub extraction_temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            extraction_max_tokens: 100,
            extraction_temperature: 0.3,
        }
    }
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            extraction_max_tokens: config.extraction_max_tokens,
            extraction_temperature: config.extraction_temperature,
        }
    }
}

/// System instruction shared by every answer
pub fn build_system_prompt(company: &str) -> String {
    format!(
        "You are an assistant for {company}, a company that builds AI solutions. \
Your job is to answer questions from prospective clients using information about the company's real projects.

RULES:
1. Answer ONLY from the project information you are given.
2. Do NOT invent projects that are not in the context.
3. Refer only to the projects supplied in the context and be specific about them.
4. If a supplied project does not genuinely match the question, leave it out of the answer, even though it is in the context.
5. Prefer projects with a higher relevance score.
6. Mention the concrete technologies and results of the projects you cite.
7. If the information is not sufficient, say so honestly.
8. Use Markdown: [text](url) for links, **bold** for key points, *italics* for headings.
9. Keep a professional but friendly tone.

Reply in the language the question is written in."
    )
}

/// Tier-specific closing instruction
pub fn tier_instruction(tier: ComplexityTier) -> &'static str {
    match tier {
        ComplexityTier::Simple => {
            "Answer briefly and to the point, without links to sources."
        }
        ComplexityTier::Medium => {
            "Answer in detail and make sure to list the sources of information at the end of the answer."
        }
        ComplexityTier::Hard => {
            "Answer in great detail and put source links directly into the text of the answer. \
Every project you mention must carry a link in the format [project name](url)."
        }
    }
}

/// User prompt: question, formatted project blocks, tier instruction
pub fn build_user_prompt(query: &str, context: &str, tier: ComplexityTier, company: &str) -> String {
    format!(
        "Client question: {query}\n\n\
{company} projects:\n{context}\n\n\
Answer the client's question using the project information above.\n{instruction}",
        query = query.trim(),
        company = company,
        context = context,
        instruction = tier_instruction(tier),
    )
}

/// Builds prompts and drives the generation provider
pub struct Synthesizer {
    generator: Arc<dyn AnswerGenerator>,
    settings: GenerationSettings,
    system_prompt: String,
    company: String,
}

impl Synthesizer {
    /// Create a new synthesizer
    pub fn new(generator: Arc<dyn AnswerGenerator>, settings: GenerationSettings, company: &str) -> Self {
        Self {
            generator,
            settings,
            system_prompt: build_system_prompt(company),
            company: company.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Synthesize an answer from rendered context
    pub async fn synthesize(&self, query: &str, context: &str, tier: ComplexityTier) -> Result<String> {
        let user_prompt = build_user_prompt(query, context, tier, &self.company);

        let answer = self
            .generator
            .complete(
                &self.system_prompt,
                &user_prompt,
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await?;

        if answer.trim().is_empty() {
            return Err(AppError::GenerationFailure {
                message: "Empty answer from LLM".to_string(),
            });
        }

        tracing::info!(chars = answer.chars().count(), "Answer generated");
        Ok(answer)
    }

    /// One-token completion used by readiness checks
    pub async fn probe(&self) -> Result<()> {
        self.generator
            .complete(PROBE_SYSTEM_PROMPT, "ping", 1, 0.0)
            .await
            .map(|_| ())
    }

    /// Short low-temperature extraction, e.g. pulling a client name out of a case page
    pub async fn extract_text(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        let text = self
            .generator
            .complete(
                EXTRACTION_SYSTEM_PROMPT,
                prompt,
                self.settings.extraction_max_tokens,
                self.settings.extraction_temperature,
            )
            .await?;

        Ok(text.trim().to_string())
    }
}

/// Chat-completions client (OpenAI-compatible)
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl OpenAIChatGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "llm.api_key is required".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ServiceNotInitialized {
                service: "llm".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AppError::GenerationFailure {
            message: "Empty response from LLM".to_string(),
        })
}

#[async_trait]
impl AnswerGenerator for OpenAIChatGenerator {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            max_tokens,
            temperature,
        };

        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailure {
                message: format!("LLM API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationFailure {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await
            .map_err(|e| AppError::GenerationFailure {
                message: format!("Failed to parse LLM response: {}", e),
            })?;

        first_choice(chat_response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
