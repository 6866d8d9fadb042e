//! RAG orchestrator - one linear request/response cycle
//!
//! embed -> search -> filter -> format -> generate. Each stage short-circuits
//! the request on failure; no stage is retried and no partial answer is
//! ever returned. The orchestrator holds only configuration and clients, so
//! one instance is shared read-only across concurrent requests.

use super::formatter::ContextFormatter;
use super::links::{extract_links, SourceLink};
use super::relevance::{FilteredContext, RelevancePolicy};
use super::synthesizer::{AnswerGenerator, GenerationSettings, OpenAIChatGenerator, Synthesizer};
use super::tier::ComplexityTier;
use crate::config::{AppConfig, RagConfig};
use crate::embeddings::{create_embedder, Embedder};
use crate::errors::{AppError, Result, Stage};
use crate::metrics;
use crate::search::{create_vector_search, IndexStats, MetadataFilter, VectorSearch};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

const PROBE_TEXT: &str = "readiness check";

/// Answer produced by one orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub text: String,
    pub tier: ComplexityTier,
    pub processing_time: Duration,

    /// Candidates returned by search
    pub retrieved: usize,

    /// Ids of the candidates the answer was grounded on, best first
    pub used: Vec<String>,

    /// Whether the relevance fallback supplied the context
    pub fallback: bool,
}

impl RagAnswer {
    /// Markdown links cited in the answer text
    pub fn sources(&self) -> Vec<SourceLink> {
        extract_links(&self.text)
    }
}

/// Status of one collaborator as seen by readiness probes
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentStatus {
    fn up(detail: String, latency_ms: Option<u64>) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms,
            detail: Some(detail),
            error: None,
        }
    }

    fn down(error: String) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            detail: None,
            error: Some(error),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == "up"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub embedder: ComponentStatus,
    pub vector_store: ComponentStatus,
    pub llm: ComponentStatus,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.embedder.is_up() && self.vector_store.is_up() && self.llm.is_up()
    }
}

/// Sequences embedder, search, relevance filter, formatter and synthesizer
pub struct RagOrchestrator {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn VectorSearch>,
    synthesizer: Synthesizer,
    policy: RelevancePolicy,
    formatter: ContextFormatter,
    config: RagConfig,
}

impl RagOrchestrator {
    /// Assemble from explicit collaborators
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn VectorSearch>,
        generator: Arc<dyn AnswerGenerator>,
        settings: GenerationSettings,
        config: RagConfig,
    ) -> Self {
        Self {
            embedder,
            search,
            synthesizer: Synthesizer::new(generator, settings, &config.company_name),
            policy: RelevancePolicy::from(&config),
            formatter: ContextFormatter::new(),
            config,
        }
    }

    /// Build every collaborator from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        tracing::info!("Initializing RAG services");

        let embedder = create_embedder(&config.embedding)?;
        let search = create_vector_search(&config.vector_store).await?;
        let generator: Arc<dyn AnswerGenerator> = Arc::new(OpenAIChatGenerator::new(&config.llm)?);

        tracing::info!(
            embedding_model = embedder.model_name(),
            llm_model = generator.model_name(),
            index = %config.vector_store.index_name,
            "RAG services initialized"
        );

        Ok(Self::new(
            embedder,
            search,
            generator,
            GenerationSettings::from(&config.llm),
            config.rag.clone(),
        ))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer `query` at `tier`, grounded on up to `top_k` retrieved cases
    pub async fn process(&self, query: &str, tier: ComplexityTier, top_k: usize) -> Result<RagAnswer> {
        self.process_filtered(query, tier, top_k, None).await
    }

    /// Same as [`process`](Self::process) with a metadata filter forwarded to search
    pub async fn process_filtered(
        &self,
        query: &str,
        tier: ComplexityTier,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<RagAnswer> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("rag_request", %request_id, tier = tier.as_str(), top_k);

        async move {
            let start = Instant::now();
            let result = self.run(query, tier, top_k, filter, start).await;

            match &result {
                Ok(answer) => {
                    metrics::record_rag_request(tier, "success");
                    tracing::info!(
                        latency_ms = answer.processing_time.as_millis() as u64,
                        used = answer.used.len(),
                        "Query answered"
                    );
                }
                Err(e) => {
                    metrics::record_rag_request(tier, e.stage().as_str());
                    tracing::error!(
                        stage = e.stage().as_str(),
                        error = %e,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "No answer produced"
                    );
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        query: &str,
        tier: ComplexityTier,
        top_k: usize,
        filter: Option<&MetadataFilter>,
        start: Instant,
    ) -> Result<RagAnswer> {
        self.validate(query, top_k)?;
        tracing::info!(query_chars = query.chars().count(), "Processing query");

        let stage_start = Instant::now();
        let embedding = self.embedder.embed(query).await;
        metrics::record_stage(Stage::Embed, stage_start.elapsed().as_secs_f64(), embedding.is_ok());
        let embedding = embedding?;

        let stage_start = Instant::now();
        let ranked = self.search.search(&embedding, top_k, filter).await;
        metrics::record_stage(Stage::Search, stage_start.elapsed().as_secs_f64(), ranked.is_ok());
        let ranked = ranked?;
        tracing::info!(candidates = ranked.len(), "Candidates retrieved");

        let context = self.policy.apply(ranked);
        self.log_filtering(&context);

        let rendered = self.formatter.render(&context, tier);

        let stage_start = Instant::now();
        let text = self.synthesizer.synthesize(query, &rendered, tier).await;
        metrics::record_stage(Stage::Generate, stage_start.elapsed().as_secs_f64(), text.is_ok());
        let text = text?;

        Ok(RagAnswer {
            text,
            tier,
            processing_time: start.elapsed(),
            retrieved: context.retrieved,
            used: context.ids(),
            fallback: context.fallback,
        })
    }

    fn validate(&self, query: &str, top_k: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        let chars = query.chars().count();
        if chars > self.config.max_query_chars {
            return Err(AppError::Validation {
                message: format!(
                    "query is {} characters, limit is {}",
                    chars, self.config.max_query_chars
                ),
                field: Some("query".to_string()),
            });
        }

        if top_k == 0 || top_k > self.config.max_top_k {
            return Err(AppError::Validation {
                message: format!("top_k must be between 1 and {}", self.config.max_top_k),
                field: Some("top_k".to_string()),
            });
        }

        Ok(())
    }

    fn log_filtering(&self, context: &FilteredContext) {
        metrics::record_candidates(context.retrieved, context.len(), context.fallback);

        if context.fallback {
            tracing::info!(
                threshold = self.policy.threshold,
                kept = context.len(),
                "No candidate above threshold, using top fallback"
            );
        } else {
            tracing::info!(
                threshold = self.policy.threshold,
                before = context.retrieved,
                after = context.len(),
                "Candidates filtered"
            );
        }

        if context.is_empty() {
            tracing::warn!("No grounding material, answer will rely on the empty-context notice");
        }
    }

    /// Low-temperature extraction through the same generation provider
    pub async fn extract_text(&self, prompt: &str) -> Result<String> {
        self.synthesizer.extract_text(prompt).await
    }

    /// Probe every collaborator with a real call; the three probes run concurrently
    pub async fn readiness(&self) -> Readiness {
        let embedder = async {
            let start = Instant::now();
            match self.embedder.embed(PROBE_TEXT).await {
                Ok(vector) => ComponentStatus::up(
                    format!("{}, dimension {}", self.embedder.model_name(), vector.dimension()),
                    Some(start.elapsed().as_millis() as u64),
                ),
                Err(e) => ComponentStatus::down(e.to_string()),
            }
        };

        let vector_store = async {
            let start = Instant::now();
            match self.search.stats().await {
                Ok(IndexStats { total_vectors, dimension }) => ComponentStatus::up(
                    format!("{} vectors, dimension {}", total_vectors, dimension),
                    Some(start.elapsed().as_millis() as u64),
                ),
                Err(e) => ComponentStatus::down(e.to_string()),
            }
        };

        let llm = async {
            let start = Instant::now();
            match self.synthesizer.probe().await {
                Ok(()) => ComponentStatus::up(
                    self.synthesizer.model_name().to_string(),
                    Some(start.elapsed().as_millis() as u64),
                ),
                Err(e) => ComponentStatus::down(e.to_string()),
            }
        };

        let (embedder, vector_store, llm) = tokio::join!(embedder, vector_store, llm);

        for (name, status) in [("embedder", &embedder), ("vector_store", &vector_store), ("llm", &llm)] {
            if let Some(error) = &status.error {
                tracing::warn!(component = name, error = %error, "Readiness check failed");
            }
        }

        Readiness { embedder, vector_store, llm }
    }
}
