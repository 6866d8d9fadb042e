//! CaseForge API Gateway
//!
//! HTTP transport over the RAG orchestrator.
//! Handles:
//! - Chat requests
//! - Health and readiness probes
//! - Rate limiting
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use caseforge_common::{
    config::AppConfig,
    context::RagOrchestrator,
    metrics::{self, LATENCY_BUCKETS, METRICS_PREFIX, STAGE_BUCKETS},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Arc<RagOrchestrator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting CaseForge API Gateway v{}",
        caseforge_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    install_metrics_exporter(&config)?;

    // A collaborator that cannot be built stops startup here
    let orchestrator = RagOrchestrator::from_config(&config).await.map_err(|e| {
        tracing::error!(stage = e.stage().as_str(), error = %e, "Failed to initialize RAG services");
        e
    })?;

    let state = AppState {
        config: config.clone(),
        orchestrator: Arc::new(orchestrator),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn install_metrics_exporter(config: &AppConfig) -> anyhow::Result<()> {
    if config.observability.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(Matcher::Suffix("_duration_seconds".to_string()), STAGE_BUCKETS)?
        .install()
        .context("failed to install Prometheus exporter")?;

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut chat_routes = Router::new().route("/chat", post(handlers::chat::chat));

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(&state.config.rate_limit);
        chat_routes = chat_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(chat_routes);

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use caseforge_common::{
        config::RagConfig,
        context::{AnswerGenerator, GenerationSettings},
        embeddings::{Embedder, EmbeddingVector},
        errors::{AppError, Result},
        search::{CaseMetadata, Candidate, IndexStats, MetadataFilter, VectorSearch},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
            Ok(EmbeddingVector::new(vec![0.5; 3]))
        }

        fn model_name(&self) -> &str {
            "stub-embedder"
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct StubSearch {
        down: bool,
    }

    #[async_trait]
    impl VectorSearch for StubSearch {
        async fn search(
            &self,
            _vector: &EmbeddingVector,
            _top_k: usize,
            _filter: Option<&MetadataFilter>,
        ) -> Result<Vec<Candidate>> {
            if self.down {
                return Err(AppError::SearchUnavailable { message: "connection refused".into() });
            }
            Ok(vec![Candidate {
                id: "magnit".to_string(),
                score: 0.61,
                metadata: CaseMetadata {
                    title: "Shelf recognition".to_string(),
                    client: "Magnit".to_string(),
                    url: "https://eora.ru/cases/magnit".to_string(),
                    ..CaseMetadata::default()
                },
            }])
        }

        async fn stats(&self) -> Result<IndexStats> {
            if self.down {
                return Err(AppError::SearchUnavailable { message: "connection refused".into() });
            }
            Ok(IndexStats { total_vectors: 42, dimension: 3 })
        }
    }

    struct StubGenerator {
        answer: &'static str,
    }

    #[async_trait]
    impl AnswerGenerator for StubGenerator {
        async fn complete(&self, _system: &str, _user: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
            Ok(self.answer.to_string())
        }

        fn model_name(&self) -> &str {
            "stub-llm"
        }
    }

    fn app_with(down: bool, answer: &'static str, rate_limited: bool) -> Router {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = rate_limited;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;

        let orchestrator = RagOrchestrator::new(
            Arc::new(StubEmbedder),
            Arc::new(StubSearch { down }),
            Arc::new(StubGenerator { answer }),
            GenerationSettings::default(),
            RagConfig::default(),
        );

        create_router(AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        })
    }

    fn app() -> Router {
        app_with(false, "We did [Shelf recognition](https://eora.ru/cases/magnit) for Magnit.", false)
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_returns_answer_and_sources() {
        let response = app()
            .oneshot(chat_request(json!({"message": "Что вы делали для ритейла?", "complexity_level": "HARD"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["complexity_level"], "hard");
        assert_eq!(body["sources"][0]["url"], "https://eora.ru/cases/magnit");
        assert!(body["processing_time"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_chat_omits_sources_without_links() {
        let response = app_with(false, "We have retail experience.", false)
            .oneshot(chat_request(json!({"message": "retail?"})))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["complexity_level"], "medium");
        assert!(body.get("sources").is_none());
    }

    #[tokio::test]
    async fn test_chat_html_format() {
        let response = app()
            .oneshot(chat_request(json!({"message": "retail?", "format": "chat_html"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let html = body["response"].as_str().unwrap();
        assert!(html.starts_with("💡 "));
        assert!(html.contains(r#"<a href="https://eora.ru/cases/magnit">Shelf recognition</a>"#));
        assert_eq!(body["messages"][0], html);
        assert_eq!(body["sources"][0]["label"], "Shelf recognition");
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let response = app().oneshot(chat_request(json!({"message": "   "}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "EMPTY_INPUT");
    }

    #[tokio::test]
    async fn test_unknown_tier_rejected() {
        let response = app()
            .oneshot(chat_request(json!({"message": "retail?", "complexity_level": "expert"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let response = app()
            .oneshot(chat_request(json!({"message": "retail?", "top_k": 0})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_outage_maps_to_503() {
        let response = app_with(true, "unused", false)
            .oneshot(chat_request(json!({"message": "retail?"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "SEARCH_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_ready_reflects_vector_store() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["vector_store"]["status"], "up");

        let response = app_with(true, "unused", false)
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_chat() {
        let app = app_with(false, "ok", true);

        let first = app.clone().oneshot(chat_request(json!({"message": "a"}))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(chat_request(json!({"message": "b"}))).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
