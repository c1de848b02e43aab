//! REST API server for the Hansard RAG service
//!
//! Provides HTTP endpoints for:
//! - Hybrid search over the transcript corpus
//! - Natural-language Q&A with cited sources
//! - Document reconstruction, statistics, and health

use crate::config::RagConfig;
use crate::embedding::OllamaEmbedder;
use crate::error::RagError;
use crate::generator::{Generator, OllamaGenerator};
use crate::index::{FullDocument, IndexGateway, IndexStats, SearchFilters, SolrGateway};
use crate::rag::{RagOrchestrator, SourceCitation};
use crate::retrieval::{EnhancedRetriever, HybridRetriever, Reranker, SearchResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Hard limit on requested result counts
const MAX_TOP_K: usize = 50;

/// Shared application state: long-lived component instances
#[derive(Clone)]
pub struct AppState {
    /// Index gateway, shared across requests
    pub gateway: Arc<dyn IndexGateway>,
    /// Generator client, shared across requests
    pub generator: Arc<dyn Generator>,
    /// Hybrid retriever backing /search
    pub retriever: Arc<HybridRetriever>,
    /// RAG orchestrator backing /ask
    pub orchestrator: Arc<RagOrchestrator>,
    /// Default top_k when a request omits it
    pub default_top_k: usize,
}

impl AppState {
    /// Wire up the component graph from configuration
    pub fn new(config: RagConfig) -> Self {
        let gateway: Arc<dyn IndexGateway> = Arc::new(SolrGateway::new(config.index.clone()));
        let embedder = Arc::new(OllamaEmbedder::new(config.embedding.clone()));
        let generator: Arc<dyn Generator> =
            Arc::new(OllamaGenerator::new(config.generator.clone()));

        let reranker = Reranker::new(
            config.retrieval.rerank_enabled,
            config.retrieval.rerank_boost,
        );
        let retriever = Arc::new(HybridRetriever::new(
            gateway.clone(),
            embedder,
            reranker,
            config.retrieval.rrf_k,
        ));
        let enhanced = Arc::new(EnhancedRetriever::new(retriever.clone()));
        let orchestrator = Arc::new(RagOrchestrator::new(
            enhanced,
            generator.clone(),
            config.generator.max_concurrent,
            Duration::from_secs(config.generator.queue_wait),
            config.retrieval.max_context_chunks,
        ));

        Self {
            gateway,
            generator,
            retriever,
            orchestrator,
            default_top_k: config.retrieval.default_top_k,
        }
    }
}

/// Request body for POST /search
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SearchRequest {
    /// Search query text
    #[schema(example = "seabed mining")]
    pub query: String,
    /// Search filters
    #[serde(default)]
    pub filters: SearchFilters,
    /// Number of results to return (1..=50)
    #[serde(default)]
    #[schema(example = 12)]
    pub top_k: Option<usize>,
}

/// Query parameters for GET /search
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQueryParams {
    /// Search query
    pub q: String,
    /// Filter by country
    pub country: Option<String>,
    /// Filter by speaker
    pub speaker: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub date_from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub date_to: Option<String>,
    /// Parliament chamber
    pub chamber: Option<String>,
    /// Number of results to return
    pub top_k: Option<usize>,
}

/// Response body for /search
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// Original search query
    pub query: String,
    /// Search results
    pub results: Vec<SearchResult>,
    /// Total number of results found
    pub total_found: usize,
    /// Response time in milliseconds
    pub response_time_ms: f64,
    /// Type of search performed
    #[schema(example = "hybrid")]
    pub search_type: String,
}

/// Request body for POST /ask
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AskRequest {
    /// Natural language question
    #[schema(example = "What is the government's stance on seabed mining?")]
    pub question: String,
    /// Search filters
    #[serde(default)]
    pub filters: SearchFilters,
    /// Number of chunks to retrieve (1..=50)
    #[serde(default)]
    #[schema(example = 12)]
    pub top_k: Option<usize>,
    /// Generation temperature (0.0..=1.0)
    #[serde(default)]
    #[schema(example = 0.1)]
    pub temperature: Option<f32>,
}

/// Response body for /ask
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    /// Original question
    pub question: String,
    /// Generated answer with citations
    pub answer: String,
    /// Source citations
    pub sources: Vec<SourceCitation>,
    /// Response time in milliseconds
    pub response_time_ms: f64,
    /// Model used for generation
    pub model_used: String,
    /// Number of chunks used in context
    pub chunks_used: usize,
}

/// Response body for /health
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status
    #[schema(example = "healthy")]
    pub status: String,
    /// Health check timestamp
    pub timestamp: String,
    /// Individual service status
    pub services: HashMap<String, String>,
    /// API version
    pub version: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status_code: u16,
    /// Error timestamp
    pub timestamp: String,
}

/// Error wrapper mapping pipeline errors to HTTP responses
#[derive(Debug)]
pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            RagError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                format!("{}: {}", field, message),
            ),
            RagError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            RagError::Busy(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            _ => {
                error!("Internal error: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            status_code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });

        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        health_handler,
        search_get_handler,
        search_post_handler,
        ask_handler,
        document_handler,
        stats_handler,
        models_handler,
    ),
    components(
        schemas(
            SearchRequest,
            SearchResponse,
            SearchResult,
            SearchFilters,
            AskRequest,
            AskResponse,
            SourceCitation,
            FullDocument,
            IndexStats,
            HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "search", description = "Hybrid search over the corpus"),
        (name = "ask", description = "Question answering with citations"),
        (name = "documents", description = "Document retrieval and statistics")
    ),
    info(
        title = "Hansard RAG API",
        version = "0.3.0",
        description = "Retrieval-Augmented Generation API for Pacific Parliamentary Records"
    )
)]
struct ApiDoc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/search", get(search_get_handler).post(search_post_handler))
        .route("/ask", axum::routing::post(ask_handler))
        .route("/document/{doc_id}", get(document_handler))
        .route("/stats", get(stats_handler))
        .route("/models", get(models_handler))
        .route("/api-docs/openapi.json", get(openapi_spec_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn openapi_spec_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Service banner
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service information"))
)]
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Hansard RAG API",
        "version": crate::VERSION,
        "status": "running",
        "endpoints": {
            "search": "/search",
            "ask": "/ask",
            "health": "/health",
            "stats": "/stats"
        }
    }))
}

/// Health check across the index and generator dependencies
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthResponse),
        (status = 503, description = "A dependency is down", body = HealthResponse)
    )
)]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (index_healthy, generator_healthy) =
        tokio::join!(state.gateway.health(), state.generator.health());

    let healthy = index_healthy && generator_healthy;

    let mut services = HashMap::new();
    services.insert(
        "index".to_string(),
        status_word(index_healthy).to_string(),
    );
    services.insert(
        "generator".to_string(),
        status_word(generator_healthy).to_string(),
    );
    services.insert("api".to_string(), "healthy".to_string());

    let response = HealthResponse {
        status: status_word(healthy).to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        services,
        version: crate::VERSION.to_string(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

fn status_word(healthy: bool) -> &'static str {
    if healthy {
        "healthy"
    } else {
        "unhealthy"
    }
}

/// Hybrid search via query parameters
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    params(SearchQueryParams),
    responses(
        (status = 200, description = "Ranked search results", body = SearchResponse),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn search_get_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQueryParams>,
) -> ApiResult<Json<SearchResponse>> {
    let request = SearchRequest {
        query: params.q,
        filters: SearchFilters {
            country: params.country,
            speaker: params.speaker,
            chamber: params.chamber,
            date_from: params.date_from,
            date_to: params.date_to,
        },
        top_k: params.top_k,
    };

    run_search(&state, request).await.map(Json)
}

/// Hybrid search via request body
#[utoipa::path(
    post,
    path = "/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Ranked search results", body = SearchResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn search_post_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    run_search(&state, request).await.map(Json)
}

async fn run_search(state: &AppState, request: SearchRequest) -> ApiResult<SearchResponse> {
    let start = Instant::now();

    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(RagError::validation("query", "must not be empty").into());
    }
    let top_k = validate_top_k(request.top_k, state.default_top_k)?;
    validate_filters(&request.filters)?;

    info!("Search: '{}' (top_k {})", query, top_k);
    let results = state.retriever.search(&query, &request.filters, top_k).await;

    Ok(SearchResponse {
        total_found: results.len(),
        results,
        query,
        response_time_ms: elapsed_ms(start),
        search_type: "hybrid".to_string(),
    })
}

/// Answer a question with cited sources
#[utoipa::path(
    post,
    path = "/ask",
    tag = "ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer with sources", body = AskResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Service busy", body = ErrorResponse)
    )
)]
async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let start = Instant::now();

    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(RagError::validation("question", "must not be empty").into());
    }
    let top_k = validate_top_k(request.top_k, state.default_top_k)?;
    let temperature = request.temperature.unwrap_or(0.1);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(
            RagError::validation("temperature", "must be between 0.0 and 1.0").into(),
        );
    }
    validate_filters(&request.filters)?;

    info!("Ask: '{}' (top_k {})", question, top_k);
    let outcome = state
        .orchestrator
        .answer(&question, &request.filters, top_k, temperature)
        .await?;

    Ok(Json(AskResponse {
        question,
        answer: outcome.answer,
        chunks_used: outcome.chunks_used,
        sources: outcome.sources,
        response_time_ms: elapsed_ms(start),
        model_used: outcome.model_used,
    }))
}

/// Fetch a full document reconstructed from its chunks
#[utoipa::path(
    get,
    path = "/document/{doc_id}",
    tag = "documents",
    params(("doc_id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Full document", body = FullDocument),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn document_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> ApiResult<Json<FullDocument>> {
    info!("Fetching full document {}", doc_id);

    let document = state.gateway.fetch_document(&doc_id).await?;

    match document {
        Some(document) => Ok(Json(document)),
        None => Err(RagError::NotFound(format!("document {}", doc_id)).into()),
    }
}

/// Index statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "documents",
    responses(
        (status = 200, description = "Index statistics", body = IndexStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn stats_handler(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.gateway.stats().await)
}

/// List models available at the generator
#[utoipa::path(
    get,
    path = "/models",
    tag = "documents",
    responses(
        (status = 200, description = "Available models"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn models_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    let models = state.generator.list_models().await?;
    Ok(Json(serde_json::json!({ "models": models })))
}

fn validate_top_k(top_k: Option<usize>, default: usize) -> ApiResult<usize> {
    let top_k = top_k.unwrap_or(default);
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(RagError::validation("top_k", "must be between 1 and 50").into());
    }
    Ok(top_k)
}

fn validate_filters(filters: &SearchFilters) -> ApiResult<()> {
    validate_date("date_from", filters.date_from.as_deref())?;
    validate_date("date_to", filters.date_to.as_deref())?;
    Ok(())
}

fn validate_date(field: &str, value: Option<&str>) -> ApiResult<()> {
    if let Some(value) = value {
        if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
            return Err(
                RagError::validation(field, "must be an ISO-8601 day (YYYY-MM-DD)").into(),
            );
        }
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Start the API server
pub async fn start_server(state: AppState, host: &str, port: u16) -> crate::error::Result<()> {
    let addr = format!("{}:{}", host, port);
    info!("Starting API server on {}", addr);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RagError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| RagError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_top_k_bounds() {
        assert_eq!(validate_top_k(None, 12).unwrap(), 12);
        assert_eq!(validate_top_k(Some(1), 12).unwrap(), 1);
        assert_eq!(validate_top_k(Some(50), 12).unwrap(), 50);
        assert!(validate_top_k(Some(0), 12).is_err());
        assert!(validate_top_k(Some(51), 12).is_err());
    }

    #[test]
    fn test_validate_date_filters() {
        assert!(validate_date("date_from", Some("2021-02-10")).is_ok());
        assert!(validate_date("date_from", None).is_ok());
        assert!(validate_date("date_from", Some("10/02/2021")).is_err());
        assert!(validate_date("date_from", Some("not-a-date")).is_err());
    }

    #[test]
    fn test_search_request_deserializes_with_defaults() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "seabed mining"}"#).unwrap();
        assert_eq!(request.query, "seabed mining");
        assert_eq!(request.filters, SearchFilters::default());
        assert_eq!(request.top_k, None);
    }

    #[test]
    fn test_ask_request_deserializes_filters() {
        let request: AskRequest = serde_json::from_str(
            r#"{"question": "q", "filters": {"country": "Fiji"}, "top_k": 5}"#,
        )
        .unwrap();
        assert_eq!(request.filters.country.as_deref(), Some("Fiji"));
        assert_eq!(request.top_k, Some(5));
    }

    #[test]
    fn test_error_response_shape() {
        let err = ApiError(RagError::validation("top_k", "must be between 1 and 50"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err = ApiError(RagError::NotFound("document x".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = ApiError(RagError::Busy("queue full".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
