use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream;
use retrieval::{CorpusIndex, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod llm;

use config::Config;
use llm::LlmClient;

const CHAT_PAGE: &str = include_str!("../assets/index.html");
const EMBEDDED_CORPUS: &str = include_str!("../assets/corpus.txt");

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub chunk_id: usize,
    pub score: f32,
    pub text: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<CorpusIndex>,
    pub llm: LlmClient,
}

/// The corpus text: read from `path` when given, otherwise the embedded
/// knowledge base.
pub fn load_corpus(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file {}", path)),
        None => Ok(EMBEDDED_CORPUS.to_string()),
    }
}

pub fn build_app(corpus: &str, config: Config) -> Result<Router> {
    // Index the corpus at startup; an indexing failure degrades to an empty
    // index rather than aborting.
    let index = Arc::new(CorpusIndex::build(corpus));
    tracing::info!(chunks = index.chunk_count(), "corpus indexed");
    let llm = LlmClient::new(&config)?;
    let state = AppState { index, llm };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/", get(home_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/api/chat", post(chat_handler))
        .route("/api/search", get(search_handler))
        .route("/api/info", get(info_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn home_handler() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

pub async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No question provided" })),
        )
            .into_response();
    }

    let context = state.index.find_relevant_context(&req.question, DEFAULT_TOP_K);
    let prompt = build_prompt(&context, &req.question);

    match state.llm.stream_completion(&prompt).await {
        Ok(rx) => {
            let stream = stream::unfold(rx, |mut rx| async move {
                match rx.recv().await {
                    Some(Ok(delta)) => Some((Ok::<_, Infallible>(delta), rx)),
                    Some(Err(err)) => {
                        // Mid-stream failure ends the body; the page keeps
                        // whatever arrived before it.
                        tracing::error!(error = %err, "completion stream failed");
                        None
                    }
                    None => None,
                }
            });
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "completion request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let results = match state.index.rank(&params.q) {
        Ok(ranked) => ranked
            .into_iter()
            .take(params.k)
            .map(|hit| SearchHit {
                chunk_id: hit.chunk_id,
                score: hit.score,
                text: state.index.chunks()[hit.chunk_id].clone(),
            })
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "scoring failed, returning no results");
            Vec::new()
        }
    };
    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        results,
    })
}

pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "app": "Neuroscience RAG Chatbot",
        "retrieval": "TF-IDF + cosine similarity",
        "llm": format!("Groq ({})", state.llm.model()),
        "chunks": state.index.chunk_count(),
        "framework": "axum + RAG",
    }))
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following neuroscience information, answer the question.\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}
