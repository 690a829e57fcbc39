// quiz-gateway-rs/src/orchestrator.rs
// Request Orchestrator - HTTP entry points for sentence generation
//
// Every generation request walks the same pipeline:
//   read body -> validate -> rate check -> generate -> filter | fallback -> respond
//
// Only malformed input and exhausted rate limits reach the client as errors.
// Generation failures of any kind degrade to a canned sentence with a 200.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use config_rs::ServerSettings;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::errors::{not_found, ApiError, LineBody};
use crate::fallback::get_fallback;
use crate::llm_client::{GenerationError, TextGenerator};
use crate::logging::ip_family;
use crate::rate_limit::RateLimiter;
use crate::safety::{self, log_safety_event, SafetyEvent};
use crate::static_files::static_routes;
use crate::types::GenerationRequest;
use crate::validation::{parse_json_body, validate_generate_request, validate_sentence_request, FieldError};

/// Longest line `/api/genSentence` will return, in words
pub const MAX_LINE_WORDS: usize = 25;

const GENERATE_ROUTE: &str = "/api/generate";
const SENTENCE_ROUTE: &str = "/api/genSentence";

/// Shared handler state. One limiter serves both generation routes.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub generator: Arc<dyn TextGenerator>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, limiter: RateLimiter, max_body_bytes: usize) -> Self {
        Self {
            limiter: Arc::new(limiter),
            generator,
            max_body_bytes,
        }
    }
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GenerationData {
    pub text: String,
    pub meta: GenerationMeta,
}

#[derive(Debug, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub ok: bool,
    pub data: GenerationData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
}

/// Text and metadata produced by the generate/filter/fallback stages
#[derive(Debug)]
struct PipelineResult {
    text: String,
    meta: GenerationMeta,
    warning: Option<Warning>,
}

/// Build the application router: static assets, health, both generation
/// routes and a JSON 404 for everything else.
pub fn create_router(state: AppState, settings: &ServerSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(static_routes(settings))
        .route("/health", get(health_handler).fallback(not_found))
        .route(GENERATE_ROUTE, post(generate_handler).fallback(not_found))
        .route(SENTENCE_ROUTE, post(sentence_handler).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `POST /api/generate`
pub async fn generate_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request = match admit(&state, peer, &headers, body, validate_generate_request).await {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let result = run_generation(&state, &request, GENERATE_ROUTE, peer).await;

    Json(GenerateResponse {
        ok: true,
        data: GenerationData {
            text: result.text,
            meta: result.meta,
        },
        warnings: result.warning.map(|warning| vec![warning]),
    })
    .into_response()
}

/// `POST /api/genSentence`. Every outcome, errors included, is a bare `{line}`.
pub async fn sentence_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request = match admit(&state, peer, &headers, body, validate_sentence_request).await {
        Ok(request) => request,
        Err(err) => return err.into_line_response(),
    };

    let result = run_generation(&state, &request, SENTENCE_ROUTE, peer).await;

    Json(LineBody {
        line: normalize_line(&result.text, MAX_LINE_WORDS),
    })
    .into_response()
}

/// Body read, validation and rate check. Anything rejected here never
/// reaches the generator and emits no safety event.
async fn admit(
    state: &AppState,
    peer: SocketAddr,
    headers: &HeaderMap,
    body: Body,
    validate: fn(&Value) -> Result<GenerationRequest, Vec<FieldError>>,
) -> Result<GenerationRequest, ApiError> {
    let bytes = read_body(body, headers, state.max_body_bytes).await?;
    let payload = parse_json_body(&bytes)?;
    let request = validate(&payload).map_err(ApiError::Validation)?;

    let now = Instant::now();
    let decision = state
        .limiter
        .check_and_consume_at(&peer.ip().to_string(), now)
        .await;

    if !decision.allowed {
        tracing::warn!(
            ip_family = ip_family(Some(peer.ip())),
            "Rate limit exceeded"
        );
        return Err(ApiError::RateLimited {
            retry_after: decision.retry_after(now),
        });
    }

    Ok(request)
}

async fn read_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<Vec<u8>, ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    if declared.is_some_and(|length| length > limit) {
        return Err(ApiError::BodyTooLarge { limit });
    }

    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            tracing::debug!("Request body read failed: {}", err);
            ApiError::BadJson("Request body could not be read.".to_string())
        })?;

        if buffer.len() + chunk.len() > limit {
            return Err(ApiError::BodyTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// Generate, then filter or fall back. Always yields a sentence and logs
/// exactly one safety event.
async fn run_generation(
    state: &AppState,
    request: &GenerationRequest,
    route: &'static str,
    peer: SocketAddr,
) -> PipelineResult {
    let mut event = SafetyEvent::new(route, Uuid::new_v4().to_string(), ip_family(Some(peer.ip())));

    let result = match state.generator.generate(request).await {
        Ok(outcome) => {
            let decision = safety::filter(&outcome.text);
            event.outcome = if decision.was_replaced { "llm_replaced" } else { "llm" };
            event.reason = Some(decision.reason.as_str().to_string());
            event.llm_attempts = Some(outcome.attempts);

            if let Some(category) = decision.category {
                tracing::debug!(category, route, "Generated text blocked by denylist");
            }

            PipelineResult {
                text: decision.final_text,
                meta: GenerationMeta {
                    source: "llm",
                    attempts: Some(outcome.attempts),
                    fallback_used: false,
                    fallback_reason: None,
                },
                warning: None,
            }
        }
        Err(err) => {
            event.outcome = "fallback";
            event.reason = Some(err.code().to_string());
            fallback_result(request, &err)
        }
    };

    log_safety_event(&event);
    result
}

fn fallback_result(request: &GenerationRequest, err: &GenerationError) -> PipelineResult {
    PipelineResult {
        text: get_fallback(request.archetype, request.drama_level()).to_string(),
        meta: GenerationMeta {
            source: "fallback",
            attempts: None,
            fallback_used: true,
            fallback_reason: Some(err.code()),
        },
        warning: Some(Warning {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }),
    }
}

/// Collapse all whitespace (newlines included) and keep the first `max_words` words.
pub fn normalize_line(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_collapses_whitespace() {
        assert_eq!(normalize_line("  een\n twee\t\tdrie  ", 25), "een twee drie");
    }

    #[test]
    fn test_normalize_line_truncates_words() {
        let long = (1..=40).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let line = normalize_line(&long, MAX_LINE_WORDS);
        assert_eq!(line.split(' ').count(), MAX_LINE_WORDS);
        assert!(line.ends_with(" 25"));
    }

    #[test]
    fn test_fallback_result_carries_warning() {
        use crate::types::{Archetype, Drama, DramaLevel};

        let request = GenerationRequest {
            archetype: Archetype::Rebel,
            drama: Drama::Level(DramaLevel::Low),
            emoji_level: 0,
            prompt_hint: "x".to_string(),
            engagement_score: None,
            locale: None,
        };
        let result = fallback_result(&request, &GenerationError::Config);

        assert_eq!(result.text, get_fallback(Archetype::Rebel, DramaLevel::Low));
        assert_eq!(result.meta.source, "fallback");
        assert_eq!(result.meta.fallback_reason, Some("LLM_CONFIG_ERROR"));
        let warning = result.warning.unwrap();
        assert_eq!(warning.code, "LLM_CONFIG_ERROR");
        assert!(!warning.retryable);
    }
}
