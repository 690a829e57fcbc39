// quiz-gateway-rs/src/errors.rs
// Client-facing errors. Only malformed requests and exceeded rate limits ever
// reach the client as errors; generation failures are absorbed by fallbacks.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

use crate::validation::FieldError;

/// Errors surfaced to HTTP clients
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Request body does not match schema.")]
    Validation(Vec<FieldError>),

    #[error("Too many requests for this endpoint.")]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    BadJson(String),

    #[error("Request body exceeds the {limit} byte limit.")]
    BodyTooLarge { limit: usize },

    #[error("Route not found.")]
    NotFound,
}

/// `{ok:false, error:{...}}` envelope used by `/api/generate` and unknown routes
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub state: &'static str,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

/// Bare `{line}` body used by `/api/genSentence` for every outcome
#[derive(Debug, Serialize)]
pub struct LineBody {
    pub line: String,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::BadJson(_) => "BAD_JSON",
            Self::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            Self::NotFound => "NOT_FOUND",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::BadJson(_) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            Self::Validation(errors) => Some(errors.clone()),
            _ => None,
        };

        ErrorEnvelope {
            ok: false,
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                state: if self.retry_after().is_some() { "retry" } else { "error" },
                retryable: self.retry_after().is_some(),
                details,
                retry_after_ms: self.retry_after().map(|d| d.as_millis() as u64),
            },
        }
    }

    /// Human-readable single line for the `{line}` contract.
    fn line_message(&self) -> String {
        match self {
            Self::Validation(errors) => {
                let problems: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                format!("Invalid request. {}", problems.join(" "))
            }
            Self::RateLimited { retry_after } => format!(
                "Too many requests, try again in {} seconds.",
                retry_after_seconds(*retry_after)
            ),
            other => other.to_string(),
        }
    }

    /// Render under the `/api/genSentence` contract: bare `{line}` body.
    /// Malformed input of any kind is a 400 here, not a 422.
    pub fn into_line_response(self) -> Response {
        let status = match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => self.status(),
        };
        let body = LineBody {
            line: self.line_message(),
        };
        with_retry_after(
            (status, Json(body)).into_response(),
            self.retry_after(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = (self.status(), Json(self.envelope())).into_response();
        with_retry_after(response, self.retry_after())
    }
}

/// Whole seconds to wait, rounded up.
pub fn retry_after_seconds(wait: Duration) -> u64 {
    let millis = wait.as_millis() as u64;
    millis.div_ceil(1000)
}

fn with_retry_after(mut response: Response, wait: Option<Duration>) -> Response {
    if let Some(wait) = wait {
        if let Ok(value) = HeaderValue::from_str(&retry_after_seconds(wait).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    response
}

/// Router fallback for unknown routes and methods.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
