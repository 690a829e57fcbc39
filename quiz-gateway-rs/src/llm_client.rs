// quiz-gateway-rs/src/llm_client.rs
//
// HTTP client for the external text-generation provider
//
// This module provides:
// - A single POST per attempt, `{"prompt": ...}` in, `{"text": ...}` out
// - A per-attempt timeout that drops (and so cancels) the in-flight request
// - Linear backoff between attempts: attempt N waits `base_delay * N`
// - Error classification into retryable vs. non-retryable kinds
//
// Configuration comes from `config_rs::GenerationSettings`:
// - LLM_API_URL: provider endpoint; unset is a CONFIG error, never retried
// - LLM_API_KEY: sent as a bearer token when present
// - LLM_TIMEOUT_MS (3000), LLM_MAX_RETRIES (2), LLM_BASE_DELAY_MS (250)

use async_trait::async_trait;
use config_rs::GenerationSettings;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::prompt::build_prompt;
use crate::types::{GenerationOutcome, GenerationRequest};

/// Coarse error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Config,
    Http,
    Timeout,
    InvalidResponse,
}

// Every variant knows its kind and whether another attempt could help,
// so callers never have to inspect messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM API URL is not configured.")]
    Config,

    #[error("LLM provider responded with HTTP {status}.")]
    Http { status: u16 },

    // Connection-level failure before any status line arrived
    #[error("LLM provider request failed: {0}")]
    Transport(String),

    #[error("LLM provider did not respond within {0:?}.")]
    Timeout(Duration),

    #[error("LLM provider returned invalid payload: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Config => ErrorKind::Config,
            GenerationError::Http { .. } | GenerationError::Transport(_) => ErrorKind::Http,
            GenerationError::Timeout(_) => ErrorKind::Timeout,
            GenerationError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Http { status } => *status >= 500 || *status == 429,
            GenerationError::Timeout(_) => true,
            GenerationError::Config
            | GenerationError::Transport(_)
            | GenerationError::InvalidResponse(_) => false,
        }
    }

    /// Stable wire code reported in fallback warnings
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Config => "LLM_CONFIG_ERROR",
            ErrorKind::Http => "LLM_HTTP_ERROR",
            ErrorKind::Timeout => "LLM_TIMEOUT",
            ErrorKind::InvalidResponse => "LLM_INVALID_RESPONSE",
        }
    }
}

/// Anything that can turn a validated request into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerationError>;
}

/// Raw reply from one provider round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One POST to the provider. Errors are connection-level failures only;
/// non-2xx statuses come back as a normal `TransportResponse`.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> Result<TransportResponse, String>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Fails only when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> Result<TransportResponse, String> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_connect() {
                format!("Connection failed: {}", err)
            } else {
                format!("Network error: {}", err)
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| format!("Failed to read response body: {}", err))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Generation client with timeout, retry and error normalization
#[derive(Debug)]
pub struct LlmClient<T = HttpTransport> {
    transport: T,
    settings: GenerationSettings,
}

impl LlmClient<HttpTransport> {
    pub fn new(settings: GenerationSettings) -> Result<Self, reqwest::Error> {
        Ok(Self::with_transport(settings, HttpTransport::new()?))
    }
}

impl<T: LlmTransport> LlmClient<T> {
    pub fn with_transport(settings: GenerationSettings, transport: T) -> Self {
        Self { transport, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    // Execute a single attempt under the per-attempt timeout
    async fn execute_attempt(&self, api_url: &str, body: &Value) -> Result<String, GenerationError> {
        let call = self
            .transport
            .post_json(api_url, self.settings.api_key.as_deref(), body);

        let response = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(message)) => return Err(GenerationError::Transport(message)),
            Err(_) => return Err(GenerationError::Timeout(self.settings.timeout)),
        };

        if !(200..300).contains(&response.status) {
            return Err(GenerationError::Http {
                status: response.status,
            });
        }

        let data: Value = serde_json::from_slice(&response.body)
            .map_err(|_| GenerationError::InvalidResponse("body is not JSON".to_string()))?;

        data.get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GenerationError::InvalidResponse("missing non-empty `text` field".to_string()))
    }
}

#[async_trait]
impl<T: LlmTransport> TextGenerator for LlmClient<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerationError> {
        let api_url = match self.settings.api_url.as_deref() {
            Some(url) => url,
            None => return Err(GenerationError::Config),
        };

        let body = json!({ "prompt": build_prompt(request) });
        let mut attempt: u32 = 0;

        loop {
            match self.execute_attempt(api_url, &body).await {
                Ok(text) => {
                    return Ok(GenerationOutcome {
                        text,
                        attempts: attempt + 1,
                    })
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.settings.max_retries {
                        tracing::error!(
                            code = err.code(),
                            attempts = attempt + 1,
                            "LLM request failed: {}",
                            err
                        );
                        return Err(err);
                    }

                    let backoff = self.settings.base_delay * (attempt + 1);
                    tracing::warn!(
                        code = err.code(),
                        attempt = attempt + 1,
                        "Retryable error: {}. Retrying in {:?}",
                        err,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Archetype, Drama, DramaLevel};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    enum Step {
        Reply(u16, &'static str),
        Fail,
        Hang,
    }

    /// Scripted in-process transport that counts calls
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let transport = Self {
                steps: Mutex::new(steps.into()),
                calls: Arc::clone(&calls),
            };
            (transport, calls)
        }
    }

    #[async_trait]
    impl LlmTransport for ScriptedTransport {
        async fn post_json(
            &self,
            _url: &str,
            _api_key: Option<&str>,
            _body: &Value,
        ) -> Result<TransportResponse, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Fail);
            match step {
                Step::Reply(status, body) => Ok(TransportResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                Step::Fail => Err("connection refused".to_string()),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err("unreachable".to_string())
                }
            }
        }
    }

    fn settings(url: Option<&str>) -> GenerationSettings {
        GenerationSettings {
            api_url: url.map(str::to_string),
            api_key: None,
            timeout: Duration::from_millis(50),
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            archetype: Archetype::Mentor,
            drama: Drama::Level(DramaLevel::Low),
            emoji_level: 1,
            prompt_hint: "x".to_string(),
            engagement_score: None,
            locale: None,
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(GenerationError::Http { status: 500 }.is_retryable());
        assert!(GenerationError::Http { status: 503 }.is_retryable());
        assert!(GenerationError::Http { status: 429 }.is_retryable());
        assert!(!GenerationError::Http { status: 400 }.is_retryable());
        assert!(!GenerationError::Http { status: 404 }.is_retryable());
        assert!(GenerationError::Timeout(Duration::from_millis(1)).is_retryable());
        assert!(!GenerationError::Config.is_retryable());
        assert!(!GenerationError::InvalidResponse("x".into()).is_retryable());
        assert!(!GenerationError::Transport("x".into()).is_retryable());

        assert_eq!(GenerationError::Config.kind(), ErrorKind::Config);
        assert_eq!(GenerationError::Transport("x".into()).kind(), ErrorKind::Http);
        assert_eq!(GenerationError::Timeout(Duration::ZERO).code(), "LLM_TIMEOUT");
        assert_eq!(GenerationError::Config.code(), "LLM_CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error_without_transport_call() {
        let (transport, calls) = ScriptedTransport::new(vec![Step::Reply(200, r#"{"text":"x"}"#)]);
        let client = LlmClient::with_transport(settings(None), transport);

        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::Config);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_trims_text() {
        let (transport, calls) =
            ScriptedTransport::new(vec![Step::Reply(200, r#"{"text":"  generated  "}"#)]);
        let client = LlmClient::with_transport(settings(Some("http://llm.test")), transport);

        let outcome = client.generate(&request()).await.unwrap();
        assert_eq!(outcome.text, "generated");
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_on_timeout_and_eventually_succeeds() {
        let (transport, calls) = ScriptedTransport::new(vec![
            Step::Hang,
            Step::Hang,
            Step::Reply(200, r#"{"text":"generated"}"#),
        ]);
        let client = LlmClient::with_transport(settings(Some("http://llm.test")), transport);

        let outcome = client.generate(&request()).await.unwrap();
        assert_eq!(outcome.text, "generated");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exactly_max_retries_on_server_errors() {
        let (transport, calls) = ScriptedTransport::new(vec![
            Step::Reply(503, ""),
            Step::Reply(500, ""),
            Step::Reply(502, ""),
            Step::Reply(200, r#"{"text":"too late"}"#),
        ]);
        let client = LlmClient::with_transport(settings(Some("http://llm.test")), transport);

        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::Http { status: 502 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limited_provider_is_retried() {
        let (transport, calls) = ScriptedTransport::new(vec![
            Step::Reply(429, ""),
            Step::Reply(200, r#"{"text":"ok"}"#),
        ]);
        let client = LlmClient::with_transport(settings(Some("http://llm.test")), transport);

        let outcome = client.generate(&request()).await.unwrap();
        assert_eq!(outcome.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_stop_immediately() {
        let cases = vec![
            (Step::Reply(400, ""), ErrorKind::Http),
            (Step::Reply(200, r#"{"text":"   "}"#), ErrorKind::InvalidResponse),
            (Step::Reply(200, "not json"), ErrorKind::InvalidResponse),
            (Step::Reply(200, r#"{"message":"hi"}"#), ErrorKind::InvalidResponse),
            (Step::Fail, ErrorKind::Http),
        ];

        for (step, kind) in cases {
            let (transport, calls) = ScriptedTransport::new(vec![step]);
            let client = LlmClient::with_transport(settings(Some("http://llm.test")), transport);

            let err = client.generate(&request()).await.unwrap_err();
            assert_eq!(err.kind(), kind);
            assert!(!err.is_retryable());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_backoff_is_linear() {
        let (transport, _calls) = ScriptedTransport::new(vec![
            Step::Reply(500, ""),
            Step::Reply(500, ""),
            Step::Reply(500, ""),
        ]);
        let mut config = settings(Some("http://llm.test"));
        config.base_delay = Duration::from_millis(40);
        let client = LlmClient::with_transport(config, transport);

        let started = Instant::now();
        let _ = client.generate(&request()).await;

        // 40ms after attempt 1, 80ms after attempt 2
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_http_client_construction_reports_errors_instead_of_panicking() {
        let client = LlmClient::new(settings(Some("http://llm.test"))).unwrap();
        assert_eq!(client.settings().max_retries, 2);
        assert!(HttpTransport::new().is_ok());
    }

    #[tokio::test]
    async fn test_http_transport_against_mock_provider() {
        let server = MockServer::start().await;
        let expected_prompt = build_prompt(&request());

        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("authorization", "Bearer secret-key"))
            .and(body_json(json!({ "prompt": expected_prompt })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": " hallo " })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = settings(Some(format!("{}/generate", server.uri()).as_str()));
        config.api_key = Some("secret-key".to_string());
        config.timeout = Duration::from_secs(2);
        let client = LlmClient::new(config).unwrap();

        let outcome = client.generate(&request()).await.unwrap();
        assert_eq!(outcome.text, "hallo");
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_http_transport_retries_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let mut config = settings(Some(server.uri().as_str()));
        config.timeout = Duration::from_secs(2);
        let client = LlmClient::new(config).unwrap();

        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::Http { status: 500 });
    }

    #[tokio::test]
    async fn test_http_transport_times_out_slow_provider() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "text": "slow" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut config = settings(Some(server.uri().as_str()));
        config.max_retries = 1;
        let client = LlmClient::new(config).unwrap();

        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }
}
