// quiz-gateway-rs/src/lib.rs
// Quiz Gateway - static front-end plus validated, rate-limited sentence
// generation with retry, safety filtering and deterministic fallbacks.

pub mod errors;
pub mod fallback;
pub mod llm_client;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod prompt;
pub mod rate_limit;
pub mod safety;
pub mod static_files;
pub mod types;
pub mod validation;

pub use errors::ApiError;
pub use llm_client::{GenerationError, HttpTransport, LlmClient, LlmTransport, TextGenerator};
pub use orchestrator::{create_router, AppState};
pub use rate_limit::RateLimiter;
pub use types::{Archetype, Drama, DramaLevel, GenerationOutcome, GenerationRequest};
