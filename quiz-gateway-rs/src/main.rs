// quiz-gateway-rs/src/main.rs
// Quiz Gateway - HTTP entry point
// Port 3000 by default; QUIZ_GATEWAY_SERVICE_PORT or PORT override it.

use std::net::SocketAddr;
use std::sync::Arc;

use config_rs::ServiceConfig;
use quiz_gateway::logging::init_with_config;
use quiz_gateway::{create_router, AppState, LlmClient, RateLimiter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env, then logging, then settings: invalid values are warned about
    let config = init_with_config(std::io::stdout)?;

    let service_config = ServiceConfig::new("quiz-gateway");
    let port = service_config.get_service_port(3000);
    let addr = service_config.get_bind_address(port);

    if config.generation.is_configured() {
        tracing::info!(
            timeout_ms = config.generation.timeout.as_millis() as u64,
            max_retries = config.generation.max_retries,
            "LLM provider configured"
        );
    } else {
        tracing::warn!("LLM_API_URL not set; every request will use fallback sentences");
    }

    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window.as_millis() as u64,
        "Rate limiter configured"
    );

    let generator = Arc::new(LlmClient::new(config.generation.clone())?);
    let state = AppState::new(
        generator,
        RateLimiter::new(&config.rate_limit),
        config.server.max_body_bytes,
    );
    let app = create_router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quiz Gateway starting on {}", addr);
    println!("Quiz Gateway listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
