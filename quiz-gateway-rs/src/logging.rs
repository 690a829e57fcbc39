//! # Structured Logging
//!
//! Process-wide tracing subscriber for the gateway. `RUST_LOG` drives the
//! filter; `LOG_FORMAT=json` switches to flattened JSON lines.

use std::sync::atomic::{AtomicBool, Ordering};

use config_rs::QuizConfig;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Fallback level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "quiz-gateway".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `LOG_FORMAT` (`text` or `json`).
    pub fn from_env() -> Self {
        let json_format = std::env::var("LOG_FORMAT")
            .map(|format| format.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            json_format,
            ..Self::default()
        }
    }
}

/// Initializes the structured logging system on stdout. Later calls are no-ops.
/// `log` records (from `config_rs`) are bridged into the same subscriber.
pub fn init_logging(config: LoggingConfig) -> Result<(), TryInitError> {
    init_logging_with_writer(config, std::io::stdout)
}

/// `init_logging` with an explicit output sink.
pub fn init_logging_with_writer<W>(config: LoggingConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let subscriber = Registry::default().with(filter);

    // Distinct layer types for JSON and text, so each branch installs its own subscriber
    let result = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_writer(writer);

        subscriber.with(json_layer).try_init()
    } else {
        let text_layer = fmt::layer().with_target(true).with_writer(writer);

        subscriber.with(text_layer).try_init()
    };

    if let Err(err) = result {
        LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(err);
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}

/// Process startup: `.env`, then the subscriber, then the typed settings,
/// so warnings about invalid settings reach the log.
pub fn init_with_config<W>(writer: W) -> Result<QuizConfig, TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    config_rs::load_env();
    init_logging_with_writer(LoggingConfig::from_env(), writer)?;
    Ok(QuizConfig::from_env())
}

/// Coarse address family recorded in place of the client address.
pub fn ip_family(addr: Option<std::net::IpAddr>) -> &'static str {
    match addr {
        Some(std::net::IpAddr::V4(_)) => "ipv4",
        Some(std::net::IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_some() => "ipv4",
        Some(std::net::IpAddr::V6(_)) => "ipv6",
        None => "unknown",
    }
}
