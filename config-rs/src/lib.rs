//! config-rs/lib.rs
//! Shared configuration utilities for the quiz gateway.
//! Provides port/address resolution plus the typed settings the request
//! pipeline runs on. Everything is read from the environment with defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Read an environment variable and parse it, falling back to `default`
/// when it is unset or unparseable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Invalid value in {}, using default", name);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read an optional, non-empty string variable.
fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "QUIZ_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
///
/// `<SERVICE>_SERVICE_PORT` wins; the bare `PORT` variable is honoured as a
/// legacy override when the service-specific one is unset.
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    let raw = env::var(&var_name).or_else(|_| env::var("PORT"));
    match raw {
        Ok(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// Accepts `<SERVICE>_SERVICE_ADDR` as either `host:port` or
/// `http://host:port`; otherwise binds all interfaces on the resolved port.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        if let Some(addr) = parse_socket_addr(&addr_str) {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn parse_socket_addr(raw: &str) -> Option<SocketAddr> {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').parse::<SocketAddr>().ok()
}

/// Per-service view over the address helpers, so binaries don't repeat
/// their service name at every call site.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    service_name: String,
}

impl ServiceConfig {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.replace('-', "_").to_uppercase(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn get_service_port(&self, default_port: u16) -> u16 {
        get_service_port(&self.service_name, default_port)
    }

    pub fn get_bind_address(&self, default_port: u16) -> SocketAddr {
        get_bind_address(&self.service_name, default_port)
    }
}

/// Settings for the external text-generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Provider endpoint; `None` means generation is not configured.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Linear backoff unit: attempt N waits `base_delay * N`
    pub base_delay: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            timeout: Duration::from_millis(3_000),
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl GenerationSettings {
    /// Reads LLM_API_URL, LLM_API_KEY, LLM_TIMEOUT_MS, LLM_MAX_RETRIES and
    /// LLM_BASE_DELAY_MS.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env_opt("LLM_API_URL"),
            api_key: env_opt("LLM_API_KEY"),
            timeout: Duration::from_millis(env_or(
                "LLM_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )),
            max_retries: env_or("LLM_MAX_RETRIES", defaults.max_retries),
            base_delay: Duration::from_millis(env_or(
                "LLM_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_url.is_some()
    }
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_millis(60_000),
        }
    }
}

impl RateLimitSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
            window: Duration::from_millis(env_or(
                "RATE_LIMIT_WINDOW_MS",
                defaults.window.as_millis() as u64,
            )),
        }
    }
}

/// HTTP-surface settings: body cap and static asset locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub max_body_bytes: usize,
    pub public_dir: PathBuf,
    pub fbapp_config_path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: 8 * 1024,
            public_dir: PathBuf::from("public"),
            fbapp_config_path: PathBuf::from("fbapp-config.json"),
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            public_dir: env_opt("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            fbapp_config_path: env_opt("FBAPP_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fbapp_config_path),
        }
    }
}

/// Load `.env` (if present) into the process environment. Call before the
/// log subscriber is installed so its own settings come from `.env` too.
pub fn load_env() {
    dotenv::dotenv().ok();
}

/// Everything the gateway needs, loaded in one go at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizConfig {
    pub generation: GenerationSettings,
    pub rate_limit: RateLimitSettings,
    pub server: ServerSettings,
}

impl QuizConfig {
    /// Reads every settings group. Invalid values are reported through `log`,
    /// so install a logger first; see `load_env`.
    pub fn from_env() -> Self {
        Self {
            generation: GenerationSettings::from_env(),
            rate_limit: RateLimitSettings::from_env(),
            server: ServerSettings::from_env(),
        }
    }
}
