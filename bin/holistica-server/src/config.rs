//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for holistica-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set (the AI key being the exception:
/// without `HOLISTICA_AI_API_KEY` the real responder will be rejected by
/// the upstream API, so development setups usually set
/// `HOLISTICA_AI_USE_MOCK=1`).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://holistica.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve the Swagger UI at `/swagger-ui` (default: `true`).
    pub enable_swagger: bool,

    /// Comma-separated list of allowed CORS origins. `None` allows any
    /// origin, which suits local development with the web frontend.
    pub cors_allowed_origins: Option<String>,

    /// Chat-completions endpoint of the AI provider.
    pub ai_api_url: String,

    /// API key sent as a bearer token to the AI provider.
    pub ai_api_key: String,

    /// Model identifier requested from the AI provider.
    pub ai_model: String,

    /// Per-request timeout for AI calls, in seconds.
    pub ai_timeout_secs: u64,

    /// Use the deterministic mock responder instead of the real API.
    pub ai_use_mock: bool,

    /// Lifetime of issued auth tokens, in hours (default: 720 = 30 days).
    pub token_ttl_hours: i64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("HOLISTICA_BIND", "0.0.0.0:8000"),
            database_url: env_or("HOLISTICA_DATABASE_URL", "sqlite://holistica.db"),
            log_level: env_or("HOLISTICA_LOG", "info"),
            log_json: env_flag("HOLISTICA_LOG_JSON", false),
            enable_swagger: env_flag("HOLISTICA_ENABLE_SWAGGER", true),
            cors_allowed_origins: std::env::var("HOLISTICA_CORS_ORIGINS").ok(),
            ai_api_url: env_or(
                "HOLISTICA_AI_API_URL",
                "https://api.openai.com/v1/chat/completions",
            ),
            ai_api_key: env_or("HOLISTICA_AI_API_KEY", ""),
            ai_model: env_or("HOLISTICA_AI_MODEL", "gpt-4o-mini"),
            ai_timeout_secs: parse_env("HOLISTICA_AI_TIMEOUT_SECS", 30),
            ai_use_mock: env_flag("HOLISTICA_AI_USE_MOCK", false),
            token_ttl_hours: parse_env("HOLISTICA_TOKEN_TTL_HOURS", 720),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
