use diagnosis_service::GeminiConfig;
use error_common::{CopilotError, Result};
use std::time::Duration;
use voice_recognition_service::AssemblyAiConfig;

pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const DEFAULT_JWT_TTL_SECONDS: i64 = 8 * 3600;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ANONYMOUS_USER_EMAIL: &str = "demo@clinical-copilot.local";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Server configuration, loaded from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` only in in-memory mode
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    /// Requests without a valid token act as the demo user
    pub allow_anonymous: bool,
    pub anonymous_user_email: String,
    pub assemblyai: AssemblyAiConfig,
    /// `None` disables diagnosis enrichment
    pub gemini: Option<GeminiConfig>,
    pub query_cache_ttl: Duration,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables. `DATABASE_URL` may be
    /// absent when the server runs against in-memory storage.
    pub fn from_env(in_memory: bool) -> Result<Self> {
        let database_url = non_empty_var("DATABASE_URL");
        if database_url.is_none() && !in_memory {
            return Err(CopilotError::config(
                "DATABASE_URL is not set (use --in-memory to run without Postgres)",
            ));
        }

        let jwt_secret = non_empty_var("JWT_SECRET")
            .ok_or_else(|| CopilotError::config("JWT_SECRET is not set"))?;
        validate_jwt_secret(&jwt_secret)?;

        let assemblyai =
            AssemblyAiConfig::from_env().map_err(|e| CopilotError::config(e.to_string()))?;
        let gemini = GeminiConfig::from_env().map_err(|e| CopilotError::config(e.to_string()))?;

        Ok(Self {
            database_url,
            database_max_connections: parsed_var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            jwt_secret,
            jwt_ttl_seconds: parsed_var("JWT_TTL_SECONDS").unwrap_or(DEFAULT_JWT_TTL_SECONDS),
            allow_anonymous: parsed_var("ALLOW_ANONYMOUS").unwrap_or(false),
            anonymous_user_email: non_empty_var("ANONYMOUS_USER_EMAIL")
                .unwrap_or_else(|| DEFAULT_ANONYMOUS_USER_EMAIL.to_string()),
            assemblyai,
            gemini,
            query_cache_ttl: parsed_var("QUERY_CACHE_TTL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(database_layer::DEFAULT_TTL),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            cors_allowed_origins: non_empty_var("CORS_ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()),
        })
    }
}

pub fn validate_jwt_secret(secret: &str) -> Result<()> {
    if secret.len() < MIN_JWT_SECRET_BYTES {
        return Err(CopilotError::config(format!(
            "JWT_SECRET must be at least {} bytes",
            MIN_JWT_SECRET_BYTES
        )));
    }
    Ok(())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
