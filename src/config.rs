use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub google_api_key: Option<String>,
    pub google_model: String,
    pub google_base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub ai: AiConfig,
    pub revocation_prune_interval_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Unset and blank values are both treated as "not configured".
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl JwtConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env_opt("JWT_SECRET_KEY")
            .or_else(|| env_opt("SECRET_KEY"))
            .context("JWT_SECRET_KEY or SECRET_KEY must be set")?;
        Ok(Self {
            secret,
            issuer: env_or("JWT_ISSUER", "vlearn"),
            audience: env_or("JWT_AUDIENCE", "vlearn-users"),
            ttl_minutes: env_parse("TOKEN_EXPIRES_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
        })
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com"),
            google_api_key: env_opt("GOOGLE_API_KEY"),
            google_model: env_or("GOOGLE_MODEL", "gemini-1.5-flash"),
            google_base_url: env_or(
                "GOOGLE_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            timeout_secs: env_parse("AI_TIMEOUT_SECS", 30),
            max_tokens: env_parse("AI_MAX_TOKENS", 1000),
            temperature: env_parse("AI_TEMPERATURE", 0.7),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            ai: AiConfig::from_env(),
            revocation_prune_interval_secs: env_parse("REVOCATION_PRUNE_INTERVAL_SECS", 3600),
        })
    }
}
