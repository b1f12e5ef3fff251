//! Uniform access to the generative backends.
//!
//! Every provider turns `(prompt, style_guidance)` into a
//! [`VisualizationResult`]. Upstream trouble (HTTP errors, timeouts, replies
//! that are not the requested JSON) never escapes this module: it is folded
//! into a degraded result by [`fallback`]. The only hard error is asking for a
//! provider that has no API key configured.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};

pub mod fallback;
pub mod google;
pub mod openai;
pub mod prompt;

pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

/// Which backend to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Google,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Google => "Google AI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "google" => Ok(ProviderKind::Google),
            other => Err(AppError::Validation(format!(
                "unknown provider {other:?}, expected \"openai\" or \"google\""
            ))),
        }
    }
}

/// The three artifacts every provider must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationResult {
    pub component_code: String,
    pub html_snippet: String,
    pub explanation: String,
}

/// Sampling settings shared by both providers.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Why an upstream call produced no usable text.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("provider returned no content")]
    EmptyResponse,
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Upper bound on how much of an upstream error body is kept.
const ERROR_BODY_LIMIT: usize = 2048;

/// Read at most `limit` bytes of `resp`'s body, stopping early instead of
/// buffering whatever the upstream sends.
pub(crate) async fn read_capped(mut resp: reqwest::Response, limit: usize) -> String {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < limit {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Status error carrying a bounded excerpt of the response body.
pub(crate) async fn status_error(resp: reqwest::Response) -> UpstreamError {
    let status = resp.status();
    let body = read_capped(resp, ERROR_BODY_LIMIT).await;
    UpstreamError::Status { status, body }
}

/// A configured provider, selected by [`ProviderKind`].
#[derive(Debug, Clone, Copy)]
pub enum Provider<'a> {
    OpenAi(&'a OpenAiProvider),
    Google(&'a GoogleProvider),
}

impl Provider<'_> {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Google(_) => ProviderKind::Google,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        match self {
            Provider::OpenAi(p) => p.complete(system, user).await,
            Provider::Google(p) => p.complete(system, user).await,
        }
    }
}

/// All providers the server was configured with.
#[derive(Debug, Clone)]
pub struct AiProviders {
    openai: Option<OpenAiProvider>,
    google: Option<GoogleProvider>,
    timeout: Duration,
}

impl AiProviders {
    pub fn new(
        openai: Option<OpenAiProvider>,
        google: Option<GoogleProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            openai,
            google,
            timeout,
        }
    }

    /// Build providers for every API key present in `cfg`, sharing one HTTP client.
    pub fn from_config(cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vlearn/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let params = GenerationParams {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        };
        let openai = cfg.openai_api_key.as_ref().map(|key| {
            OpenAiProvider::new(
                http.clone(),
                &cfg.openai_base_url,
                key,
                &cfg.openai_model,
                params,
            )
        });
        let google = cfg.google_api_key.as_ref().map(|key| {
            GoogleProvider::new(
                http.clone(),
                &cfg.google_base_url,
                key,
                &cfg.google_model,
                params,
            )
        });
        info!(
            openai = openai.is_some(),
            google = google.is_some(),
            "ai providers configured"
        );
        Ok(Self::new(openai, google, Duration::from_secs(cfg.timeout_secs)))
    }

    /// Resolve `kind` to a configured provider before any network call.
    pub fn select(&self, kind: ProviderKind) -> AppResult<Provider<'_>> {
        let selected = match kind {
            ProviderKind::OpenAi => self.openai.as_ref().map(Provider::OpenAi),
            ProviderKind::Google => self.google.as_ref().map(Provider::Google),
        };
        selected.ok_or_else(|| {
            let var = match kind {
                ProviderKind::OpenAi => "OPENAI_API_KEY",
                ProviderKind::Google => "GOOGLE_API_KEY",
            };
            AppError::ProviderMisconfigured(format!(
                "{} API key not configured ({var})",
                kind.display_name()
            ))
        })
    }

    /// Generate a visualization. Only fails when `kind` is not configured.
    #[instrument(skip(self, prompt, style_guidance), fields(provider = %kind))]
    pub async fn generate(
        &self,
        kind: ProviderKind,
        prompt: &str,
        style_guidance: &str,
    ) -> AppResult<VisualizationResult> {
        let provider = self.select(kind)?;
        let user = prompt::user_instruction(prompt, style_guidance);

        let outcome = tokio::time::timeout(
            self.timeout,
            provider.complete(prompt::SYSTEM_INSTRUCTION, &user),
        )
        .await
        .unwrap_or(Err(UpstreamError::Timeout(self.timeout)));

        let result = match outcome {
            Ok(raw) => match fallback::parse_result(&raw) {
                Some(result) => {
                    info!("provider returned structured output");
                    result
                }
                None => {
                    warn!(raw_len = raw.len(), "provider output was not valid JSON");
                    fallback::unparseable(provider.kind(), prompt, &raw)
                }
            },
            Err(e) => {
                warn!(error = %e, "provider call failed");
                fallback::upstream_failure(provider.kind(), prompt, &e.to_string())
            }
        };
        Ok(result)
    }
}
