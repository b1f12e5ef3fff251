//! OpenAI chat completions backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{status_error, GenerationParams, UpstreamError};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        params: GenerationParams,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            params,
        }
    }

    /// Send one system + user exchange, returning the assistant's raw text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(model = %self.model, "calling openai");
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(UpstreamError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::ai::{AiProviders, ProviderKind};
    use crate::testing::spawn_mock;

    fn params() -> GenerationParams {
        GenerationParams {
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    async fn mock_openai(content: Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(req): Json<Value>| {
                let content = content.clone();
                async move {
                    assert_eq!(headers["authorization"], "Bearer sk-test");
                    assert_eq!(req["model"], "gpt-4o-mini");
                    assert_eq!(req["max_tokens"], 1000);
                    assert_eq!(req["messages"][0]["role"], "system");
                    assert!(req["messages"][1]["content"]
                        .as_str()
                        .unwrap()
                        .starts_with("Topic: binary search"));
                    Json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": content } }]
                    }))
                }
            }),
        );
        spawn_mock(app).await
    }

    fn providers(base: &str) -> AiProviders {
        let p = OpenAiProvider::new(reqwest::Client::new(), base, "sk-test", "gpt-4o-mini", params());
        AiProviders::new(Some(p), None, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn structured_reply_is_returned_verbatim() {
        let reply = json!({
            "component_code": "export default function Search() { return null; }",
            "html_snippet": "<div>bs</div>",
            "explanation": "halves the range"
        })
        .to_string();
        let base = mock_openai(Value::String(reply)).await;

        let r = providers(&base)
            .generate(ProviderKind::OpenAi, "binary search", "")
            .await
            .unwrap();
        assert_eq!(r.html_snippet, "<div>bs</div>");
        assert_eq!(r.explanation, "halves the range");
    }

    #[tokio::test]
    async fn prose_reply_falls_back() {
        let base = mock_openai(Value::String("I cannot do JSON today".into())).await;
        let r = providers(&base)
            .generate(ProviderKind::OpenAi, "binary search", "")
            .await
            .unwrap();
        assert!(r.component_code.contains("I cannot do JSON today"));
        assert!(!r.html_snippet.is_empty());
        assert!(!r.explanation.is_empty());
    }

    #[tokio::test]
    async fn null_content_falls_back() {
        let base = mock_openai(Value::Null).await;
        let r = providers(&base)
            .generate(ProviderKind::OpenAi, "binary search", "")
            .await
            .unwrap();
        assert!(r.component_code.contains("no content"));
    }

    #[tokio::test]
    async fn upstream_error_status_falls_back() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    "rate limited",
                )
            }),
        );
        let base = spawn_mock(app).await;
        let r = providers(&base)
            .generate(ProviderKind::OpenAi, "binary search", "")
            .await
            .unwrap();
        assert!(r.component_code.contains("429"));
    }

    #[tokio::test]
    async fn slow_provider_times_out_into_fallback() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "choices": [] }))
            }),
        );
        let base = spawn_mock(app).await;
        let p = OpenAiProvider::new(reqwest::Client::new(), &base, "sk-test", "gpt-4o-mini", params());
        let providers = AiProviders::new(Some(p), None, Duration::from_millis(200));

        let r = providers
            .generate(ProviderKind::OpenAi, "binary search", "")
            .await
            .unwrap();
        assert!(r.component_code.contains("did not answer"));
    }
}
