use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use qualcel_core::config::{LlmConfig, LlmProvider};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client asking for a JSON answer.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gemini http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature,
        })
    }

    /// Builds the client for a config whose provider is enabled.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.provider == LlmProvider::Disabled {
            bail!("llm.provider is disabled");
        }
        let api_key = config.api_key.clone().ok_or_else(|| anyhow!("llm.api_key is not set"))?;
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;

        if !response.status().is_success() {
            bail!("gemini endpoint returned {}", response.status());
        }

        let payload: GenerateContentResponse =
            response.json().await.context("failed to decode gemini response")?;
        payload.first_text().ok_or_else(|| anyhow!("gemini response carried no text part"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use qualcel_core::config::{LlmConfig, LlmProvider};

    use super::{GeminiClient, LlmClient};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve stub");
        });
        format!("http://{address}")
    }

    async fn echo_prompt(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()).unwrap_or_default();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
        let mime = body["generationConfig"]["responseMimeType"].as_str().unwrap_or_default();
        Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": format!("{key}|{mime}|{prompt}") }] }
            }]
        }))
    }

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(
            base_url,
            "gemini-2.5-flash",
            SecretString::from("stub-key".to_string()),
            0.2,
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn complete_posts_prompt_with_key_header() {
        let base_url =
            spawn_stub(Router::new().route("/models/{*call}", post(echo_prompt))).await;

        let text = client(&base_url).complete("oi").await.expect("completion");

        assert_eq!(text, "stub-key|application/json|oi");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base_url = spawn_stub(Router::new().route(
            "/models/{*call}",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        ))
        .await;

        let error = client(&base_url).complete("oi").await.expect_err("429 should fail");
        assert!(error.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let base_url = spawn_stub(Router::new().route(
            "/models/{*call}",
            post(|| async { Json(json!({ "candidates": [] })) }),
        ))
        .await;

        assert!(client(&base_url).complete("oi").await.is_err());
    }

    #[test]
    fn from_config_requires_an_enabled_provider_and_key() {
        let mut config = LlmConfig {
            provider: LlmProvider::Disabled,
            api_key: Some(SecretString::from("key".to_string())),
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 30,
            temperature: 0.2,
        };
        assert!(GeminiClient::from_config(&config).is_err());

        config.provider = LlmProvider::Gemini;
        let client = GeminiClient::from_config(&config).expect("client");
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );

        config.api_key = None;
        let error = GeminiClient::from_config(&config).err().expect("missing key");
        assert!(error.to_string().contains("llm.api_key"));
    }
}
