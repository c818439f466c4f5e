//! Text generation over OpenAI-compatible `/chat/completions` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::ClientError;

/// Anything that turns a system and user prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ClientError>;
}

/// Chat-completions client in JSON response mode.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::RequestFailed(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<String, ClientError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        extract_content(&resp_json)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_content(body: &serde_json::Value) -> Result<String, ClientError> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ClientError::ParseError("missing choices[0].message.content".into()))?;
    if content.trim().is_empty() {
        return Err(ClientError::EmptyResponse);
    }
    Ok(content.to_string())
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ClientError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(content) => {
                    debug!(
                        model = %self.model,
                        attempt,
                        chars = content.len(),
                        "Completion received"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    warn!(error = %e, attempt, ?backoff, "Completion failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_content() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"home_win\": 0.5}"}}]
        });
        assert_eq!(extract_content(&body).unwrap(), "{\"home_win\": 0.5}");
    }

    #[test]
    fn test_extract_content_errors() {
        assert!(matches!(
            extract_content(&json!({"choices": []})),
            Err(ClientError::ParseError(_))
        ));
        assert!(matches!(
            extract_content(&json!({"choices": [{"message": {"content": "  "}}]})),
            Err(ClientError::EmptyResponse)
        ));
    }

    #[test]
    fn test_endpoint_joins_path() {
        let config = LlmConfig {
            url: "http://localhost:8080/v1/".into(),
            ..LlmConfig::from_lookup(|_| None)
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), config.model);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        let config = LlmConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            max_retries: 0,
            ..LlmConfig::from_lookup(|_| None)
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        let err = client.generate("system", "user").await.unwrap_err();
        assert!(matches!(err, ClientError::RequestFailed(_)));
    }
}
