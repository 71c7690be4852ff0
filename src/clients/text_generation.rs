/// OpenAI互換のチャット補完APIを使うテキスト生成クライアント。
///
/// 要約・タイトル・ソリューション分類の生成に使用します。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::retry::{RetryConfig, with_retry};

/// 1回の生成要求。
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Prompt {
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    #[must_use]
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// テキスト生成サービスのインタフェース。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 生成されたテキスト（前後の空白除去済み）を返す。
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// チャット補完クライアントの設定。
#[derive(Debug, Clone)]
pub struct TextGenerationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    retry: RetryConfig,
}

impl ChatCompletionClient {
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(config: TextGenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build text generation HTTP client")?;

        let base_url =
            Url::parse(&config.base_url).context("invalid text generation base URL")?;
        let endpoint = base_url
            .join("v1/chat/completions")
            .context("failed to build chat completions URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            retry: config.retry,
        })
    }

    async fn request_once(&self, prompt: &Prompt) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .context("text generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            // 5xx / 429 の再試行判定のため reqwest::Error を原因として残す。
            let http_error = response.error_for_status_ref().err();
            let error_body = response.text().await.unwrap_or_default();
            let message =
                format!("text generation service returned error status {status}: {error_body}");
            return Err(match http_error {
                Some(error) => anyhow::Error::new(error).context(message),
                None => anyhow::anyhow!(message),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to deserialize chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .context("chat completion response contained no content")?;

        debug!(chars = content.chars().count(), "text generated");
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        with_retry(self.retry, "text_generation", || self.request_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> TextGenerationConfig {
        TextGenerationConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            model: "gpt-4o-mini".to_string(),
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(10),
            retry: RetryConfig::new(3, 1, 5),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test]
    async fn generate_sends_chat_request_with_bearer_token() {
        let server = MockServer::start().await;
        let expected_body = serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "あなたは専門的な要約者です。" },
                { "role": "user", "content": "タイトル: 事例\n\n本文" }
            ],
            "max_tokens": 100,
            "temperature": 0.5
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  要約です \n")))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(server.uri())).unwrap();
        let prompt =
            Prompt::new("あなたは専門的な要約者です。", "タイトル: 事例\n\n本文").with_sampling(100, 0.5);
        let content = client.generate(&prompt).await.unwrap();

        assert_eq!(content, "要約です");
    }

    #[tokio::test]
    async fn generate_retries_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(server.uri())).unwrap();
        let content = client.generate(&Prompt::new("system", "user")).await.unwrap();

        assert_eq!(content, "ok");
    }

    #[tokio::test]
    async fn generate_does_not_retry_client_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(server.uri())).unwrap();
        let error = client
            .generate(&Prompt::new("system", "user"))
            .await
            .unwrap_err();

        assert!(format!("{error:#}").contains("400"));
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(server.uri())).unwrap();
        assert!(client.generate(&Prompt::new("system", "user")).await.is_err());
    }
}
