/// 企業名から業種の説明テキストを検索するクライアント（Google Custom Search）。
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::util::retry::{RetryConfig, with_retry};
use crate::util::text::preview;

/// 企業名の検索結果テキストを返すサービス。
#[async_trait]
pub trait CompanyLookup: Send + Sync {
    /// 見つからない場合は空文字列を返す。
    async fn lookup(&self, company: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: String,
    pub engine_id: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub retry: RetryConfig,
}

#[derive(Debug)]
pub struct CustomSearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    engine_id: String,
    retry: RetryConfig,
    rate_limited: AtomicBool,
}

impl CustomSearchClient {
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build search HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid search base URL")?;
        let endpoint = base_url
            .join("customsearch/v1")
            .context("failed to build custom search URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            engine_id: config.engine_id,
            retry: config.retry,
            rate_limited: AtomicBool::new(false),
        })
    }

    /// 一度 403 を受け取ると、以降の呼び出しは送信せずに失敗する。
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::Relaxed)
    }

    async fn search_once(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", "5"),
                ("lr", "lang_ja"),
                ("gl", "jp"),
            ])
            .send()
            .await
            .context("custom search request failed")?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            self.rate_limited.store(true, Ordering::Relaxed);
            let error_body = response.text().await.unwrap_or_default();
            error!(body = %preview(&error_body, 200), "custom search quota exhausted");
            anyhow::bail!("custom search rate limit reached");
        }
        if !status.is_success() {
            let http_error = response.error_for_status_ref().err();
            let error_body = response.text().await.unwrap_or_default();
            let message = format!("custom search returned error status {status}: {error_body}");
            return Err(match http_error {
                Some(error) => anyhow::Error::new(error).context(message),
                None => anyhow::anyhow!(message),
            });
        }

        let payload: SearchResponse = response
            .json()
            .await
            .context("failed to deserialize custom search response")?;

        let text = payload
            .items
            .into_iter()
            .flat_map(|item| [item.title, item.snippet])
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Ok(text)
    }
}

#[async_trait]
impl CompanyLookup for CustomSearchClient {
    async fn lookup(&self, company: &str) -> Result<String> {
        if self.is_rate_limited() {
            anyhow::bail!("custom search rate limit reached");
        }

        let query = format!("{company} 業種 業界 セクター 事業内容");
        let text = with_retry(self.retry, "company_lookup", || self.search_once(&query)).await?;
        if text.is_empty() {
            warn!(company, "no search results for company");
        } else {
            debug!(company, result = %preview(&text, 100), "company search completed");
        }
        Ok(text)
    }
}
