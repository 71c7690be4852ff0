use std::{env, net::SocketAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::classification::{FusionConfig, Industry};
use crate::clients::{SearchConfig, TextGenerationConfig};
use crate::pipeline::EnrichOptions;
use crate::util::retry::RetryConfig;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    lexicon_path: Option<PathBuf>,
    min_score: f64,
    fallback_industry: Industry,
    host_company: String,
    host_aliases: Vec<String>,
    enrich_concurrency: NonZeroUsize,
    enrich_summarize: bool,
    text_gen_base_url: String,
    text_gen_api_key: Option<String>,
    text_gen_model: String,
    text_gen_timeout: Duration,
    http_connect_timeout: Duration,
    search_base_url: String,
    search_api_key: Option<String>,
    search_engine_id: Option<String>,
    http_max_retries: NonZeroUsize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    otel_exporter_endpoint: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から設定値を読み込み、検証する。
    ///
    /// 要約生成を有効にした場合は `TEXT_GEN_API_KEY` が、企業検索の API キーを
    /// 設定した場合は `SEARCH_ENGINE_ID` が必須になる。
    ///
    /// # Errors
    /// 必須の環境変数が未設定、もしくは各種値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("CASEBOOK_HTTP_BIND", "0.0.0.0:9010")?;
        let lexicon_path = optional_var("CASEBOOK_LEXICON_PATH").map(PathBuf::from);

        // Classification settings
        let min_score = parse_f64("CASEBOOK_MIN_SCORE", 0.7)?;
        if !min_score.is_finite() || min_score < 0.0 {
            return Err(ConfigError::Invalid {
                name: "CASEBOOK_MIN_SCORE",
                source: anyhow::anyhow!("must be a non-negative finite number"),
            });
        }
        let fallback_industry = parse_industry("CASEBOOK_FALLBACK_INDUSTRY", Industry::Other)?;

        // Enrichment settings
        let host_company = env::var("CASEBOOK_HOST_COMPANY")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let host_aliases = parse_csv("CASEBOOK_HOST_ALIASES", "");
        let enrich_concurrency = parse_non_zero_usize("ENRICH_CONCURRENCY", 4)?;
        let enrich_summarize = parse_bool("ENRICH_SUMMARIZE", false)?;

        // External services
        let text_gen_base_url = env::var("TEXT_GEN_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/".to_string());
        let text_gen_api_key = optional_var("TEXT_GEN_API_KEY");
        if enrich_summarize && text_gen_api_key.is_none() {
            return Err(ConfigError::Missing("TEXT_GEN_API_KEY"));
        }
        let text_gen_model =
            env::var("TEXT_GEN_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let text_gen_timeout = parse_duration_ms("TEXT_GEN_TIMEOUT_MS", 60_000)?;
        let http_connect_timeout = parse_duration_ms("HTTP_CONNECT_TIMEOUT_MS", 3_000)?;
        let search_base_url = env::var("SEARCH_BASE_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/".to_string());
        let search_api_key = optional_var("SEARCH_API_KEY");
        let search_engine_id = optional_var("SEARCH_ENGINE_ID");
        if search_api_key.is_some() && search_engine_id.is_none() {
            return Err(ConfigError::Missing("SEARCH_ENGINE_ID"));
        }

        // Retry settings (exponential backoff + jitter)
        let http_max_retries = parse_non_zero_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10_000)?;

        let otel_exporter_endpoint = optional_var("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            http_bind,
            lexicon_path,
            min_score,
            fallback_industry,
            host_company,
            host_aliases,
            enrich_concurrency,
            enrich_summarize,
            text_gen_base_url,
            text_gen_api_key,
            text_gen_model,
            text_gen_timeout,
            http_connect_timeout,
            search_base_url,
            search_api_key,
            search_engine_id,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            otel_exporter_endpoint,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn lexicon_path(&self) -> Option<&PathBuf> {
        self.lexicon_path.as_ref()
    }

    #[must_use]
    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    #[must_use]
    pub fn fallback_industry(&self) -> Industry {
        self.fallback_industry
    }

    #[must_use]
    pub fn host_company(&self) -> &str {
        &self.host_company
    }

    #[must_use]
    pub fn host_aliases(&self) -> &[String] {
        &self.host_aliases
    }

    #[must_use]
    pub fn enrich_concurrency(&self) -> NonZeroUsize {
        self.enrich_concurrency
    }

    #[must_use]
    pub fn enrich_summarize(&self) -> bool {
        self.enrich_summarize
    }

    #[must_use]
    pub fn text_gen_base_url(&self) -> &str {
        &self.text_gen_base_url
    }

    #[must_use]
    pub fn text_gen_model(&self) -> &str {
        &self.text_gen_model
    }

    #[must_use]
    pub fn text_gen_timeout(&self) -> Duration {
        self.text_gen_timeout
    }

    #[must_use]
    pub fn search_base_url(&self) -> &str {
        &self.search_base_url
    }

    #[must_use]
    pub fn search_enabled(&self) -> bool {
        self.search_api_key.is_some()
    }

    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries.get()
    }

    #[must_use]
    pub fn otel_exporter_endpoint(&self) -> Option<&str> {
        self.otel_exporter_endpoint.as_deref()
    }

    /// 要約生成を無効にした設定を返す（バッチ実行時の上書き用）。
    #[must_use]
    pub fn without_summarize(mut self) -> Self {
        self.enrich_summarize = false;
        self
    }

    /// 融合エンジンの設定。重みは既定値のまま閾値とフォールバックだけを差し替える。
    #[must_use]
    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            min_score: self.min_score,
            fallback: self.fallback_industry,
            ..FusionConfig::default()
        }
    }

    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.http_max_retries.get(),
            self.http_backoff_base_ms,
            self.http_backoff_cap_ms,
        )
    }

    #[must_use]
    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            summarize: self.enrich_summarize,
            concurrency: self.enrich_concurrency,
        }
    }

    /// 要約生成が有効なときだけテキスト生成クライアントの設定を返す。
    #[must_use]
    pub fn text_generation(&self) -> Option<TextGenerationConfig> {
        if !self.enrich_summarize {
            return None;
        }
        Some(TextGenerationConfig {
            base_url: self.text_gen_base_url.clone(),
            api_key: self.text_gen_api_key.clone(),
            model: self.text_gen_model.clone(),
            connect_timeout: self.http_connect_timeout,
            total_timeout: self.text_gen_timeout,
            retry: self.retry_config(),
        })
    }

    /// API キーと検索エンジン ID が揃っているときだけ企業検索の設定を返す。
    #[must_use]
    pub fn search(&self) -> Option<SearchConfig> {
        let (api_key, engine_id) = self
            .search_api_key
            .as_ref()
            .zip(self.search_engine_id.as_ref())?;
        Some(SearchConfig {
            base_url: self.search_base_url.clone(),
            api_key: api_key.clone(),
            engine_id: engine_id.clone(),
            connect_timeout: self.http_connect_timeout,
            total_timeout: self.text_gen_timeout,
            retry: self.retry_config(),
        })
    }
}

fn optional_var(name: &'static str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_industry(name: &'static str, default: Industry) -> Result<Industry, ConfigError> {
    let Some(raw) = optional_var(name) else {
        return Ok(default);
    };
    Industry::from_alias(&raw).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("unknown industry: {raw}"),
    })
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    parse_u64(name, default_ms).map(Duration::from_millis)
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
