use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::{
    api,
    classification::{IndustryClassifier, LexiconStore},
    clients::{ChatCompletionClient, CustomSearchClient},
    config::Config,
    observability::{Metrics, Telemetry},
    pipeline::{CompanyExtractor, Enricher},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    classifier: Arc<IndustryClassifier>,
    enricher: Arc<Enricher>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn classifier(&self) -> Arc<IndustryClassifier> {
        Arc::clone(&self.registry.classifier)
    }

    pub(crate) fn enricher(&self) -> Arc<Enricher> {
        Arc::clone(&self.registry.enricher)
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化、辞書の読み込み、HTTP クライアント構築が失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        Self::with_telemetry(config, telemetry)
    }

    /// 初期化済みの Telemetry を使ってレジストリを構築する。
    ///
    /// # Errors
    /// 辞書の読み込みや HTTP クライアント構築が失敗した場合はエラーを返す。
    pub fn with_telemetry(config: Config, telemetry: Telemetry) -> Result<Self> {
        let config = Arc::new(config);
        let classifier = Arc::new(build_classifier(&config)?);
        let enricher = Arc::new(build_enricher(
            &config,
            Arc::clone(&classifier),
            Some(telemetry.metrics_arc()),
        )?);

        Ok(Self {
            config,
            telemetry,
            classifier,
            enricher,
        })
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn classifier(&self) -> Arc<IndustryClassifier> {
        Arc::clone(&self.classifier)
    }

    #[must_use]
    pub fn enricher(&self) -> Arc<Enricher> {
        Arc::clone(&self.enricher)
    }
}

/// 設定に従って辞書を読み込み、分類器を構築する。
///
/// `CASEBOOK_LEXICON_PATH` が未設定なら組み込み辞書を使う。
///
/// # Errors
/// 辞書の読み込み・検証に失敗した場合はエラーを返す。
pub fn build_classifier(config: &Config) -> Result<IndustryClassifier> {
    let store = match config.lexicon_path() {
        Some(path) => LexiconStore::from_path(path)
            .with_context(|| format!("failed to load lexicon from {}", path.display()))?,
        None => LexiconStore::embedded().context("failed to load embedded lexicon")?,
    };
    let classifier = IndustryClassifier::new(Arc::new(store), config.fusion_config())
        .context("failed to build industry classifier")?;
    info!(
        lexicon = config
            .lexicon_path()
            .map_or_else(|| "embedded".to_string(), |path| path.display().to_string()),
        min_score = classifier.config().min_score,
        "industry classifier ready"
    );
    Ok(classifier)
}

/// 分類器に外部クライアントを組み合わせてエンリッチャーを構築する。
///
/// テキスト生成・企業検索は設定されている場合のみ接続する。
///
/// # Errors
/// 自社名パターンのコンパイルや HTTP クライアント構築に失敗した場合はエラーを返す。
pub fn build_enricher(
    config: &Config,
    classifier: Arc<IndustryClassifier>,
    metrics: Option<Arc<Metrics>>,
) -> Result<Enricher> {
    let companies = CompanyExtractor::new(config.host_company(), config.host_aliases())
        .context("failed to compile host company pattern")?;
    let mut enricher = Enricher::new(classifier, companies, config.enrich_options());

    if let Some(generation) = config.text_generation() {
        let client = ChatCompletionClient::new(generation)
            .context("failed to build text generation client")?;
        enricher = enricher.with_generator(Arc::new(client));
    }
    if let Some(search) = config.search() {
        let client = CustomSearchClient::new(search).context("failed to build search client")?;
        enricher = enricher.with_lookup(Arc::new(client));
    }
    if let Some(metrics) = metrics {
        enricher = enricher.with_metrics(metrics);
    }

    info!(
        summarize = config.enrich_summarize(),
        search = config.search_enabled(),
        concurrency = config.enrich_concurrency().get(),
        "enricher ready"
    );
    Ok(enricher)
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
