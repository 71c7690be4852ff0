//! 掲載1件をサービスレコードへ変換する。
//!
//! 外部サービス（テキスト生成・企業検索）の失敗はレコード単位の既定値に置き換え、
//! バッチ全体を止めない。
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::classification::{ClassificationHints, ClassificationResult, IndustryClassifier};
use crate::clients::{CompanyLookup, TextGenerator};
use crate::observability::metrics::Metrics;
use crate::util::text::preview;

use super::company::CompanyExtractor;
use super::listing::{RawListing, ServiceRecord};
use super::prompts::{solution_prompt, summary_prompt, title_prompt};
use super::solution::SolutionCategory;

/// 要約生成に失敗したときに記録する文言。
pub const SUMMARY_FAILED: &str = "要約の生成に失敗しました";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    /// 要約・タイトル・ソリューション分類を生成するか。
    pub summarize: bool,
    /// 同時に処理する掲載数。
    pub concurrency: NonZeroUsize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            summarize: true,
            concurrency: NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// 生成結果。失敗した項目は既定値になっている。
#[derive(Debug, Clone, PartialEq)]
struct Generated {
    title: Option<String>,
    summary: String,
    solution: SolutionCategory,
    degraded: bool,
}

pub struct Enricher {
    classifier: Arc<IndustryClassifier>,
    companies: CompanyExtractor,
    generator: Option<Arc<dyn TextGenerator>>,
    lookup: Option<Arc<dyn CompanyLookup>>,
    metrics: Option<Arc<Metrics>>,
    options: EnrichOptions,
}

impl Enricher {
    #[must_use]
    pub fn new(
        classifier: Arc<IndustryClassifier>,
        companies: CompanyExtractor,
        options: EnrichOptions,
    ) -> Self {
        Self {
            classifier,
            companies,
            generator: None,
            lookup: None,
            metrics: None,
            options,
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn CompanyLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn options(&self) -> EnrichOptions {
        self.options
    }

    /// 掲載1件を処理する。
    #[instrument(skip_all, fields(url = %listing.url))]
    pub async fn enrich(&self, listing: &RawListing) -> ServiceRecord {
        let started = Instant::now();

        let generated = match (&self.generator, self.options.summarize) {
            (Some(generator), true) => Some(self.generate(generator.as_ref(), listing).await),
            _ => None,
        };
        let title = generated
            .as_ref()
            .and_then(|generated| generated.title.clone())
            .unwrap_or_else(|| listing.title.clone());

        let company = listing
            .company
            .clone()
            .or_else(|| self.companies.extract(&title))
            .unwrap_or_else(|| self.companies.host_company().to_string());

        let mut result = self.classify(listing, &company);
        if let Some(overridden) = self.classify_by_lookup(&company).await {
            info!(
                company = %company,
                from = %result.industry,
                to = %overridden.industry,
                "industry replaced by company lookup"
            );
            result = overridden;
        }

        if let Some(metrics) = &self.metrics {
            metrics.records_enriched.inc();
            if generated.as_ref().is_some_and(|generated| generated.degraded) {
                metrics.records_degraded.inc();
            }
            metrics
                .enrichment_duration
                .observe(started.elapsed().as_secs_f64());
        }

        let (summary, solution) = match generated {
            Some(generated) => (Some(generated.summary), Some(generated.solution)),
            None => (None, None),
        };
        ServiceRecord {
            title,
            url: listing.url.clone(),
            company,
            industry: result.industry,
            confidence: result.confidence,
            solution,
            summary,
        }
    }

    /// 全件を並行処理する。結果は入力順。
    pub async fn enrich_all(&self, listings: &[RawListing]) -> Vec<ServiceRecord> {
        info!(
            count = listings.len(),
            concurrency = self.options.concurrency.get(),
            "enriching listings"
        );
        stream::iter(listings.iter().cloned())
            .map(|listing| async move { self.enrich(&listing).await })
            .buffered(self.options.concurrency.get())
            .collect()
            .await
    }

    async fn generate(&self, generator: &dyn TextGenerator, listing: &RawListing) -> Generated {
        let mut degraded = false;

        let summary = match generator
            .generate(&summary_prompt(&listing.title, &listing.content))
            .await
        {
            Ok(summary) => {
                debug!(summary = %preview(&summary, 50), "summary generated");
                summary
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "summary generation failed");
                self.record_generation_failure();
                degraded = true;
                SUMMARY_FAILED.to_string()
            }
        };

        let solution = match generator
            .generate(&solution_prompt(&listing.title, &summary, &listing.content))
            .await
        {
            Ok(response) => SolutionCategory::parse_response(&response),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "solution classification failed");
                self.record_generation_failure();
                degraded = true;
                SolutionCategory::Other
            }
        };

        let title = match generator.generate(&title_prompt(&summary)).await {
            Ok(title) => Some(title),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "title generation failed");
                self.record_generation_failure();
                degraded = true;
                None
            }
        };

        Generated {
            title,
            summary,
            solution,
            degraded,
        }
    }

    fn classify(&self, listing: &RawListing, company: &str) -> ClassificationResult {
        let hints = ClassificationHints {
            company: Some(company.to_string()),
            url: Some(listing.url.clone()),
            ..ClassificationHints::default()
        };
        let text = format!("{}\n{}", listing.title, listing.content);
        self.classify_text(&text, &hints)
    }

    fn classify_text(&self, text: &str, hints: &ClassificationHints) -> ClassificationResult {
        let started = Instant::now();
        let result = self.classifier.classify(text, Some(hints));
        if let Some(metrics) = &self.metrics {
            metrics.record_classification(&result, started.elapsed());
        }
        result
    }

    /// 企業検索の結果で分類し直す。掲載元自身、検索失敗、フォールバックは `None`。
    async fn classify_by_lookup(&self, company: &str) -> Option<ClassificationResult> {
        let lookup = self.lookup.as_ref()?;
        if self.companies.is_host(company) {
            return None;
        }

        let text = match lookup.lookup(company).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return None,
            Err(error) => {
                warn!(company, error = %format!("{error:#}"), "company lookup failed");
                if let Some(metrics) = &self.metrics {
                    metrics.lookup_failures.inc();
                }
                return None;
            }
        };

        let hints = ClassificationHints {
            company: Some(company.to_string()),
            ..ClassificationHints::default()
        };
        let result = self.classify_text(&text, &hints);
        if result.fallback {
            return None;
        }
        if let Some(metrics) = &self.metrics {
            metrics.lookup_overrides.inc();
        }
        Some(result)
    }

    fn record_generation_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.generation_failures.inc();
        }
    }
}
