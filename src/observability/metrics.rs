/// Prometheusメトリクス定義。
use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Counter, Histogram, Registry, register_counter_with_registry,
    register_histogram_with_registry,
};

use crate::classification::ClassificationResult;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub classifications: Counter,
    pub classification_fallbacks: Counter,
    pub records_enriched: Counter,
    pub records_degraded: Counter,
    pub generation_failures: Counter,
    pub lookup_overrides: Counter,
    pub lookup_failures: Counter,

    // ヒストグラム
    pub classification_duration: Histogram,
    pub enrichment_duration: Histogram,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            classifications: register_counter_with_registry!(
                "casebook_classifications_total",
                "Total number of industry classifications",
                registry
            )?,
            classification_fallbacks: register_counter_with_registry!(
                "casebook_classification_fallbacks_total",
                "Classifications that fell back to the default industry",
                registry
            )?,
            records_enriched: register_counter_with_registry!(
                "casebook_records_enriched_total",
                "Total number of listings enriched into service records",
                registry
            )?,
            records_degraded: register_counter_with_registry!(
                "casebook_records_degraded_total",
                "Records where at least one generation step used its fallback value",
                registry
            )?,
            generation_failures: register_counter_with_registry!(
                "casebook_generation_failures_total",
                "Failed calls to the text generation service",
                registry
            )?,
            lookup_overrides: register_counter_with_registry!(
                "casebook_lookup_overrides_total",
                "Industries replaced by the company lookup classification",
                registry
            )?,
            lookup_failures: register_counter_with_registry!(
                "casebook_lookup_failures_total",
                "Failed calls to the company lookup service",
                registry
            )?,
            classification_duration: register_histogram_with_registry!(
                "casebook_classification_duration_seconds",
                "Duration of a single industry classification",
                vec![0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1],
                registry
            )?,
            enrichment_duration: register_histogram_with_registry!(
                "casebook_enrichment_duration_seconds",
                "Duration of enriching one listing, including external calls",
                registry
            )?,
        })
    }

    /// 分類1件分の件数・フォールバック・所要時間を記録する。
    pub fn record_classification(&self, result: &ClassificationResult, elapsed: Duration) {
        self.classifications.inc();
        if result.fallback {
            self.classification_fallbacks.inc();
        }
        self.classification_duration.observe(elapsed.as_secs_f64());
    }
}
