//! インダストリー分類エンジンの高水準API。
//!
//! 文脈抽出・機能写像・共起採点を独立に実行し、否定フィルタを通した後に融合する。
//! 分類器は読み取り専用の辞書だけを参照するため、スレッド間で共有できる。
use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub mod context;
pub mod cooccurrence;
pub mod function;
pub mod fusion;
pub mod industry;
pub mod lexicon;
pub mod negation;
pub(crate) mod normalize;
mod signals;

pub use context::{ContextExtractor, ContextHit, ContextRule};
pub use cooccurrence::{CandidateScore, CooccurrenceScorer, TermOccurrence};
pub use function::{FunctionMapper, FunctionScores};
pub use fusion::{Decision, Evidence, FusionConfig, FusionEngine, IndustryScore, SignalKind, SignalWeights};
pub use industry::{Industry, UnknownIndustry};
pub use lexicon::{
    load_lexicon, KeywordSection, LexiconDocument, LexiconError, LexiconSource, LexiconStore,
    EMBEDDED_LEXICON,
};
pub use negation::NegationFilter;

use normalize::normalize_text;

/// 本文以外の任意ヒント。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationHints {
    /// 既知のサービス機能キーワード。
    pub functions: Vec<String>,
    /// 事前の部分的な分類（旧分類名も可）。
    pub prior: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
}

/// 分類の入力。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationInput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub hints: ClassificationHints,
}

impl ClassificationInput {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: ClassificationHints::default(),
        }
    }

    #[must_use]
    pub fn with_hints(mut self, hints: ClassificationHints) -> Self {
        self.hints = hints;
        self
    }
}

/// 分類結果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub industry: Industry,
    /// 勝者スコア / 正のスコアの総和。フォールバック時は 0。
    pub confidence: f64,
    /// 勝者（フォールバック時は最上位候補）の融合スコア。
    pub score: f64,
    pub fallback: bool,
    pub dominant_signal: Option<SignalKind>,
    pub contributing_signals: Vec<SignalKind>,
    pub matched_terms: Vec<String>,
    /// 否定・除外で取り除かれた語（全業種分）。
    pub negated_terms: BTreeSet<String>,
    pub direct_hits: Vec<ContextHit>,
    pub ranking: Vec<IndustryScore>,
}

/// インダストリー分類器。
#[derive(Debug)]
pub struct IndustryClassifier {
    store: Arc<LexiconStore>,
    context: ContextExtractor,
    functions: FunctionMapper,
    cooccurrence: CooccurrenceScorer,
    negation: NegationFilter,
    fusion: FusionEngine,
}

impl IndustryClassifier {
    pub fn new(store: Arc<LexiconStore>, config: FusionConfig) -> Result<Self, LexiconError> {
        Ok(Self {
            context: ContextExtractor::new(Arc::clone(&store))?,
            functions: FunctionMapper::new(Arc::clone(&store)),
            cooccurrence: CooccurrenceScorer::new(Arc::clone(&store)),
            negation: NegationFilter::new(Arc::clone(&store)),
            fusion: FusionEngine::new(config),
            store,
        })
    }

    /// 埋め込み辞書と既定設定で構築する。
    pub fn with_embedded_lexicon() -> Result<Self, LexiconError> {
        Self::new(Arc::new(LexiconStore::embedded()?), FusionConfig::default())
    }

    #[must_use]
    pub fn store(&self) -> &Arc<LexiconStore> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &FusionConfig {
        self.fusion.config()
    }

    /// テキストを分類する。空のテキストはフォールバックになり、エラーにはならない。
    #[must_use]
    pub fn classify(&self, text: &str, hints: Option<&ClassificationHints>) -> ClassificationResult {
        let default_hints = ClassificationHints::default();
        let hints = hints.unwrap_or(&default_hints);
        let normalized = normalize_text(text);

        let direct_hits = self.context.extract(&normalized);
        let function_scores = self.functions.score(&normalized, &hints.functions);
        let candidates = self
            .negation
            .apply(&normalized, self.cooccurrence.score(&normalized));

        let company = hints
            .company
            .as_deref()
            .and_then(|company| signals::company_signal(&self.store, company));
        let url = hints
            .url
            .as_deref()
            .map(|url| signals::url_signal(&self.store, url));
        let prior = hints.prior.as_deref().and_then(|raw| {
            let resolved = Industry::from_alias(raw).filter(|industry| industry.is_category());
            if resolved.is_none() {
                tracing::debug!(prior = %raw, "prior hint does not name a category");
            }
            resolved
        });

        let decision = self.fusion.decide(
            &self.store,
            &Evidence {
                context: &direct_hits,
                functions: Some(&function_scores.weights),
                candidates: &candidates,
                company,
                url: url.as_ref(),
                prior,
            },
        );

        let result = build_result(decision, candidates, direct_hits);
        tracing::debug!(
            industry = %result.industry,
            confidence = result.confidence,
            fallback = result.fallback,
            "industry classified"
        );
        result
    }

    #[must_use]
    pub fn classify_input(&self, input: &ClassificationInput) -> ClassificationResult {
        self.classify(&input.text, Some(&input.hints))
    }

    /// 入力ごとに独立なので並列に分類する。結果は入力順。
    #[must_use]
    pub fn classify_batch(&self, inputs: &[ClassificationInput]) -> Vec<ClassificationResult> {
        inputs
            .par_iter()
            .map(|input| self.classify_input(input))
            .collect()
    }
}

fn build_result(
    decision: Decision,
    candidates: Vec<CandidateScore>,
    direct_hits: Vec<ContextHit>,
) -> ClassificationResult {
    let negated_terms: BTreeSet<String> = candidates
        .iter()
        .flat_map(|candidate| candidate.negated_terms.iter().cloned())
        .collect();
    match decision.winner {
        Some(winner) => {
            let matched_terms = candidates
                .into_iter()
                .find(|candidate| candidate.industry == winner.industry)
                .map(|candidate| candidate.matched_terms)
                .unwrap_or_default();
            ClassificationResult {
                industry: decision.industry,
                confidence: decision.confidence,
                score: decision.score,
                fallback: false,
                dominant_signal: winner.dominant_signal(),
                contributing_signals: winner.signals.clone(),
                matched_terms,
                negated_terms,
                direct_hits,
                ranking: decision.ranking,
            }
        }
        None => ClassificationResult {
            industry: decision.industry,
            confidence: 0.0,
            score: decision.score,
            fallback: true,
            dominant_signal: None,
            contributing_signals: Vec::new(),
            matched_terms: Vec::new(),
            negated_terms,
            direct_hits,
            ranking: decision.ranking,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IndustryClassifier {
        IndustryClassifier::with_embedded_lexicon().unwrap()
    }

    #[test]
    fn empty_text_falls_back_without_error() {
        let result = classifier().classify("", None);
        assert!(result.fallback);
        assert_eq!(result.industry, Industry::Other);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn company_hint_alone_can_decide() {
        let hints = ClassificationHints {
            company: Some("中部電力".to_string()),
            ..ClassificationHints::default()
        };
        let result = classifier().classify("業務改革の事例", Some(&hints));
        assert_eq!(result.industry, Industry::EnergyResources);
        assert_eq!(result.dominant_signal, Some(SignalKind::Company));
    }

    #[test]
    fn prior_hint_accepts_legacy_labels() {
        let hints = ClassificationHints {
            prior: Some("製造業".to_string()),
            ..ClassificationHints::default()
        };
        let result = classifier().classify("", Some(&hints));
        assert_eq!(result.industry, Industry::IndustrialMachinery);
        assert_eq!(result.contributing_signals, vec![SignalKind::Prior]);
    }

    #[test]
    fn batch_preserves_input_order() {
        let inputs = vec![
            ClassificationInput::new("保険業界向けソリューション"),
            ClassificationInput::new("システムの導入支援サービス"),
            ClassificationInput::new("銀行向けの勘定系"),
        ];
        let results = classifier().classify_batch(&inputs);
        let industries: Vec<Industry> = results.iter().map(|result| result.industry).collect();
        assert_eq!(
            industries,
            vec![Industry::Insurance, Industry::Other, Industry::BankingSecurities]
        );
    }
}
