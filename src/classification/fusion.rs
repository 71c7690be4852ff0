//! 複数シグナルの重み付き融合と最終判定。
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::context::ContextHit;
use super::cooccurrence::CandidateScore;
use super::industry::Industry;
use super::lexicon::LexiconStore;

/// 比較前に丸めるスコアの粒度。
const SCORE_QUANTUM: f64 = 1e-6;

/// 判定に寄与したシグナルの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Context,
    Function,
    Cooccurrence,
    Company,
    Url,
    Prior,
}

/// シグナルごとの重み。文脈ヒットが最も強い。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub context: f64,
    pub function: f64,
    pub cooccurrence: f64,
    pub company: f64,
    pub url: f64,
    pub prior: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            context: 3.0,
            function: 1.5,
            cooccurrence: 2.0,
            company: 2.5,
            url: 1.0,
            prior: 1.0,
        }
    }
}

/// 融合の設定。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    pub weights: SignalWeights,
    /// これ未満の最高スコアはフォールバックになる。
    pub min_score: f64,
    pub fallback: Industry,
    /// 結果に含める上位候補の数。
    pub top_n: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            min_score: 0.7,
            fallback: Industry::Other,
            top_n: 3,
        }
    }
}

/// 融合の入力。各シグナルは独立に計算済み。
#[derive(Debug, Clone, Default)]
pub struct Evidence<'a> {
    pub context: &'a [ContextHit],
    pub functions: Option<&'a BTreeMap<Industry, f64>>,
    pub candidates: &'a [CandidateScore],
    pub company: Option<Industry>,
    pub url: Option<&'a BTreeSet<Industry>>,
    pub prior: Option<Industry>,
}

/// 業種ごとの最終スコア。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndustryScore {
    pub industry: Industry,
    pub score: f64,
    pub direct_hit: bool,
    pub distinct_terms: usize,
    pub signals: Vec<SignalKind>,
    #[serde(skip)]
    contributions: Vec<(SignalKind, f64)>,
}

impl IndustryScore {
    fn quantized(&self) -> i64 {
        quantize(self.score)
    }

    /// 重み付き寄与が最大のシグナル。同値なら宣言順で先のもの。
    #[must_use]
    pub fn dominant_signal(&self) -> Option<SignalKind> {
        self.contributions
            .iter()
            .fold(None::<(SignalKind, i64)>, |best, (kind, value)| {
                let value = quantize(*value);
                match best {
                    Some((_, current)) if current >= value => best,
                    _ => Some((*kind, value)),
                }
            })
            .map(|(kind, _)| kind)
    }
}

/// 融合の判定結果。
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub industry: Industry,
    pub confidence: f64,
    pub score: f64,
    pub fallback: bool,
    pub winner: Option<IndustryScore>,
    pub ranking: Vec<IndustryScore>,
}

#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    #[must_use]
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// 全シグナルを業種ごとに合算して順位付けする。
    #[must_use]
    pub fn rank(&self, store: &LexiconStore, evidence: &Evidence<'_>) -> Vec<IndustryScore> {
        let weights = &self.config.weights;
        let mut scores: Vec<IndustryScore> = Vec::new();

        for industry in store.priority().iter().copied() {
            let mut contributions: Vec<(SignalKind, f64)> = Vec::new();

            let direct_hit = evidence.context.iter().any(|hit| hit.industry == industry);
            if direct_hit {
                contributions.push((SignalKind::Context, weights.context));
            }
            if let Some(value) = evidence
                .functions
                .and_then(|functions| functions.get(&industry))
                .filter(|value| **value > 0.0)
            {
                contributions.push((SignalKind::Function, weights.function * saturate(*value)));
            }
            let candidate = evidence
                .candidates
                .iter()
                .find(|candidate| candidate.industry == industry);
            if let Some(candidate) = candidate.filter(|candidate| candidate.raw_score > 0.0) {
                contributions.push((
                    SignalKind::Cooccurrence,
                    weights.cooccurrence * saturate(candidate.raw_score),
                ));
            }
            if evidence.company == Some(industry) {
                contributions.push((SignalKind::Company, weights.company));
            }
            if evidence.url.is_some_and(|url| url.contains(&industry)) {
                contributions.push((SignalKind::Url, weights.url));
            }
            if evidence.prior == Some(industry) {
                contributions.push((SignalKind::Prior, weights.prior));
            }

            let score: f64 = contributions.iter().map(|(_, value)| value).sum();
            if quantize(score) <= 0 {
                continue;
            }
            scores.push(IndustryScore {
                industry,
                score,
                direct_hit,
                distinct_terms: candidate.map_or(0, CandidateScore::distinct_terms),
                signals: contributions.iter().map(|(kind, _)| *kind).collect(),
                contributions,
            });
        }

        scores.sort_by(|a, b| compare(store, a, b));
        scores
    }

    /// 順位付けし、閾値に満たなければフォールバックする。
    #[must_use]
    pub fn decide(&self, store: &LexiconStore, evidence: &Evidence<'_>) -> Decision {
        let mut ranking = self.rank(store, evidence);
        let total: f64 = ranking.iter().map(|score| score.score).sum();
        let winner = ranking
            .first()
            .filter(|top| top.quantized() >= quantize(self.config.min_score))
            .cloned();
        ranking.truncate(self.config.top_n);

        match winner {
            Some(top) => Decision {
                industry: top.industry,
                confidence: if total > 0.0 { top.score / total } else { 0.0 },
                score: top.score,
                fallback: false,
                winner: Some(top),
                ranking,
            },
            None => Decision {
                industry: self.config.fallback,
                confidence: 0.0,
                score: ranking.first().map_or(0.0, |top| top.score),
                fallback: true,
                winner: None,
                ranking,
            },
        }
    }
}

/// 単調増加で 1 に飽和する。長文での過大評価を抑える。
#[must_use]
pub fn saturate(value: f64) -> f64 {
    if value <= 0.0 { 0.0 } else { value / (value + 1.0) }
}

fn quantize(value: f64) -> i64 {
    (value / SCORE_QUANTUM).round() as i64
}

/// スコア降順、直接ヒット優先、異なり語数降順、優先順位昇順。
fn compare(store: &LexiconStore, a: &IndustryScore, b: &IndustryScore) -> Ordering {
    b.quantized()
        .cmp(&a.quantized())
        .then_with(|| b.direct_hit.cmp(&a.direct_hit))
        .then_with(|| b.distinct_terms.cmp(&a.distinct_terms))
        .then_with(|| store.priority_rank(a.industry).cmp(&store.priority_rank(b.industry)))
}
