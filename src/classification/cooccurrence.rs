//! 辞書キーワードの共起スコアリング。
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use super::industry::Industry;
use super::lexicon::LexiconStore;

/// 1 回のキーワード出現。オフセットは正規化済みテキスト上のバイト位置。
#[derive(Debug, Clone, PartialEq)]
pub struct TermOccurrence {
    pub term: String,
    pub weight: f64,
    pub start: usize,
    pub end: usize,
}

/// 業種ごとの集計。分類呼び出しごとに新しく作られる。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub industry: Industry,
    pub raw_score: f64,
    /// 初出順。
    pub matched_terms: Vec<String>,
    pub negated_terms: BTreeSet<String>,
    #[serde(skip)]
    pub occurrences: Vec<TermOccurrence>,
}

impl CandidateScore {
    #[must_use]
    pub fn new(industry: Industry) -> Self {
        Self {
            industry,
            raw_score: 0.0,
            matched_terms: Vec::new(),
            negated_terms: BTreeSet::new(),
            occurrences: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, occurrence: TermOccurrence) {
        self.raw_score += occurrence.weight;
        if !self.matched_terms.contains(&occurrence.term) {
            self.matched_terms.push(occurrence.term.clone());
        }
        self.occurrences.push(occurrence);
    }

    /// 残っている出現から `matched_terms` を作り直す。
    pub(crate) fn refresh_matched_terms(&mut self) {
        let mut ordered: Vec<&TermOccurrence> = self.occurrences.iter().collect();
        ordered.sort_by_key(|occurrence| occurrence.start);
        let mut terms: Vec<String> = Vec::new();
        for occurrence in ordered {
            if !terms.contains(&occurrence.term) {
                terms.push(occurrence.term.clone());
            }
        }
        self.matched_terms = terms;
    }

    #[must_use]
    pub fn distinct_terms(&self) -> usize {
        self.matched_terms.len()
    }
}

/// 辞書のキーワードに対する重み付き出現数で業種を採点する。
///
/// スコアは `Σ 重み × 出現回数`。加算のみなので走査順に依存しない。
/// 長文バイアスの抑制は融合側の飽和関数で行う。
#[derive(Debug, Clone)]
pub struct CooccurrenceScorer {
    store: Arc<LexiconStore>,
}

impl CooccurrenceScorer {
    #[must_use]
    pub fn new(store: Arc<LexiconStore>) -> Self {
        Self { store }
    }

    /// 正規化済みテキストを採点する。ヒットのあった業種のみ、正準順で返す。
    #[must_use]
    pub fn score(&self, normalized_text: &str) -> Vec<CandidateScore> {
        let mut candidates: BTreeMap<Industry, CandidateScore> = BTreeMap::new();
        for hit in self.store.keywords().find_all(normalized_text) {
            for target in hit.targets {
                candidates
                    .entry(target.industry)
                    .or_insert_with(|| CandidateScore::new(target.industry))
                    .record(TermOccurrence {
                        term: hit.term.to_string(),
                        weight: target.weight,
                        start: hit.start,
                        end: hit.end,
                    });
            }
        }
        candidates.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::normalize::normalize_text;

    fn scorer() -> CooccurrenceScorer {
        CooccurrenceScorer::new(Arc::new(LexiconStore::embedded().unwrap()))
    }

    fn score_of(candidates: &[CandidateScore], industry: Industry) -> f64 {
        candidates
            .iter()
            .find(|candidate| candidate.industry == industry)
            .map_or(0.0, |candidate| candidate.raw_score)
    }

    #[test]
    fn sums_weight_times_occurrences() {
        let candidates = scorer().score(&normalize_text("物流センターと物流倉庫"));
        // 物流 1.5 × 2 + 倉庫 1.0
        assert!((score_of(&candidates, Industry::TransportLogistics) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn matched_terms_follow_first_occurrence() {
        let candidates = scorer().score(&normalize_text("損保と生命保険"));
        let insurance = candidates
            .iter()
            .find(|candidate| candidate.industry == Industry::Insurance)
            .unwrap();
        assert_eq!(insurance.matched_terms, vec!["損保", "生命保険", "保険"]);
    }

    #[test]
    fn adding_an_occurrence_never_decreases_the_score() {
        let once = scorer().score(&normalize_text("病院の受付"));
        let twice = scorer().score(&normalize_text("病院の受付と病院の会計"));
        assert!(
            score_of(&twice, Industry::HealthcareLifeScience)
                >= score_of(&once, Industry::HealthcareLifeScience)
        );
    }

    #[test]
    fn text_without_keywords_yields_no_candidates() {
        assert!(scorer().score(&normalize_text("システムの導入支援サービス")).is_empty());
    }
}
