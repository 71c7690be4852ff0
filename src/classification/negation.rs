//! 否定マーカーと除外パターンによる証拠の除去。
//!
//! 窓は正規化済みテキストの文字数で測る。否定された出現は寄与を完全に取り除く。
//! 後置マーカーの探索は次のキーワード出現の手前で止め、並列した語の後ろの
//! マーカーが前の語まで打ち消さないようにする。
use std::ops::Range;
use std::sync::Arc;

use super::cooccurrence::CandidateScore;
use super::industry::Industry;
use super::lexicon::{LexiconStore, MarkerDirection, NegationMarker};
use super::normalize::accepts_match;

#[derive(Debug, Clone)]
pub struct NegationFilter {
    store: Arc<LexiconStore>,
}

impl NegationFilter {
    #[must_use]
    pub fn new(store: Arc<LexiconStore>) -> Self {
        Self { store }
    }

    /// `start..end` の出現が否定マーカーまたは業種の除外パターンで無効化されるか。
    #[must_use]
    pub fn is_negated(&self, text: &str, industry: Industry, start: usize, end: usize) -> bool {
        let spans = self.keyword_spans(text);
        self.is_negated_within(&spans, text, industry, start, end)
    }

    /// 窓内に否定マーカーがあるか。
    #[must_use]
    pub fn marker_negates(&self, text: &str, start: usize, end: usize) -> bool {
        let spans = self.keyword_spans(text);
        self.marker_negates_within(&spans, text, start, end)
    }

    fn is_negated_within(
        &self,
        spans: &[Range<usize>],
        text: &str,
        industry: Industry,
        start: usize,
        end: usize,
    ) -> bool {
        self.marker_negates_within(spans, text, start, end)
            || self.excluded(text, industry, start, end)
    }

    fn marker_negates_within(
        &self,
        spans: &[Range<usize>],
        text: &str,
        start: usize,
        end: usize,
    ) -> bool {
        let limit = following_scope_end(spans, start, end, text.len());
        self.store
            .negation_markers()
            .iter()
            .any(|marker| match marker.direction {
                MarkerDirection::Following => following_marker(text, end, limit, marker),
                MarkerDirection::Preceding => preceding_marker(text, start, marker),
            })
    }

    /// キーワード出現のスパン（開始位置順）。
    fn keyword_spans(&self, text: &str) -> Vec<Range<usize>> {
        self.store
            .keywords()
            .find_all(text)
            .into_iter()
            .map(|hit| hit.start..hit.end)
            .collect()
    }

    /// 除外パターンの一致が出現を包含するか。
    #[must_use]
    pub fn excluded(&self, text: &str, industry: Industry, start: usize, end: usize) -> bool {
        self.store.exclusions(industry).iter().any(|pattern| {
            pattern
                .find_iter(text)
                .any(|found| found.start() <= start && end <= found.end())
        })
    }

    /// 否定された出現を候補から取り除く。スコアは 0 未満にならない。
    #[must_use]
    pub fn apply(&self, text: &str, candidates: Vec<CandidateScore>) -> Vec<CandidateScore> {
        let spans = self.keyword_spans(text);
        candidates
            .into_iter()
            .map(|mut candidate| {
                let industry = candidate.industry;
                let mut removed = 0.0;
                let mut kept = Vec::with_capacity(candidate.occurrences.len());
                for occurrence in std::mem::take(&mut candidate.occurrences) {
                    if self.is_negated_within(
                        &spans,
                        text,
                        industry,
                        occurrence.start,
                        occurrence.end,
                    ) {
                        removed += occurrence.weight;
                        candidate.negated_terms.insert(occurrence.term);
                    } else {
                        kept.push(occurrence);
                    }
                }
                if removed > 0.0 {
                    tracing::trace!(
                        industry = %industry,
                        removed,
                        "negated keyword occurrences removed"
                    );
                }
                candidate.occurrences = kept;
                candidate.raw_score = if candidate.occurrences.is_empty() {
                    0.0
                } else {
                    (candidate.raw_score - removed).max(0.0)
                };
                candidate.refresh_matched_terms();
                candidate
            })
            .collect()
    }
}

/// 後置マーカーを探してよい範囲の終端。
///
/// `start..end` と重なる出現（`医療` に対する `医療機関` など）はまとめて一語とみなし、
/// その後に始まる最初の出現の開始位置で打ち切る。
fn following_scope_end(spans: &[Range<usize>], start: usize, end: usize, text_len: usize) -> usize {
    let mut cluster_end = end;
    for span in spans {
        if span.start >= cluster_end {
            return span.start;
        }
        if span.end > start {
            cluster_end = cluster_end.max(span.end);
        }
    }
    text_len
}

fn following_marker(text: &str, end: usize, limit: usize, marker: &NegationMarker) -> bool {
    let tail = &text[end..limit];
    tail.char_indices()
        .map(|(offset, _)| offset)
        .take(marker.window + 1)
        .any(|offset| {
            tail[offset..].starts_with(marker.pattern.as_str())
                && accepts_match(
                    text,
                    &marker.pattern,
                    end + offset,
                    end + offset + marker.pattern.len(),
                )
        })
}

fn preceding_marker(text: &str, start: usize, marker: &NegationMarker) -> bool {
    let head = &text[..start];
    std::iter::once(head.len())
        .chain(head.char_indices().rev().map(|(offset, _)| offset))
        .take(marker.window + 1)
        .any(|marker_end| {
            head[..marker_end].ends_with(marker.pattern.as_str())
                && accepts_match(
                    text,
                    &marker.pattern,
                    marker_end - marker.pattern.len(),
                    marker_end,
                )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::cooccurrence::CooccurrenceScorer;
    use crate::classification::normalize::normalize_text;

    fn filter_and_scorer() -> (NegationFilter, CooccurrenceScorer) {
        let store = Arc::new(LexiconStore::embedded().unwrap());
        (
            NegationFilter::new(Arc::clone(&store)),
            CooccurrenceScorer::new(store),
        )
    }

    fn find(candidates: &[CandidateScore], industry: Industry) -> Option<&CandidateScore> {
        candidates
            .iter()
            .find(|candidate| candidate.industry == industry)
    }

    #[test]
    fn following_marker_removes_the_whole_contribution() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("医療機関ではない小売業向け");
        let candidates = filter.apply(&text, scorer.score(&text));
        let healthcare = find(&candidates, Industry::HealthcareLifeScience).unwrap();
        assert_eq!(healthcare.raw_score, 0.0);
        assert!(healthcare.matched_terms.is_empty());
        assert!(healthcare.negated_terms.contains("医療機関"));
        assert!(healthcare.negated_terms.contains("医療"));
        let retail = find(&candidates, Industry::ConsumerRetail).unwrap();
        assert!(retail.raw_score > 0.0);
    }

    #[test]
    fn marker_outside_the_window_is_ignored() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("病院の情報システム刷新ではない");
        let candidates = filter.apply(&text, scorer.score(&text));
        let healthcare = find(&candidates, Industry::HealthcareLifeScience).unwrap();
        assert!(healthcare.raw_score > 0.0);
    }

    #[test]
    fn english_preceding_marker_negates() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("Designed for retail, not for banking customers");
        let candidates = filter.apply(&text, scorer.score(&text));
        let banking = find(&candidates, Industry::BankingSecurities).unwrap();
        assert_eq!(banking.raw_score, 0.0);
        assert!(banking.negated_terms.contains("banking"));
        assert!(find(&candidates, Industry::ConsumerRetail).unwrap().raw_score > 0.0);
    }

    #[test]
    fn exclusion_patterns_suppress_embedded_terms() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("クレジットカードの通信販売");
        let candidates = filter.apply(&text, scorer.score(&text));
        assert!(find(&candidates, Industry::Automotive).is_none_or(|c| c.raw_score == 0.0));
        assert!(find(&candidates, Industry::Telecommunications).is_none_or(|c| c.raw_score == 0.0));
        assert!(find(&candidates, Industry::FinancialServices).unwrap().raw_score > 0.0);
    }

    #[test]
    fn longer_terms_survive_overlapping_exclusions() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("社会インフラ構築");
        let candidates = filter.apply(&text, scorer.score(&text));
        let urban = find(&candidates, Industry::UrbanInfrastructure).unwrap();
        assert_eq!(urban.matched_terms, vec!["社会インフラ"]);
        assert!(urban.negated_terms.contains("インフラ"));
    }

    #[test]
    fn following_marker_stops_at_the_next_keyword() {
        let (filter, scorer) = filter_and_scorer();
        let text = normalize_text("小売と医療以外の業界");
        let candidates = filter.apply(&text, scorer.score(&text));
        let retail = find(&candidates, Industry::ConsumerRetail).unwrap();
        assert!(retail.raw_score > 0.0);
        assert_eq!(retail.matched_terms, vec!["小売"]);
        assert!(retail.negated_terms.is_empty());
        let healthcare = find(&candidates, Industry::HealthcareLifeScience).unwrap();
        assert_eq!(healthcare.raw_score, 0.0);
        assert!(healthcare.negated_terms.contains("医療"));
    }

    #[test]
    fn overlapping_terms_share_one_scope() {
        let spans = [0..6, 0..12, 24..30];
        assert_eq!(following_scope_end(&spans, 0, 6, 40), 24);
        assert_eq!(following_scope_end(&spans, 24, 30, 40), 40);
    }
}
