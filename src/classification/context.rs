//! 業種を直接示す文脈表現（`〜業界`、`〜向け`、`in the 〜 sector` など）の抽出。
use std::ops::Range;
use std::sync::Arc;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::industry::Industry;
use super::lexicon::{ContextTerm, LexiconError, LexiconStore};
use super::negation::NegationFilter;
use super::normalize::{accepts_match, char_offset};

/// 文脈規則の種類。宣言順が適用優先順。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRule {
    /// `銀行業界`、`小売業`。
    SectorSuffix,
    /// `銀行向け`、`自治体様向け`、`病院における`。
    Audience,
    /// `insurance industry`。
    EnglishSector,
    /// 明示的な業種名（`医療機関`、`証券会社`）。
    Mention,
}

impl ContextRule {
    const ORDERED: [ContextRule; 4] = [
        ContextRule::SectorSuffix,
        ContextRule::Audience,
        ContextRule::EnglishSector,
        ContextRule::Mention,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Self::SectorSuffix => "(?:業界|業種|分野|セクター|業)",
            Self::Audience => "(?:様)?(?:向け|のお客様|における)",
            Self::EnglishSector => r"\s+(?:industries|industry|sectors|sector)",
            Self::Mention => "",
        }
    }
}

/// 直接的な文脈ヒット。`position` は正規化済みテキスト上の文字オフセット。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextHit {
    pub industry: Industry,
    pub phrase: String,
    pub position: usize,
    pub rule: ContextRule,
}

#[derive(Debug)]
struct CompiledRule {
    rule: ContextRule,
    pattern: Regex,
    /// 先頭に固定した接尾辞。短い語での再試行に使う。
    suffix: Regex,
    /// 長い順。
    terms: Vec<String>,
    owners: FxHashMap<String, Industry>,
}

impl CompiledRule {
    /// `start` から始まる一致のうち、語境界を満たす最長のものを返す。
    ///
    /// 正規表現は最長の選択肢が境界で弾かれても同じ位置の短い語を試さないため、
    /// ここで語ごとに照合し直す。
    fn accepted_at(&self, text: &str, start: usize) -> Option<(Range<usize>, Range<usize>)> {
        let rest = &text[start..];
        self.terms
            .iter()
            .filter(|term| rest.starts_with(term.as_str()))
            .find_map(|term| {
                let term_end = start + term.len();
                let whole_end = term_end + self.suffix.find(&text[term_end..])?.end();
                let accepted = accepts_match(text, term, start, term_end)
                    && accepts_match(text, &text[start..whole_end], start, whole_end);
                accepted.then_some((start..term_end, start..whole_end))
            })
    }
}

#[derive(Debug)]
pub struct ContextExtractor {
    rules: Vec<CompiledRule>,
    negation: NegationFilter,
}

impl ContextExtractor {
    pub fn new(store: Arc<LexiconStore>) -> Result<Self, LexiconError> {
        let mut rules = Vec::new();
        for rule in ContextRule::ORDERED {
            let terms = match rule {
                ContextRule::Mention => store.sector_names(),
                _ => store.synonyms(),
            };
            if let Some(compiled) = compile_rule(rule, terms)? {
                rules.push(compiled);
            }
        }
        Ok(Self {
            rules,
            negation: NegationFilter::new(store),
        })
    }

    /// 正規化済みテキストから文脈ヒットを位置順に返す。
    ///
    /// 重なるスパンは先に適用された規則が獲得する。否定されたヒットは捨てるが、
    /// スパンは獲得済みのまま残し、後続の規則に二重計上させない。
    #[must_use]
    pub fn extract(&self, normalized_text: &str) -> Vec<ContextHit> {
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut hits = Vec::new();

        for compiled in &self.rules {
            let mut from = 0;
            while let Some(found) = compiled.pattern.find_at(normalized_text, from) {
                let Some((term, span)) = compiled.accepted_at(normalized_text, found.start())
                else {
                    from = next_char_start(normalized_text, found.start());
                    continue;
                };
                from = span.end;
                if claimed
                    .iter()
                    .any(|taken| taken.start < span.end && span.start < taken.end)
                {
                    continue;
                }
                claimed.push(span.clone());

                let Some(industry) = compiled.owners.get(&normalized_text[term.clone()]).copied()
                else {
                    continue;
                };
                if self
                    .negation
                    .marker_negates(normalized_text, span.start, span.end)
                    || self
                        .negation
                        .excluded(normalized_text, industry, term.start, term.end)
                {
                    continue;
                }
                hits.push(ContextHit {
                    industry,
                    phrase: normalized_text[span.clone()].to_string(),
                    position: char_offset(normalized_text, span.start),
                    rule: compiled.rule,
                });
            }
        }

        hits.sort_by_key(|hit| hit.position);
        hits
    }
}

fn compile_rule(
    rule: ContextRule,
    terms: &[ContextTerm],
) -> Result<Option<CompiledRule>, LexiconError> {
    if terms.is_empty() {
        return Ok(None);
    }
    // 長い語を先に並べ、`金融機関` が `金融` より優先されるようにする。
    let mut ordered: Vec<&ContextTerm> = terms.iter().collect();
    ordered.sort_by(|a, b| {
        b.term
            .chars()
            .count()
            .cmp(&a.term.chars().count())
            .then_with(|| a.term.cmp(&b.term))
    });
    let alternation = ordered
        .iter()
        .map(|entry| regex::escape(&entry.term))
        .collect::<Vec<_>>()
        .join("|");
    let source = format!("(?P<term>{alternation}){}", rule.suffix());
    let pattern = Regex::new(&source).map_err(|source_err| LexiconError::InvalidPattern {
        pattern: format!("context rule {rule:?}"),
        source: Box::new(source_err),
    })?;
    let suffix = Regex::new(&format!("^(?:{})", rule.suffix())).map_err(|source_err| {
        LexiconError::InvalidPattern {
            pattern: format!("context suffix {rule:?}"),
            source: Box::new(source_err),
        }
    })?;
    let owners = terms
        .iter()
        .map(|entry| (entry.term.clone(), entry.industry))
        .collect();
    Ok(Some(CompiledRule {
        rule,
        pattern,
        suffix,
        terms: ordered.iter().map(|entry| entry.term.clone()).collect(),
        owners,
    }))
}

fn next_char_start(text: &str, start: usize) -> usize {
    text[start..]
        .chars()
        .next()
        .map_or(text.len(), |ch| start + ch.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::normalize::normalize_text;
    use rstest::rstest;

    fn extractor() -> ContextExtractor {
        ContextExtractor::new(Arc::new(LexiconStore::embedded().unwrap())).unwrap()
    }

    #[rstest]
    #[case("保険業界向けソリューション", Industry::Insurance, ContextRule::SectorSuffix)]
    #[case("当社は銀行向けに提供", Industry::BankingSecurities, ContextRule::Audience)]
    #[case("自治体様向けの提案", Industry::PublicSector, ContextRule::Audience)]
    #[case("Solutions for the insurance industry", Industry::Insurance, ContextRule::EnglishSector)]
    #[case("証券会社の基幹刷新", Industry::BankingSecurities, ContextRule::Mention)]
    fn rules_detect_direct_evidence(
        #[case] text: &str,
        #[case] industry: Industry,
        #[case] rule: ContextRule,
    ) {
        let hits = extractor().extract(&normalize_text(text));
        assert_eq!(hits.len(), 1, "{hits:?}");
        assert_eq!(hits[0].industry, industry);
        assert_eq!(hits[0].rule, rule);
    }

    #[test]
    fn earlier_rule_claims_overlapping_span() {
        let hits = extractor().extract(&normalize_text("重工業における設備保全"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rule, ContextRule::SectorSuffix);
        assert_eq!(hits[0].phrase, "重工業");
    }

    #[test]
    fn longest_synonym_wins_within_a_rule() {
        let hits = extractor().extract(&normalize_text("金融機関向けの勘定系"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].industry, Industry::BankingSecurities);
        assert_eq!(hits[0].phrase, "金融機関向け");
    }

    #[test]
    fn negated_mentions_are_dropped() {
        let hits = extractor().extract(&normalize_text("医療機関ではない小売業向けのPOSシステム"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].industry, Industry::ConsumerRetail);
        assert_eq!(hits[0].phrase, "小売業");
        assert_eq!(hits[0].position, 8);
    }

    #[test]
    fn exclusions_apply_to_context_hits() {
        let hits = extractor().extract(&normalize_text("ITインフラ分野の運用"));
        assert!(hits
            .iter()
            .all(|hit| hit.industry != Industry::UrbanInfrastructure));
    }

    #[test]
    fn ascii_synonyms_need_word_boundaries() {
        let hits = extractor().extract(&normalize_text("credit sector analysis"));
        assert!(hits.is_empty(), "{hits:?}");
    }

    #[test]
    fn no_pattern_means_no_evidence() {
        assert!(extractor().extract("システムの導入支援サービス").is_empty());
    }

    #[test]
    fn shorter_term_is_retried_when_the_longer_one_breaks_a_word() {
        let mut document: crate::classification::LexiconDocument =
            serde_yaml::from_str(crate::classification::EMBEDDED_LEXICON).unwrap();
        let insurance = document
            .industries
            .iter_mut()
            .find(|section| section.industry == Industry::Insurance)
            .unwrap();
        insurance
            .names
            .extend(["underwriter".to_string(), "underwriter group".to_string()]);
        let store = Arc::new(LexiconStore::from_document(document).unwrap());

        let hits = ContextExtractor::new(store)
            .unwrap()
            .extract(&normalize_text("leading underwriter groups in asia"));
        assert_eq!(hits.len(), 1, "{hits:?}");
        assert_eq!(hits[0].industry, Industry::Insurance);
        assert_eq!(hits[0].phrase, "underwriter");
        assert_eq!(hits[0].rule, ContextRule::Mention);
        assert_eq!(hits[0].position, 8);
    }
}
