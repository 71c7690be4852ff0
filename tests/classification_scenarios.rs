//! 組み込み辞書での分類シナリオと、分類器全体に対する性質テスト。
use std::sync::Arc;

use casebook_worker::classification::{
    ClassificationHints, ClassificationResult, ContextRule, CooccurrenceScorer, EMBEDDED_LEXICON,
    FusionConfig, Industry, IndustryClassifier, KeywordSection, LexiconDocument, LexiconStore,
    SignalKind,
};
use rstest::rstest;

fn classifier() -> IndustryClassifier {
    IndustryClassifier::with_embedded_lexicon().expect("embedded lexicon loads")
}

fn embedded_document() -> LexiconDocument {
    serde_yaml::from_str(EMBEDDED_LEXICON).expect("embedded lexicon parses")
}

fn score_of(result: &ClassificationResult, industry: Industry) -> Option<f64> {
    result
        .ranking
        .iter()
        .find(|score| score.industry == industry)
        .map(|score| score.score)
}

#[test]
fn bank_audience_phrase_decides_banking() {
    let result = classifier().classify("当社は銀行向けにリスク管理システムを提供しています", None);

    assert_eq!(result.industry, Industry::BankingSecurities);
    assert!(!result.fallback);
    assert_eq!(result.dominant_signal, Some(SignalKind::Context));
    assert!(
        result
            .direct_hits
            .iter()
            .any(|hit| hit.industry == Industry::BankingSecurities && hit.phrase.contains("銀行"))
    );
}

#[test]
fn negated_medical_mention_does_not_win() {
    let result = classifier().classify("医療機関ではない小売業向けのPOSシステム", None);

    assert_ne!(result.industry, Industry::HealthcareLifeScience);
    assert_eq!(result.industry, Industry::ConsumerRetail);
    assert!(!result.matched_terms.iter().any(|term| term == "医療機関"));
    assert!(result.negated_terms.contains("医療機関"));
    assert!(
        result
            .direct_hits
            .iter()
            .all(|hit| hit.industry != Industry::HealthcareLifeScience)
    );
}

#[test]
fn text_without_industry_vocabulary_falls_back() {
    let result = classifier().classify("システムの導入支援サービス", None);

    assert!(result.fallback);
    assert_eq!(result.industry, Industry::Other);
    assert_eq!(result.confidence, 0.0);
    assert!(result.dominant_signal.is_none());
}

#[test]
fn direct_hit_wins_between_two_mentioned_industries() {
    let result = classifier().classify("自動車および保険業界向けソリューション", None);

    assert_eq!(result.industry, Industry::Insurance);
    assert!(
        result
            .direct_hits
            .iter()
            .any(|hit| hit.industry == Industry::Insurance && hit.rule == ContextRule::SectorSuffix)
    );
    let insurance = score_of(&result, Industry::Insurance).expect("insurance ranked");
    let automotive = score_of(&result, Industry::Automotive).expect("automotive ranked");
    assert!(insurance > automotive);
}

#[test]
fn trailing_marker_only_negates_the_nearest_term() {
    let result = classifier().classify("小売と医療以外の業界", None);

    assert!(!result.fallback);
    assert_eq!(result.industry, Industry::ConsumerRetail);
    assert!(result.matched_terms.iter().any(|term| term == "小売"));
    assert!(result.negated_terms.contains("医療"));
    assert!(!result.negated_terms.contains("小売"));
}

#[rstest]
#[case("当社は銀行向けにリスク管理システムを提供しています")]
#[case("医療機関ではない小売業向けのPOSシステム")]
#[case("自動車および保険業界向けソリューション")]
#[case("")]
fn classification_is_deterministic(#[case] text: &str) {
    let classifier = classifier();
    let first = classifier.classify(text, None);
    let second = classifier.classify(text, None);
    assert_eq!(first, second);
}

#[test]
fn scores_below_threshold_use_configured_fallback() {
    let store = Arc::new(LexiconStore::embedded().expect("embedded lexicon loads"));
    let config = FusionConfig {
        min_score: 100.0,
        fallback: Industry::TradingCompany,
        ..FusionConfig::default()
    };
    let classifier = IndustryClassifier::new(store, config).expect("classifier builds");

    let result = classifier.classify("保険業界向けの契約管理システム", None);
    assert!(result.fallback);
    assert_eq!(result.industry, Industry::TradingCompany);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(
        result.ranking.first().map(|score| score.industry),
        Some(Industry::Insurance)
    );
}

#[rstest]
#[case("物流倉庫の自動化", "物流倉庫の自動化と物流")]
#[case("保険の契約管理", "保険の契約管理と保険")]
fn repeated_keyword_never_lowers_cooccurrence(#[case] base: &str, #[case] extended: &str) {
    let scorer = CooccurrenceScorer::new(Arc::new(
        LexiconStore::embedded().expect("embedded lexicon loads"),
    ));
    let before = scorer.score(base);
    let after = scorer.score(extended);

    assert!(!before.is_empty());
    for candidate in &before {
        let extended_score = after
            .iter()
            .find(|other| other.industry == candidate.industry)
            .map_or(0.0, |other| other.raw_score);
        assert!(
            extended_score >= candidate.raw_score,
            "{:?} dropped from {} to {}",
            candidate.industry,
            candidate.raw_score,
            extended_score
        );
    }
}

/// 自動車と保険にだけ同じ重みの固有語を足した辞書。
fn tied_document() -> LexiconDocument {
    let mut document = embedded_document();
    for section in &mut document.industries {
        let term = match section.industry {
            Industry::Automotive => "甲乙丙",
            Industry::Insurance => "丁戊己",
            _ => continue,
        };
        section.keywords.push(KeywordSection {
            term: term.to_string(),
            weight: 1.0,
        });
    }
    document
}

fn classify_with(document: LexiconDocument, text: &str) -> ClassificationResult {
    let store = LexiconStore::from_document(document).expect("lexicon builds");
    IndustryClassifier::new(Arc::new(store), FusionConfig::default())
        .expect("classifier builds")
        .classify(text, None)
}

#[test]
fn equal_scores_follow_declared_priority() {
    let result = classify_with(tied_document(), "甲乙丙と丁戊己");
    assert_eq!(result.industry, Industry::Automotive);
    assert_eq!(
        score_of(&result, Industry::Automotive),
        score_of(&result, Industry::Insurance)
    );

    let mut reprioritized = tied_document();
    let mut priority = Industry::CATEGORIES.to_vec();
    priority.retain(|industry| *industry != Industry::Insurance);
    priority.insert(0, Industry::Insurance);
    reprioritized.priority = priority;
    let result = classify_with(reprioritized, "甲乙丙と丁戊己");
    assert_eq!(result.industry, Industry::Insurance);
}

#[test]
fn tie_break_ignores_lexicon_section_order() {
    let mut reversed = tied_document();
    reversed.industries.reverse();
    let result = classify_with(reversed, "甲乙丙と丁戊己");
    assert_eq!(result.industry, Industry::Automotive);
}

#[test]
fn hints_combine_with_text_evidence() {
    let hints = ClassificationHints {
        functions: vec!["勘定系".to_string()],
        company: Some("静岡銀行".to_string()),
        url: Some("https://example.com/banking/case-12".to_string()),
        prior: None,
    };
    let result = classifier().classify("基幹システムの刷新事例", Some(&hints));

    assert_eq!(result.industry, Industry::BankingSecurities);
    assert!(result.contributing_signals.contains(&SignalKind::Function));
    assert!(result.contributing_signals.contains(&SignalKind::Url));
    assert!(result.contributing_signals.contains(&SignalKind::Company));
}
