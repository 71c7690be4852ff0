//! 辞書の読み込みと検証エラー。
use std::io::Write;

use casebook_worker::classification::{
    EMBEDDED_LEXICON, Industry, KeywordSection, LexiconDocument, LexiconError, LexiconSource,
    LexiconStore, load_lexicon,
};

fn embedded_document() -> LexiconDocument {
    serde_yaml::from_str(EMBEDDED_LEXICON).expect("embedded lexicon parses")
}

fn section_mut(document: &mut LexiconDocument, industry: Industry) -> &mut Vec<KeywordSection> {
    &mut document
        .industries
        .iter_mut()
        .find(|section| section.industry == industry)
        .expect("industry declared")
        .keywords
}

#[test]
fn every_source_loads_the_same_priority() {
    let embedded = load_lexicon(LexiconSource::Embedded).expect("embedded loads");

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(EMBEDDED_LEXICON.as_bytes())
        .expect("write lexicon");
    let from_file = load_lexicon(LexiconSource::Path(file.path().to_path_buf()))
        .expect("file lexicon loads");
    let from_document =
        load_lexicon(LexiconSource::Document(embedded_document())).expect("document loads");

    assert_eq!(embedded.priority(), Industry::CATEGORIES.as_slice());
    assert_eq!(from_file.priority(), embedded.priority());
    assert_eq!(from_document.priority(), embedded.priority());
}

#[test]
fn missing_file_reports_its_path() {
    let error = LexiconStore::from_path(std::path::Path::new("/nonexistent/lexicon.yaml"))
        .expect_err("missing file fails");
    assert!(matches!(error, LexiconError::Io { .. }));
    assert!(error.to_string().contains("/nonexistent/lexicon.yaml"));
}

#[test]
fn unknown_fields_are_rejected() {
    let error = LexiconStore::from_yaml_str("industries: []\nweights: {}\n")
        .expect_err("unknown key fails");
    assert!(matches!(error, LexiconError::Parse(_)));
}

#[test]
fn dropped_industry_is_reported() {
    let mut document = embedded_document();
    document
        .industries
        .retain(|section| section.industry != Industry::PrivateEquity);

    let error = LexiconStore::from_document(document).expect_err("incomplete lexicon fails");
    assert!(matches!(
        error,
        LexiconError::MissingIndustry(Industry::PrivateEquity)
    ));
}

#[test]
fn duplicated_industry_is_reported() {
    let mut document = embedded_document();
    let copy = document.industries[0].clone();
    document.industries.push(copy);

    let error = LexiconStore::from_document(document).expect_err("duplicate fails");
    assert!(matches!(
        error,
        LexiconError::DuplicateIndustry(Industry::Automotive)
    ));
}

#[test]
fn negative_weight_is_rejected() {
    let mut document = embedded_document();
    section_mut(&mut document, Industry::Insurance).push(KeywordSection {
        term: "再保険".to_string(),
        weight: -1.0,
    });

    let error = LexiconStore::from_document(document).expect_err("negative weight fails");
    assert!(matches!(error, LexiconError::InvalidWeight { .. }));
}

#[test]
fn invalid_exclusion_pattern_is_rejected() {
    let mut document = embedded_document();
    document.industries[0].exclusions.push("(unclosed".to_string());

    let error = LexiconStore::from_document(document).expect_err("bad pattern fails");
    assert!(matches!(error, LexiconError::InvalidPattern { .. }));
}

#[test]
fn context_term_shared_by_two_industries_is_rejected() {
    let mut document = embedded_document();
    let insurance = document
        .industries
        .iter_mut()
        .find(|section| section.industry == Industry::Insurance)
        .expect("insurance declared");
    insurance.synonyms.push("自動車".to_string());

    let error = LexiconStore::from_document(document).expect_err("ambiguous term fails");
    assert!(matches!(error, LexiconError::AmbiguousContextTerm { .. }));
}

#[test]
fn incomplete_priority_list_is_rejected() {
    let mut document = embedded_document();
    document.priority = vec![Industry::Insurance, Industry::Automotive];

    let error = LexiconStore::from_document(document).expect_err("short priority fails");
    assert!(matches!(error, LexiconError::InvalidPriority(_)));
}
