//! 宣言的なインダストリー辞書の読み込み・検証・コンパイル。
//!
//! 起動時に一度だけ構築され、以後は `Arc<LexiconStore>` として読み取り専用で共有される。
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use super::industry::Industry;
use super::normalize::{accepts_match, normalize_text};

/// バイナリに埋め込まれた既定の辞書。
pub const EMBEDDED_LEXICON: &str = include_str!("../../config/lexicon.yaml");

const DEFAULT_NEGATION_WINDOW: usize = 4;

/// 辞書の読み込み・検証エラー。起動時に致命的エラーとして扱う。
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lexicon document")]
    Parse(#[from] serde_yaml::Error),
    #[error("industry {0} has no lexicon entry")]
    MissingIndustry(Industry),
    #[error("industry {0} is declared more than once")]
    DuplicateIndustry(Industry),
    #[error("the fallback category その他 cannot carry lexicon entries")]
    FallbackEntry,
    #[error("empty term in {section}")]
    EmptyTerm { section: &'static str },
    #[error("term `{term}` has invalid weight {weight}")]
    InvalidWeight { term: String, weight: f64 },
    #[error("duplicate entry `{term}` in {section}")]
    DuplicateTerm { term: String, section: &'static str },
    #[error("context term `{term}` is mapped to both {first} and {second}")]
    AmbiguousContextTerm {
        term: String,
        first: Industry,
        second: Industry,
    },
    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("invalid priority list: {0}")]
    InvalidPriority(String),
    #[error("function `{0}` maps to no industry")]
    EmptyFunction(String),
    #[error("failed to build term automaton")]
    Automaton(#[from] aho_corasick::BuildError),
}

/// YAML 辞書のトップレベル。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LexiconDocument {
    #[serde(default)]
    pub priority: Vec<Industry>,
    #[serde(default)]
    pub negation: NegationSection,
    #[serde(default)]
    pub industries: Vec<IndustrySection>,
    #[serde(default)]
    pub functions: Vec<FunctionSection>,
    #[serde(default)]
    pub companies: Vec<CompanySection>,
    #[serde(default)]
    pub public_bodies: Vec<String>,
    #[serde(default)]
    pub url_hints: Vec<UrlHintSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NegationSection {
    #[serde(default = "default_window")]
    pub window_chars: usize,
    #[serde(default)]
    pub markers: Vec<MarkerSection>,
}

impl Default for NegationSection {
    fn default() -> Self {
        Self {
            window_chars: DEFAULT_NEGATION_WINDOW,
            markers: Vec::new(),
        }
    }
}

fn default_window() -> usize {
    DEFAULT_NEGATION_WINDOW
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerSection {
    pub pattern: String,
    pub direction: MarkerDirection,
    #[serde(default)]
    pub window: Option<usize>,
}

/// 否定マーカーが語のどちら側に現れるか。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerDirection {
    /// 語の後ろ（`銀行ではない`）。
    Following,
    /// 語の前（`not banking`）。
    Preceding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndustrySection {
    pub industry: Industry,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<KeywordSection>,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordSection {
    pub term: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSection {
    pub term: String,
    pub industries: BTreeMap<Industry, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanySection {
    pub name: String,
    pub industry: Industry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlHintSection {
    pub token: String,
    pub industry: Industry,
}

/// 辞書の入力元。
#[derive(Debug, Clone)]
pub enum LexiconSource {
    Embedded,
    Path(PathBuf),
    Yaml(String),
    Document(LexiconDocument),
}

/// 入力元から辞書を構築する。
pub fn load_lexicon(source: LexiconSource) -> Result<LexiconStore, LexiconError> {
    let store = match source {
        LexiconSource::Embedded => LexiconStore::from_yaml_str(EMBEDDED_LEXICON)?,
        LexiconSource::Path(path) => LexiconStore::from_path(&path)?,
        LexiconSource::Yaml(yaml) => LexiconStore::from_yaml_str(&yaml)?,
        LexiconSource::Document(document) => LexiconStore::from_document(document)?,
    };
    tracing::info!(
        keywords = store.keywords.len(),
        functions = store.functions.len(),
        context_terms = store.synonyms.len() + store.names.len(),
        "industry lexicon loaded"
    );
    Ok(store)
}

/// 業種と重みの組。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedIndustry {
    pub industry: Industry,
    pub weight: f64,
}

/// 文脈規則に使う語（同義語または明示的な業種名）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTerm {
    pub term: String,
    pub industry: Industry,
}

/// 否定マーカー（正規化済み）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegationMarker {
    pub pattern: String,
    pub direction: MarkerDirection,
    pub window: usize,
}

/// テキスト中の辞書語の出現。オフセットはバイト単位。
#[derive(Debug, Clone, Copy)]
pub(crate) struct TermHit<'a> {
    pub term: &'a str,
    pub start: usize,
    pub end: usize,
    pub targets: &'a [WeightedIndustry],
}

/// 一意な語集合に対する単一の Aho-Corasick オートマトン。
///
/// 重なり合う出現はすべて報告する（`生命保険` と `保険` は両方数える）。
#[derive(Debug)]
pub(crate) struct TermMatcher {
    automaton: Option<AhoCorasick>,
    terms: Vec<String>,
    targets: Vec<SmallVec<[WeightedIndustry; 2]>>,
}

impl TermMatcher {
    fn build(entries: Vec<(String, WeightedIndustry)>) -> Result<Self, LexiconError> {
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut terms = Vec::new();
        let mut targets: Vec<SmallVec<[WeightedIndustry; 2]>> = Vec::new();
        for (term, target) in entries {
            let slot = *index.entry(term.clone()).or_insert_with(|| {
                terms.push(term);
                targets.push(SmallVec::new());
                terms.len() - 1
            });
            targets[slot].push(target);
        }

        let automaton = if terms.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::Standard)
                    .build(&terms)?,
            )
        };
        Ok(Self {
            automaton,
            terms,
            targets,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.terms.len()
    }

    /// 正規化済みテキスト中の全出現を開始位置順に返す。
    pub(crate) fn find_all<'a>(&'a self, text: &str) -> Vec<TermHit<'a>> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };
        let mut hits: Vec<TermHit<'a>> = automaton
            .find_overlapping_iter(text)
            .filter_map(|mat| {
                let id = mat.pattern().as_usize();
                let term = self.terms[id].as_str();
                accepts_match(text, term, mat.start(), mat.end()).then(|| TermHit {
                    term,
                    start: mat.start(),
                    end: mat.end(),
                    targets: &self.targets[id],
                })
            })
            .collect();
        hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        hits
    }

    pub(crate) fn targets_of(&self, term: &str) -> Option<&[WeightedIndustry]> {
        self.terms
            .iter()
            .position(|candidate| candidate == term)
            .map(|id| self.targets[id].as_slice())
    }
}

/// 検証・コンパイル済みの辞書。
#[derive(Debug)]
pub struct LexiconStore {
    priority: Vec<Industry>,
    rank: FxHashMap<Industry, usize>,
    keywords: TermMatcher,
    functions: TermMatcher,
    synonyms: Vec<ContextTerm>,
    names: Vec<ContextTerm>,
    exclusions: FxHashMap<Industry, Vec<Regex>>,
    negation_window: usize,
    markers: Vec<NegationMarker>,
    companies: Vec<(String, Industry)>,
    public_bodies: Vec<Regex>,
    url_hints: FxHashMap<String, Industry>,
}

impl LexiconStore {
    /// 埋め込み辞書を読み込む。
    pub fn embedded() -> Result<Self, LexiconError> {
        Self::from_yaml_str(EMBEDDED_LEXICON)
    }

    pub fn from_path(path: &Path) -> Result<Self, LexiconError> {
        let raw = fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, LexiconError> {
        let document: LexiconDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(document)
    }

    /// 文書を検証してコンパイルする。
    pub fn from_document(document: LexiconDocument) -> Result<Self, LexiconError> {
        let priority = validate_priority(document.priority)?;
        let rank = priority
            .iter()
            .enumerate()
            .map(|(idx, industry)| (*industry, idx))
            .collect();

        let mut declared: HashSet<Industry> = HashSet::new();
        let mut keyword_entries = Vec::new();
        let mut context_owner: FxHashMap<String, Industry> = FxHashMap::default();
        let mut synonyms = Vec::new();
        let mut names = Vec::new();
        let mut exclusions: FxHashMap<Industry, Vec<Regex>> = FxHashMap::default();

        for section in document.industries {
            let industry = section.industry;
            if !industry.is_category() {
                return Err(LexiconError::FallbackEntry);
            }
            if !declared.insert(industry) {
                return Err(LexiconError::DuplicateIndustry(industry));
            }

            let mut seen_keywords = HashSet::new();
            for keyword in section.keywords {
                let term = normalized_term(&keyword.term, "keywords")?;
                check_weight(&term, keyword.weight)?;
                if !seen_keywords.insert(term.clone()) {
                    return Err(LexiconError::DuplicateTerm {
                        term,
                        section: "keywords",
                    });
                }
                keyword_entries.push((
                    term,
                    WeightedIndustry {
                        industry,
                        weight: keyword.weight,
                    },
                ));
            }

            for (raw_terms, target, section_name) in [
                (section.synonyms, &mut synonyms, "synonyms"),
                (section.names, &mut names, "names"),
            ] {
                for raw in raw_terms {
                    let term = normalized_term(&raw, section_name)?;
                    match context_owner.get(&term) {
                        Some(owner) if *owner != industry => {
                            return Err(LexiconError::AmbiguousContextTerm {
                                term,
                                first: *owner,
                                second: industry,
                            });
                        }
                        _ => {}
                    }
                    context_owner.insert(term.clone(), industry);
                    let entry = ContextTerm { term, industry };
                    if !target.contains(&entry) {
                        target.push(entry);
                    }
                }
            }

            let compiled = section
                .exclusions
                .iter()
                .map(|pattern| compile_pattern(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            exclusions.insert(industry, compiled);
        }

        if let Some(missing) = Industry::CATEGORIES
            .iter()
            .find(|industry| !declared.contains(industry))
        {
            return Err(LexiconError::MissingIndustry(*missing));
        }

        let mut function_entries = Vec::new();
        let mut seen_functions = HashSet::new();
        for function in document.functions {
            let term = normalized_term(&function.term, "functions")?;
            if !seen_functions.insert(term.clone()) {
                return Err(LexiconError::DuplicateTerm {
                    term,
                    section: "functions",
                });
            }
            if function.industries.is_empty() {
                return Err(LexiconError::EmptyFunction(term));
            }
            for (industry, weight) in function.industries {
                if !industry.is_category() {
                    return Err(LexiconError::FallbackEntry);
                }
                check_weight(&term, weight)?;
                function_entries.push((term.clone(), WeightedIndustry { industry, weight }));
            }
        }

        let markers = document
            .negation
            .markers
            .into_iter()
            .map(|marker| {
                Ok(NegationMarker {
                    pattern: normalized_term(&marker.pattern, "negation.markers")?,
                    direction: marker.direction,
                    window: marker.window.unwrap_or(document.negation.window_chars),
                })
            })
            .collect::<Result<Vec<_>, LexiconError>>()?;

        let mut companies = Vec::new();
        for company in document.companies {
            let name = normalized_term(&company.name, "companies")?;
            if !company.industry.is_category() {
                return Err(LexiconError::FallbackEntry);
            }
            if companies.iter().any(|(existing, _)| existing == &name) {
                return Err(LexiconError::DuplicateTerm {
                    term: name,
                    section: "companies",
                });
            }
            companies.push((name, company.industry));
        }

        let public_bodies = document
            .public_bodies
            .iter()
            .map(|pattern| compile_pattern(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut url_hints = FxHashMap::default();
        for hint in document.url_hints {
            let token = normalized_term(&hint.token, "url_hints")?;
            if !hint.industry.is_category() {
                return Err(LexiconError::FallbackEntry);
            }
            if url_hints.insert(token.clone(), hint.industry).is_some() {
                return Err(LexiconError::DuplicateTerm {
                    term: token,
                    section: "url_hints",
                });
            }
        }

        Ok(Self {
            priority,
            rank,
            keywords: TermMatcher::build(keyword_entries)?,
            functions: TermMatcher::build(function_entries)?,
            synonyms,
            names,
            exclusions,
            negation_window: document.negation.window_chars,
            markers,
            companies,
            public_bodies,
            url_hints,
        })
    }

    /// タイブレークに使う優先順位。
    #[must_use]
    pub fn priority(&self) -> &[Industry] {
        &self.priority
    }

    /// 優先順位上の位置（小さいほど優先）。`その他` は末尾扱い。
    #[must_use]
    pub fn priority_rank(&self, industry: Industry) -> usize {
        self.rank.get(&industry).copied().unwrap_or(usize::MAX)
    }

    pub(crate) fn keywords(&self) -> &TermMatcher {
        &self.keywords
    }

    pub(crate) fn functions(&self) -> &TermMatcher {
        &self.functions
    }

    #[must_use]
    pub fn synonyms(&self) -> &[ContextTerm] {
        &self.synonyms
    }

    #[must_use]
    pub fn sector_names(&self) -> &[ContextTerm] {
        &self.names
    }

    #[must_use]
    pub fn exclusions(&self, industry: Industry) -> &[Regex] {
        self.exclusions.get(&industry).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn negation_window(&self) -> usize {
        self.negation_window
    }

    #[must_use]
    pub fn negation_markers(&self) -> &[NegationMarker] {
        &self.markers
    }

    /// 企業名に含まれる最長の登録名から業種を引く。
    #[must_use]
    pub fn company_industry(&self, normalized_company: &str) -> Option<Industry> {
        self.companies
            .iter()
            .filter(|(name, _)| normalized_company.contains(name.as_str()))
            .fold(None::<&(String, Industry)>, |best, candidate| match best {
                Some(current) if current.0.chars().count() >= candidate.0.chars().count() => {
                    Some(current)
                }
                _ => Some(candidate),
            })
            .map(|(_, industry)| *industry)
    }

    #[must_use]
    pub fn is_public_body(&self, normalized_company: &str) -> bool {
        self.public_bodies
            .iter()
            .any(|pattern| pattern.is_match(normalized_company))
    }

    #[must_use]
    pub fn url_hint(&self, token: &str) -> Option<Industry> {
        self.url_hints.get(token).copied()
    }
}

fn validate_priority(raw: Vec<Industry>) -> Result<Vec<Industry>, LexiconError> {
    if raw.is_empty() {
        return Ok(Industry::CATEGORIES.to_vec());
    }
    if raw.contains(&Industry::Other) {
        return Err(LexiconError::InvalidPriority(
            "その他 cannot be ranked".to_string(),
        ));
    }
    let unique: HashSet<Industry> = raw.iter().copied().collect();
    if unique.len() != raw.len() {
        return Err(LexiconError::InvalidPriority(
            "duplicate industry".to_string(),
        ));
    }
    if unique.len() != Industry::CATEGORIES.len() {
        return Err(LexiconError::InvalidPriority(format!(
            "expected {} industries, got {}",
            Industry::CATEGORIES.len(),
            unique.len()
        )));
    }
    Ok(raw)
}

fn normalized_term(raw: &str, section: &'static str) -> Result<String, LexiconError> {
    let term = normalize_text(raw.trim());
    if term.is_empty() {
        return Err(LexiconError::EmptyTerm { section });
    }
    Ok(term)
}

fn check_weight(term: &str, weight: f64) -> Result<(), LexiconError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(LexiconError::InvalidWeight {
            term: term.to_string(),
            weight,
        })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, LexiconError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| LexiconError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })
}
