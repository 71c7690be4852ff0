//! 本文以外の補助シグナル（企業名・URL）。
use std::collections::BTreeSet;

use super::industry::Industry;
use super::lexicon::LexiconStore;
use super::normalize::normalize_text;

/// 企業名から業種を推定する。公的機関のパターンは登録名より優先する。
#[must_use]
pub(crate) fn company_signal(store: &LexiconStore, company: &str) -> Option<Industry> {
    let normalized = normalize_text(company.trim());
    if normalized.is_empty() {
        return None;
    }
    if store.is_public_body(&normalized) {
        return Some(Industry::PublicSector);
    }
    store.company_industry(&normalized)
}

/// URL を英数字のトークンに分割し、登録済みトークンの業種を集める。
#[must_use]
pub(crate) fn url_signal(store: &LexiconStore, url: &str) -> BTreeSet<Industry> {
    let lowered = url.to_ascii_lowercase();
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter_map(|token| store.url_hint(token))
        .collect()
}
