//! サービス機能キーワードから業種候補への写像。
use std::collections::BTreeMap;
use std::sync::Arc;

use super::industry::Industry;
use super::lexicon::LexiconStore;
use super::normalize::normalize_text;

/// 検出した機能と業種ごとの累積重み。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionScores {
    /// テキストでの初出順、続いてヒントの順。
    pub functions: Vec<String>,
    pub weights: BTreeMap<Industry, f64>,
}

#[derive(Debug, Clone)]
pub struct FunctionMapper {
    store: Arc<LexiconStore>,
}

impl FunctionMapper {
    #[must_use]
    pub fn new(store: Arc<LexiconStore>) -> Self {
        Self { store }
    }

    /// テキストに現れる機能キーワード（存在のみ、回数は数えない）。
    #[must_use]
    pub fn detect(&self, normalized_text: &str) -> Vec<String> {
        let mut detected: Vec<String> = Vec::new();
        for hit in self.store.functions().find_all(normalized_text) {
            if !detected.iter().any(|term| term == hit.term) {
                detected.push(hit.term.to_string());
            }
        }
        detected
    }

    /// 機能の列を業種ごとの重みに集計する。未知の機能は無視する。
    #[must_use]
    pub fn map(&self, functions: &[String]) -> BTreeMap<Industry, f64> {
        let mut weights = BTreeMap::new();
        for function in functions {
            let Some(targets) = self.store.functions().targets_of(function) else {
                continue;
            };
            for target in targets {
                *weights.entry(target.industry).or_insert(0.0) += target.weight;
            }
        }
        weights
    }

    /// テキストから検出した機能とヒントの機能を合わせて集計する。
    #[must_use]
    pub fn score(&self, normalized_text: &str, hinted: &[String]) -> FunctionScores {
        let mut functions = self.detect(normalized_text);
        for hint in hinted {
            let normalized = normalize_text(hint.trim());
            if normalized.is_empty() || functions.contains(&normalized) {
                continue;
            }
            if self.store.functions().targets_of(&normalized).is_none() {
                tracing::debug!(function = %hint, "unknown function hint ignored");
                continue;
            }
            functions.push(normalized);
        }
        let weights = self.map(&functions);
        FunctionScores { functions, weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> FunctionMapper {
        FunctionMapper::new(Arc::new(LexiconStore::embedded().unwrap()))
    }

    #[test]
    fn ambiguous_function_spreads_partial_weight() {
        let scores = mapper().score(&normalize_text("リスク管理の高度化"), &[]);
        assert_eq!(scores.functions, vec!["リスク管理"]);
        assert_eq!(scores.weights.get(&Industry::BankingSecurities), Some(&0.5));
        assert_eq!(scores.weights.get(&Industry::Insurance), Some(&0.3));
        assert_eq!(scores.weights.get(&Industry::FinancialServices), Some(&0.2));
    }

    #[test]
    fn weights_of_several_functions_sum() {
        let scores = mapper().score(&normalize_text("在庫管理と需要予測"), &[]);
        let retail = scores.weights[&Industry::ConsumerRetail];
        assert!((retail - 1.0).abs() < 1e-9);
    }

    #[test]
    fn presence_is_counted_once() {
        let scores = mapper().score(&normalize_text("配車管理と配車管理"), &[]);
        assert_eq!(scores.weights[&Industry::TransportLogistics], 1.0);
    }

    #[test]
    fn hints_are_merged_and_unknown_hints_ignored() {
        let hints = vec!["Claims Processing".to_string(), "宇宙旅行".to_string()];
        let scores = mapper().score("", &hints);
        assert_eq!(scores.functions, vec!["claims processing"]);
        assert_eq!(scores.weights.get(&Industry::Insurance), Some(&1.0));
    }
}
