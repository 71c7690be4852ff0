//! 生成タイトルからの企業名抽出。
use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

/// 上から順に試す抽出パターン。最初のキャプチャが企業名。
const TITLE_PATTERNS: [&str; 5] = [
    // 先頭の「〇〇、」
    r"^([^、,]{2,10})[、,]",
    // 先頭の「〇〇が／は／と／を」
    r"^([^、,]{2,10})(?:が|は|と|を)",
    r"株式会社([^\s、,]{2,10})",
    r"([^\s、,]{2,10})株式会社",
    r"(東京電力|東電|首都高|首都高速道路|豊田自動織機|JAバンク|三菱UFJ|みずほ|三井住友|福岡ひびき信用金庫)",
];

/// 掲載元（ホスト企業）自身の名前を除外しつつ企業名を取り出す。
#[derive(Debug, Clone)]
pub struct CompanyExtractor {
    host_company: String,
    patterns: Vec<Regex>,
    host_pattern: Option<Regex>,
}

impl CompanyExtractor {
    /// # Errors
    /// パターンのコンパイルに失敗した場合はエラーを返す。
    pub fn new(host_company: impl Into<String>, host_aliases: &[String]) -> Result<Self, regex::Error> {
        let host_company = host_company.into();
        let patterns = TITLE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let alternation = std::iter::once(host_company.as_str())
            .chain(host_aliases.iter().map(String::as_str))
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let host_pattern = if alternation.is_empty() {
            None
        } else {
            Some(RegexBuilder::new(&alternation).case_insensitive(true).build()?)
        };

        Ok(Self {
            host_company,
            patterns,
            host_pattern,
        })
    }

    /// 掲載元の企業名（抽出できなかった場合の既定値）。
    #[must_use]
    pub fn host_company(&self) -> &str {
        &self.host_company
    }

    /// 掲載元自身を指す名前かどうか。
    #[must_use]
    pub fn is_host(&self, company: &str) -> bool {
        self.host_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(company))
    }

    /// タイトルから企業名を抽出する。パターンごとに最初の一致だけを見る。
    #[must_use]
    pub fn extract(&self, title: &str) -> Option<String> {
        if title.trim().is_empty() {
            return None;
        }

        for pattern in &self.patterns {
            let Some(company) = pattern
                .captures(title)
                .and_then(|captures| captures.get(1))
                .map(|found| found.as_str().trim())
            else {
                continue;
            };
            if self.is_host(company) {
                debug!(company, "skipping host company name");
                continue;
            }
            if company.chars().count() >= 2 {
                info!(company, "company extracted from title");
                return Some(company.to_string());
            }
        }

        debug!("no company name found in title");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn extractor() -> CompanyExtractor {
        CompanyExtractor::new(
            "日立",
            &["Hitachi".to_string(), "日立製作所".to_string(), "日立システムズ".to_string()],
        )
        .unwrap()
    }

    #[rstest]
    #[case("トヨタ自動車、生産計画を最適化し在庫を30%削減", Some("トヨタ自動車"))]
    #[case("中部電力が挑むAI設備保全", Some("中部電力"))]
    #[case("株式会社ニチレイ 物流DXの取り組み", Some("ニチレイ"))]
    #[case("先進事例：三菱UFJの決済基盤刷新", Some("三菱UFJ"))]
    #[case("データ活用で生産性2倍に", None)]
    #[case("", None)]
    fn extracts_company_names(#[case] title: &str, #[case] expected: Option<&str>) {
        assert_eq!(extractor().extract(title), expected.map(ToString::to_string));
    }

    #[test]
    fn host_aliases_are_skipped_case_insensitively() {
        let extractor = extractor();
        assert_eq!(extractor.extract("HITACHI、製造現場のDXを支援"), None);
        assert_eq!(
            extractor.extract("日立製作所と福岡ひびき信用金庫が協業"),
            Some("福岡ひびき信用金庫".to_string())
        );
        assert!(extractor.is_host("hitachi"));
        assert!(!extractor.is_host("東京電力"));
    }
}
