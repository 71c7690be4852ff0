//! ソリューションカテゴリ（15分類 + その他）と生成結果の解釈。
use std::fmt;

use serde::{Deserialize, Serialize};

/// 生成結果の中でカテゴリ名の直前に置かれる見出し。
pub const SOLUTION_MARKER: &str = "ソリューション:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SolutionCategory {
    #[serde(rename = "戦略・コンサルティング")]
    StrategyConsulting,
    #[serde(rename = "システムインテグレーション")]
    SystemIntegration,
    #[serde(rename = "クラウドソリューション")]
    Cloud,
    #[serde(rename = "セキュリティソリューション")]
    Security,
    #[serde(rename = "データマネジメント・分析")]
    DataManagement,
    #[serde(rename = "AI・先端技術")]
    AiAdvancedTech,
    #[serde(rename = "IoT・エッジコンピューティング")]
    IotEdge,
    #[serde(rename = "業務アプリケーション")]
    BusinessApplications,
    #[serde(rename = "インフラストラクチャ")]
    Infrastructure,
    #[serde(rename = "運用・保守サービス")]
    OperationsMaintenance,
    #[serde(rename = "業務プロセス自動化")]
    ProcessAutomation,
    #[serde(rename = "デジタルワークプレイス")]
    DigitalWorkplace,
    #[serde(rename = "業界特化ソリューション")]
    IndustrySpecific,
    #[serde(rename = "ブロックチェーン・分散技術")]
    Blockchain,
    #[serde(rename = "サステナビリティ・グリーンIT")]
    Sustainability,
    #[serde(rename = "その他")]
    Other,
}

impl SolutionCategory {
    /// 選択肢として提示する15分類（`Other` を除く）。
    pub const CHOICES: [SolutionCategory; 15] = [
        Self::StrategyConsulting,
        Self::SystemIntegration,
        Self::Cloud,
        Self::Security,
        Self::DataManagement,
        Self::AiAdvancedTech,
        Self::IotEdge,
        Self::BusinessApplications,
        Self::Infrastructure,
        Self::OperationsMaintenance,
        Self::ProcessAutomation,
        Self::DigitalWorkplace,
        Self::IndustrySpecific,
        Self::Blockchain,
        Self::Sustainability,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StrategyConsulting => "戦略・コンサルティング",
            Self::SystemIntegration => "システムインテグレーション",
            Self::Cloud => "クラウドソリューション",
            Self::Security => "セキュリティソリューション",
            Self::DataManagement => "データマネジメント・分析",
            Self::AiAdvancedTech => "AI・先端技術",
            Self::IotEdge => "IoT・エッジコンピューティング",
            Self::BusinessApplications => "業務アプリケーション",
            Self::Infrastructure => "インフラストラクチャ",
            Self::OperationsMaintenance => "運用・保守サービス",
            Self::ProcessAutomation => "業務プロセス自動化",
            Self::DigitalWorkplace => "デジタルワークプレイス",
            Self::IndustrySpecific => "業界特化ソリューション",
            Self::Blockchain => "ブロックチェーン・分散技術",
            Self::Sustainability => "サステナビリティ・グリーンIT",
            Self::Other => "その他",
        }
    }

    /// 選択基準の説明。プロンプトに埋め込む。
    #[must_use]
    pub const fn criteria(self) -> &'static str {
        match self {
            Self::StrategyConsulting => "経営戦略、DX戦略、IT戦略の策定など、上流工程のコンサルティングが中心",
            Self::SystemIntegration => "基幹システム構築、ERP導入、レガシーシステム刷新など",
            Self::Cloud => "クラウド移行、ハイブリッドクラウド構築など、クラウド関連技術",
            Self::Security => "サイバーセキュリティ対策、認証基盤など、セキュリティ関連",
            Self::DataManagement => "データ基盤構築、BI、データガバナンスなど",
            Self::AiAdvancedTech => "AI、機械学習、自然言語処理、画像認識など",
            Self::IotEdge => "IoT、センサー、エッジコンピューティングなど",
            Self::BusinessApplications => "業務アプリ開発、モバイルアプリ、ローコード開発など",
            Self::Infrastructure => "ネットワーク、データセンター、サーバー・ストレージなど",
            Self::OperationsMaintenance => "システム運用、監視、ヘルプデスク、アウトソーシングなど",
            Self::ProcessAutomation => "RPA、ビジネスプロセス自動化、ワークフロー最適化など",
            Self::DigitalWorkplace => "テレワーク、コラボレーションツール、働き方改革など",
            Self::IndustrySpecific => "特定業界向けの専用ソリューション",
            Self::Blockchain => "ブロックチェーン、スマートコントラクト、暗号資産など",
            Self::Sustainability => "カーボンニュートラル、グリーンIT、ESG対応など",
            Self::Other => "いずれにも当てはまらないもの",
        }
    }

    /// ラベル文字列から引く。前後の空白と角括弧は無視する。
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        let trimmed = raw
            .trim()
            .trim_matches(|c: char| matches!(c, '[' | ']' | '「' | '」' | '【' | '】'))
            .trim();
        Self::CHOICES
            .into_iter()
            .chain(std::iter::once(Self::Other))
            .find(|category| category.label() == trimmed)
    }

    /// 生成結果 `ソリューション: X` を解釈する。
    ///
    /// 見出しがない、または X が既知のカテゴリでない場合は `Other`。
    #[must_use]
    pub fn parse_response(response: &str) -> Self {
        let normalized = response.replace('：', ":");
        let Some((_, rest)) = normalized.split_once(SOLUTION_MARKER) else {
            return Self::Other;
        };
        let first_line = rest.trim_start().lines().next().unwrap_or_default();
        Self::from_label(first_line).unwrap_or(Self::Other)
    }
}

impl fmt::Display for SolutionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ソリューション: クラウドソリューション", SolutionCategory::Cloud)]
    #[case("ソリューション：AI・先端技術", SolutionCategory::AiAdvancedTech)]
    #[case("分析の結果\nソリューション: [業務プロセス自動化]\n理由: RPA", SolutionCategory::ProcessAutomation)]
    #[case("クラウドソリューション", SolutionCategory::Other)]
    #[case("ソリューション: 量子コンピューティング", SolutionCategory::Other)]
    fn parse_response_extracts_known_categories(
        #[case] response: &str,
        #[case] expected: SolutionCategory,
    ) {
        assert_eq!(SolutionCategory::parse_response(response), expected);
    }

    #[test]
    fn labels_round_trip_through_serde() {
        for category in SolutionCategory::CHOICES {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.label()));
        }
    }
}
