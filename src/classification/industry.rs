//! インダストリー（業種）カテゴリの閉じた集合。
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 分類対象のインダストリー。
///
/// 宣言順が既定の正準優先順位（タイブレーク順）になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Industry {
    #[serde(rename = "自動車")]
    Automotive,
    #[serde(rename = "重工業・エンジニアリング")]
    HeavyIndustry,
    #[serde(rename = "産業機械")]
    IndustrialMachinery,
    #[serde(rename = "素材・化学")]
    MaterialsChemicals,
    #[serde(rename = "エネルギー・資源・鉱業")]
    EnergyResources,
    #[serde(rename = "建設")]
    Construction,
    #[serde(rename = "運輸・物流")]
    TransportLogistics,
    #[serde(rename = "消費財・小売・流通")]
    ConsumerRetail,
    #[serde(rename = "テクノロジー")]
    Technology,
    #[serde(rename = "情報通信")]
    Telecommunications,
    #[serde(rename = "エンタテイメント&メディア")]
    EntertainmentMedia,
    #[serde(rename = "ホスピタリティ&レジャー")]
    HospitalityLeisure,
    #[serde(rename = "総合商社")]
    TradingCompany,
    #[serde(rename = "金融サービス")]
    FinancialServices,
    #[serde(rename = "銀行・証券")]
    BankingSecurities,
    #[serde(rename = "資産運用")]
    AssetManagement,
    #[serde(rename = "保険")]
    Insurance,
    #[serde(rename = "不動産")]
    RealEstate,
    #[serde(rename = "プライベート・エクイティ（PE）")]
    PrivateEquity,
    #[serde(rename = "都市・インフラストラクチャー")]
    UrbanInfrastructure,
    #[serde(rename = "官公庁・地方自治体・公的機関")]
    PublicSector,
    #[serde(rename = "農林水産・食・バイオ")]
    AgricultureFoodBio,
    #[serde(rename = "人材サービス")]
    HumanResources,
    #[serde(rename = "ヘルスケア・医薬ライフサイエンス")]
    HealthcareLifeScience,
    /// 判定不能時のフォールバック。候補には含まれない。
    #[serde(rename = "その他")]
    Other,
}

/// 未知のラベル。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown industry label: {0}")]
pub struct UnknownIndustry(pub String);

impl Industry {
    /// 分類候補となる 24 カテゴリ（正準順）。
    pub const CATEGORIES: [Industry; 24] = [
        Industry::Automotive,
        Industry::HeavyIndustry,
        Industry::IndustrialMachinery,
        Industry::MaterialsChemicals,
        Industry::EnergyResources,
        Industry::Construction,
        Industry::TransportLogistics,
        Industry::ConsumerRetail,
        Industry::Technology,
        Industry::Telecommunications,
        Industry::EntertainmentMedia,
        Industry::HospitalityLeisure,
        Industry::TradingCompany,
        Industry::FinancialServices,
        Industry::BankingSecurities,
        Industry::AssetManagement,
        Industry::Insurance,
        Industry::RealEstate,
        Industry::PrivateEquity,
        Industry::UrbanInfrastructure,
        Industry::PublicSector,
        Industry::AgricultureFoodBio,
        Industry::HumanResources,
        Industry::HealthcareLifeScience,
    ];

    /// 表示用ラベル（シリアライズ形式と同一）。
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Automotive => "自動車",
            Self::HeavyIndustry => "重工業・エンジニアリング",
            Self::IndustrialMachinery => "産業機械",
            Self::MaterialsChemicals => "素材・化学",
            Self::EnergyResources => "エネルギー・資源・鉱業",
            Self::Construction => "建設",
            Self::TransportLogistics => "運輸・物流",
            Self::ConsumerRetail => "消費財・小売・流通",
            Self::Technology => "テクノロジー",
            Self::Telecommunications => "情報通信",
            Self::EntertainmentMedia => "エンタテイメント&メディア",
            Self::HospitalityLeisure => "ホスピタリティ&レジャー",
            Self::TradingCompany => "総合商社",
            Self::FinancialServices => "金融サービス",
            Self::BankingSecurities => "銀行・証券",
            Self::AssetManagement => "資産運用",
            Self::Insurance => "保険",
            Self::RealEstate => "不動産",
            Self::PrivateEquity => "プライベート・エクイティ（PE）",
            Self::UrbanInfrastructure => "都市・インフラストラクチャー",
            Self::PublicSector => "官公庁・地方自治体・公的機関",
            Self::AgricultureFoodBio => "農林水産・食・バイオ",
            Self::HumanResources => "人材サービス",
            Self::HealthcareLifeScience => "ヘルスケア・医薬ライフサイエンス",
            Self::Other => "その他",
        }
    }

    #[must_use]
    pub const fn is_category(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// 正式ラベルに加え、各社サイトで使われる旧分類名も解決する。
    #[must_use]
    pub fn from_alias(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(industry) = trimmed.parse::<Self>() {
            return Some(industry);
        }
        let resolved = match trimmed {
            "製造・プロセス" | "製造業" => Self::IndustrialMachinery,
            "流通" | "卸売・小売業・飲食店" => Self::ConsumerRetail,
            "金融機関" => Self::BankingSecurities,
            "電力・エネルギー" => Self::EnergyResources,
            "通信" => Self::Telecommunications,
            "建設・不動産" => Self::RealEstate,
            "医療・ヘルスケア" | "医療" => Self::HealthcareLifeScience,
            "文教・教育" | "教育" | "官公庁" | "地方公共団体" | "公共" => Self::PublicSector,
            "サービス" => Self::HospitalityLeisure,
            "IT・情報サービス" | "情報処理" => Self::Technology,
            "農林水産" => Self::AgricultureFoodBio,
            _ => return None,
        };
        Some(resolved)
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Industry {
    type Err = UnknownIndustry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::CATEGORIES
            .iter()
            .copied()
            .chain(std::iter::once(Self::Other))
            .find(|industry| industry.label() == trimmed)
            .ok_or_else(|| UnknownIndustry(trimmed.to_string()))
    }
}
