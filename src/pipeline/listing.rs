//! 取得層から受け取る掲載データと、出力するサービスレコード。
use serde::{Deserialize, Serialize};

use crate::classification::Industry;

use super::solution::SolutionCategory;

/// 取得層が抽出した1件の掲載（事例・サービス紹介）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub url: String,
    /// ページ本文のテキスト。
    #[serde(default)]
    pub content: String,
    /// 取得層が既に知っている企業名。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl RawListing {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            company: None,
        }
    }
}

/// 分類・要約済みのレコード。キーは出力ファイルの列名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(rename = "タイトル")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "企業")]
    pub company: String,
    #[serde(rename = "インダストリー")]
    pub industry: Industry,
    #[serde(rename = "インダストリー確信度")]
    pub confidence: f64,
    #[serde(
        rename = "ソリューション",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub solution: Option<SolutionCategory>,
    #[serde(rename = "要約", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}
