//! 要約・ソリューション分類・タイトル生成のプロンプト。
use std::fmt::Write as _;

use once_cell::sync::Lazy;

use crate::clients::Prompt;
use crate::util::text::truncate_chars;

use super::solution::{SOLUTION_MARKER, SolutionCategory};

/// 要約に渡す本文の上限文字数。
pub const SUMMARY_CONTENT_CHARS: usize = 8_000;
/// ソリューション分類に渡す本文の上限文字数。
pub const SOLUTION_CONTENT_CHARS: usize = 2_000;

const SUMMARY_SYSTEM_MESSAGE: &str = "あなたは専門的な要約者です。与えられたテキストを約200-300文字で要約してください。
要約は以下の要素を含めるようにしてください：
1. 導入背景と課題
2. 導入された技術やソリューション
3. 得られた効果や成果
4. 今後の展望（もし言及があれば）

要約は日本語で、簡潔かつ具体的に作成してください。数値や固有名詞は可能な限り保持してください。";

const TITLE_SYSTEM_MESSAGE: &str = "あなたはタイトル生成の専門家です。提供された要約内容に基づいて、非常に具体的で内容を的確に表現するタイトルを生成してください。
タイトルは50文字以内で、以下の要素を可能な限り含めてください：
1) 導入企業名
2) 製品・技術名
3) 具体的な数値成果（例：40%削減、2倍向上など）
4) 解決された課題や実現した価値

「〜事例」「〜導入事例」などの一般的な表現は避け、読者が一目でその事例の価値を理解できる具体的な表現を使用してください。";

static SOLUTION_SYSTEM_MESSAGE: Lazy<String> = Lazy::new(|| {
    let mut message = String::from(
        "あなたはITソリューション分類の専門家です。\n与えられたITサービス・ソリューションの説明を分析し、最も適切なカテゴリを選択してください。\n\n以下のカテゴリから1つだけ選んでください：\n",
    );
    for category in SolutionCategory::CHOICES {
        let _ = writeln!(message, "- {}", category.label());
    }
    let _ = write!(
        message,
        "\n回答は以下の形式で返してください：\n{SOLUTION_MARKER} [選択したカテゴリ]\n\n各カテゴリの選択基準:\n"
    );
    for category in SolutionCategory::CHOICES {
        let _ = writeln!(message, "- {}: {}", category.label(), category.criteria());
    }
    message
});

#[must_use]
pub fn summary_prompt(title: &str, content: &str) -> Prompt {
    Prompt::new(
        SUMMARY_SYSTEM_MESSAGE,
        format!(
            "タイトル: {title}\n\n{}",
            truncate_chars(content, SUMMARY_CONTENT_CHARS)
        ),
    )
}

#[must_use]
pub fn solution_prompt(title: &str, summary: &str, content: &str) -> Prompt {
    Prompt::new(
        SOLUTION_SYSTEM_MESSAGE.as_str(),
        format!(
            "タイトル: {title}\n\n要約: {summary}\n\n内容: {}",
            truncate_chars(content, SOLUTION_CONTENT_CHARS)
        ),
    )
    .with_sampling(100, 0.5)
}

#[must_use]
pub fn title_prompt(summary: &str) -> Prompt {
    Prompt::new(
        TITLE_SYSTEM_MESSAGE,
        format!(
            "以下の要約に基づいて、非常に具体的で内容を的確に表現するタイトルを生成してください。\n\n要約内容：{summary}\n\n50文字以内で、この事例の主要な価値や成果が明確に伝わるタイトルを1つだけ提案してください。可能であれば、具体的な数値（例：40%削減、2倍向上）や、企業名、製品名、技術名などの固有名詞を含めてください。"
        ),
    )
    .with_sampling(100, 0.8)
}
