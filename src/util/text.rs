/// テキスト処理ユーティリティ。
///
/// 空白の正規化、文字数での切り詰め、重複判定用のハッシュを提供します。
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

/// テキストをXXH3でハッシュする。
#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// 連続する空白（改行・全角空白を含む）を半角空白1つにまとめ、前後を除去する。
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 先頭から `max_chars` 文字までのスライスを返す。
///
/// 文字境界で切るため、マルチバイト文字の途中では切らない。
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// ログ用のプレビュー。書記素単位で切り、切った場合は `...` を付ける。
#[must_use]
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max_graphemes).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_text_is_deterministic() {
        assert_eq!(hash_text("https://example.com/a"), hash_text("https://example.com/a"));
        assert_ne!(hash_text("https://example.com/a"), hash_text("https://example.com/b"));
    }

    #[test]
    fn collapse_whitespace_handles_mixed_spaces() {
        assert_eq!(collapse_whitespace("  導入\n\n事例　概要\t "), "導入 事例 概要");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("銀行向けシステム", 4), "銀行向け");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(preview("要約を生成しました", 3), "要約を...");
        assert_eq!(preview("短い", 10), "短い");
    }
}
