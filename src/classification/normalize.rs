//! 照合用のテキスト正規化。
//!
//! 入力テキストと辞書語はどちらも NFKC + 小文字化してから照合する。
//! 全角英数（ＰＯＳ）と半角（pos）が同一視される。
use unicode_normalization::UnicodeNormalization;

#[must_use]
pub(crate) fn normalize_text(input: &str) -> String {
    input.nfkc().collect::<String>().to_lowercase()
}

/// `start..end` の前後が ASCII 英数字でなければ true。
#[must_use]
pub(crate) fn on_ascii_boundary(text: &str, start: usize, end: usize) -> bool {
    before_is_boundary(text, start) && after_is_boundary(text, end)
}

fn before_is_boundary(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_ascii_alphanumeric())
}

fn after_is_boundary(text: &str, end: usize) -> bool {
    text[end..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_ascii_alphanumeric())
}

/// 語の端が ASCII 英数字なら、その側に単語境界を要求する。
///
/// `bank` は `banks` に一致せず、`it企業` は `credit企業` に一致しない。
/// 日本語の端は部分文字列一致のまま。
#[must_use]
pub(crate) fn accepts_match(text: &str, term: &str, start: usize, end: usize) -> bool {
    let head_ascii = term.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let tail_ascii = term.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());
    (!head_ascii || before_is_boundary(text, start)) && (!tail_ascii || after_is_boundary(text, end))
}

/// バイトオフセットを文字オフセットに変換する。
#[must_use]
pub(crate) fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}
