use rust_decimal::Decimal;
use unicode_width::UnicodeWidthStr;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
/// Uses Unicode display width so Hangul customer names stay aligned.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(|ch| ch.to_string())
            .unwrap_or_default();
    }

    // Leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns, left-aligned.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let s = truncate_display(s, width);
    let sw = display_width(&s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(sw)))
}

/// Pad or truncate a string to exactly `width` display columns, right-aligned.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let s = truncate_display(s, width);
    let sw = display_width(&s);
    format!("{}{}", " ".repeat(width.saturating_sub(sw)), s)
}

/// Decimal with thousands separators; the fractional part is kept as stored.
pub(crate) fn format_amount(value: Decimal) -> String {
    let text = value.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_width_ascii() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn display_width_hangul() {
        assert_eq!(display_width("거래처명"), 8);
        assert_eq!(display_width("(주)엘지화학"), 12);
    }

    #[test]
    fn truncate_keeps_width_budget() {
        assert_eq!(truncate_display("Acme Corp.", 20), "Acme Corp.");
        assert_eq!(truncate_display("Acme Corporation", 8), "Acme C..");
        // 2-wide chars never split
        assert_eq!(truncate_display("삼성전자주식회사", 7), "삼성..");
        assert_eq!(truncate_display("삼성", 1), "");
        assert_eq!(truncate_display("ab", 1), "a");
    }

    #[test]
    fn padding() {
        assert_eq!(pad_right("KRW", 5), "KRW  ");
        assert_eq!(pad_left("42", 5), "   42");
        assert_eq!(pad_right("환종", 6), "환종  ");
        assert_eq!(display_width(&pad_left("삼성전자주식회사", 7)), 7);
    }

    #[test]
    fn amounts_grouped() {
        let f = |s: &str| format_amount(Decimal::from_str(s).unwrap());
        assert_eq!(f("0"), "0");
        assert_eq!(f("999"), "999");
        assert_eq!(f("1000"), "1,000");
        assert_eq!(f("64600000"), "64,600,000");
        assert_eq!(f("-1234567.50"), "-1,234,567.50");
        assert_eq!(f("280000"), "280,000");
    }
}
