//! Inline XBRL number transformations (`ixt:` / `ixt-sec:` formats).

use thiserror::Error;

/// Why a displayed value could not be turned into a number.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("cannot apply '{format}' to '{text}'")]
pub struct TransformError {
    /// Format that was applied.
    pub format: String,
    /// Displayed text.
    pub text: String,
}

/// Words that `numwordsen` maps to zero.
const ZERO_WORDS: &[&str] = &["none", "no", "zero", "nil"];

/// Small number words understood by `numwordsen`.
const NUMBER_WORDS: &[(&str, f64)] = &[
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
];

/// Converts the displayed text of an `ix:nonFraction` to a number.
///
/// `format` is the QName from the `format` attribute; only its local part is
/// used. Without a format the text is read as `num-dot-decimal`. The result
/// is unsigned display magnitude unless the text itself is parenthesized,
/// which negates it; the `sign` attribute is applied separately.
pub fn apply_format(format: Option<&str>, text: &str) -> Result<f64, TransformError> {
    let local = format
        .map(|f| f.rsplit(':').next().unwrap_or(f))
        .unwrap_or("num-dot-decimal");
    let trimmed = text.trim();
    let fail = || TransformError {
        format: local.to_string(),
        text: trimmed.to_string(),
    };

    match local {
        "fixed-zero" | "fixedzero" | "zerodash" | "fixed-empty" => Ok(0.0),
        "numwordsen" | "num-word-en" => {
            let word = trimmed.trim_end_matches('.').to_ascii_lowercase();
            if ZERO_WORDS.contains(&word.as_str()) || is_dash(&word) {
                Ok(0.0)
            } else if let Some((_, v)) = NUMBER_WORDS.iter().find(|(w, _)| *w == word) {
                Ok(*v)
            } else {
                parse_grouped(trimmed, ',', '.').ok_or_else(fail)
            }
        }
        "num-comma-decimal" | "numcommadecimal" | "numdotcomma" | "numspacecomma" => {
            parse_grouped(trimmed, '.', ',').ok_or_else(fail)
        }
        "num-dot-decimal" | "numdotdecimal" | "numcommadot" | "numspacedot" | "num-unit-decimal" => {
            parse_grouped(trimmed, ',', '.').ok_or_else(fail)
        }
        // Unknown formats: best effort with the US convention
        _ => parse_grouped(trimmed, ',', '.').ok_or_else(fail),
    }
}

/// Parses a plain `xsd:decimal` lexical value as found in standalone instances.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_dash(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| matches!(c, '-' | '\u{2013}' | '\u{2014}'))
}

/// Parses display text with the given group and decimal separators.
///
/// A lone dash reads as zero; surrounding parentheses negate.
fn parse_grouped(text: &str, group: char, decimal: char) -> Option<f64> {
    let text = text.trim();
    if is_dash(text) {
        return Some(0.0);
    }
    let (negative, body) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, text),
    };

    let mut normalized = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            c if c == group => {}
            c if c == decimal => normalized.push('.'),
            '0'..='9' | '-' | '+' => normalized.push(c),
            ' ' | '\u{a0}' | '$' | '\u{20ac}' | '\u{a3}' | '%' => {}
            _ => return None,
        }
    }
    let value = parse_decimal(&normalized)?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, "1,234,567", 1_234_567.0)]
    #[case(Some("ixt:num-dot-decimal"), "1,234.56", 1234.56)]
    #[case(Some("ixt:numdotdecimal"), " 12,000 ", 12_000.0)]
    #[case(Some("ixt:num-comma-decimal"), "1.234,5", 1234.5)]
    #[case(Some("ixt:fixed-zero"), "-", 0.0)]
    #[case(Some("ixt:zerodash"), "\u{2014}", 0.0)]
    #[case(Some("ixt-sec:numwordsen"), "None", 0.0)]
    #[case(Some("ixt-sec:numwordsen"), "no", 0.0)]
    #[case(Some("ixt-sec:numwordsen"), "three", 3.0)]
    #[case(Some("ixt:num-dot-decimal"), "(1,500)", -1500.0)]
    #[case(Some("ixt:num-dot-decimal"), "\u{2014}", 0.0)]
    #[case(Some("ixt:num-dot-decimal"), "$ 42", 42.0)]
    fn test_apply_format(#[case] format: Option<&str>, #[case] text: &str, #[case] expected: f64) {
        assert_relative_eq!(apply_format(format, text).unwrap(), expected);
    }

    #[rstest]
    #[case(Some("ixt:num-dot-decimal"), "n/a")]
    #[case(None, "")]
    #[case(Some("ixt-sec:numwordsen"), "several")]
    fn test_apply_format_rejects(#[case] format: Option<&str>, #[case] text: &str) {
        assert!(apply_format(format, text).is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 1000 "), Some(1000.0));
        assert_eq!(parse_decimal("-12.5"), Some(-12.5));
        assert_eq!(parse_decimal("1,000"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal(""), None);
    }
}
