//! Character encoding detection.
//!
//! The chain is: the encoding declared in the XML declaration (or an HTML
//! `charset`), then a byte order mark, then UTF-8. Abandoning a declared
//! encoding counts as an encoding recovery.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::borrow::Cow;
use tracing::warn;
use xbrl_core::{IssueCode, ParseIssue, ParseResult};

/// Bytes searched for an encoding declaration.
const PROLOG_WINDOW: usize = 1024;

/// Decodes document bytes to text, recording fallbacks on `result`.
pub fn decode<'a>(bytes: &'a [u8], result: &mut ParseResult) -> Cow<'a, str> {
    if let Some(label) = declared_encoding(bytes) {
        match declared_decode(bytes, &label) {
            Ok(text) => return text,
            Err(reason) => {
                warn!(encoding = %label, %reason, "Declared encoding abandoned");
                result.encoding_recoveries += 1;
                result.warn(
                    ParseIssue::new(
                        IssueCode::EncodingFallback,
                        format!("declared encoding '{label}' not usable"),
                    )
                    .caused_by(reason),
                );
            }
        }
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }

    String::from_utf8_lossy(bytes)
}

fn declared_decode<'a>(bytes: &'a [u8], label: &str) -> Result<Cow<'a, str>, String> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| format!("unknown encoding label '{label}'"))?;
    // A UTF-16 label readable as ASCII is a mislabel unless a BOM says otherwise
    if (encoding == UTF_16LE || encoding == UTF_16BE) && Encoding::for_bom(bytes).is_none() {
        return Err("UTF-16 declared in an ASCII-compatible document".to_string());
    }
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(format!("invalid {} byte sequence", used.name()));
    }
    Ok(text)
}

/// The encoding named by the XML declaration or an HTML meta charset.
#[must_use]
pub fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(PROLOG_WINDOW)];
    let head = String::from_utf8_lossy(window);

    let from_decl = head
        .find("<?xml")
        .and_then(|start| {
            let decl = &head[start..];
            let end = decl.find("?>")?;
            attribute_value(&decl[..end], "encoding")
        });
    from_decl.or_else(|| {
        let lower = head.to_ascii_lowercase();
        let pos = lower.find("charset=")?;
        let value = head[pos + "charset=".len()..].trim_start_matches(['"', '\'']);
        let end = value
            .find(|c: char| c == '"' || c == '\'' || c == ';' || c == '>' || c.is_whitespace())
            .unwrap_or(value.len());
        (end > 0).then(|| value[..end].to_string())
    })
}

fn attribute_value(tag: &str, name: &str) -> Option<String> {
    let pos = tag.find(name)?;
    let rest = tag[pos + name.len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    Some(value[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_latin1() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><x>"#.to_vec();
        bytes.push(0xE9); // e acute
        bytes.extend_from_slice(b"</x>");

        let mut result = ParseResult::new();
        let text = decode(&bytes, &mut result);
        assert!(text.contains("<x>\u{e9}</x>"));
        assert_eq!(result.encoding_recoveries, 0);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let bytes = br#"<?xml version="1.0" encoding="x-made-up"?><x>ok</x>"#;
        let mut result = ParseResult::new();
        let text = decode(bytes, &mut result);
        assert!(text.contains("<x>ok</x>"));
        assert_eq!(result.encoding_recoveries, 1);
        assert_eq!(result.warnings[0].code, IssueCode::EncodingFallback);
        assert!(result.success);
    }

    #[test]
    fn test_invalid_utf8_under_utf8_label() {
        let mut bytes = br#"<?xml version="1.0" encoding="UTF-8"?><x>"#.to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"</x>");
        let mut result = ParseResult::new();
        let text = decode(&bytes, &mut result);
        assert!(text.contains('\u{FFFD}'));
        assert_eq!(result.encoding_recoveries, 1);
    }

    #[test]
    fn test_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<x>hi</x>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut result = ParseResult::new();
        assert_eq!(decode(&bytes, &mut result), "<x>hi</x>");
        assert_eq!(result.encoding_recoveries, 0);
    }

    #[test]
    fn test_mislabelled_utf16() {
        let bytes = br#"<?xml version="1.0" encoding="UTF-16"?><x>ok</x>"#;
        let mut result = ParseResult::new();
        assert!(decode(bytes, &mut result).contains("<x>ok</x>"));
        assert_eq!(result.encoding_recoveries, 1);
    }

    #[test]
    fn test_html_meta_charset() {
        let head = br#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=windows-1252"></head>"#;
        assert_eq!(declared_encoding(head).as_deref(), Some("windows-1252"));
        assert!(declared_encoding(b"<xbrl/>").is_none());
    }
}
