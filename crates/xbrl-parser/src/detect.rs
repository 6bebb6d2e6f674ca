//! Input sniffing.

use xbrl_core::DocumentFormat;

/// Local file header signature of a ZIP archive.
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Markers whose presence identifies inline XBRL.
const INLINE_MARKERS: &[&str] = &[
    "ix:header",
    "ix:nonFraction",
    "ix:nonNumeric",
    "http://www.xbrl.org/2013/inlineXBRL",
    "http://www.xbrl.org/2008/inlineXBRL",
];

/// How a byte buffer should be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// ZIP package.
    Package,
    /// A single document, parsed by the XML or inline parser.
    Document,
}

/// Returns true if `bytes` start with the ZIP local file header signature.
#[must_use]
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Routes raw input.
///
/// The ZIP signature always selects the package handler, whatever the hints
/// say. Without it, a `.zip` URI suffix or a zip content type does.
#[must_use]
pub fn classify_input(bytes: &[u8], uri: Option<&str>, content_type: Option<&str>) -> InputKind {
    let zip_uri = uri.is_some_and(|u| {
        let path = u.split(['?', '#']).next().unwrap_or(u);
        path.to_ascii_lowercase().ends_with(".zip")
    });
    let zip_type = content_type.is_some_and(|t| t.to_ascii_lowercase().contains("zip"));
    if is_zip(bytes) || zip_uri || zip_type {
        InputKind::Package
    } else {
        InputKind::Document
    }
}

/// Drops a UTF-8 byte order mark.
#[must_use]
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Detects the format of decoded document text.
#[must_use]
pub fn detect_format(text: &str) -> DocumentFormat {
    if INLINE_MARKERS.iter().any(|m| text.contains(m)) {
        DocumentFormat::InlineXbrl
    } else if root_local_name(text).is_some_and(|n| n == "xbrl") {
        DocumentFormat::Xbrl
    } else {
        DocumentFormat::Unknown
    }
}

/// Local name of the first element, skipping the prolog, comments and DOCTYPE.
#[must_use]
pub fn root_local_name(text: &str) -> Option<&str> {
    let mut rest = text.trim_start_matches('\u{FEFF}');
    loop {
        let start = rest.find('<')?;
        rest = &rest[start..];
        if rest.starts_with("<?") {
            rest = &rest[rest.find("?>")? + 2..];
        } else if rest.starts_with("<!--") {
            rest = &rest[rest.find("-->")? + 3..];
        } else if rest.starts_with("<!") {
            rest = &rest[rest.find('>')? + 1..];
        } else {
            let name: &str = rest[1..]
                .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .next()?;
            return Some(name.rsplit(':').next().unwrap_or(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"PK\x03\x04rest", None, None, InputKind::Package)]
    // The magic number wins over misleading hints
    #[case(b"PK\x03\x04rest", Some("filing.xml"), Some("text/xml"), InputKind::Package)]
    #[case(b"<xbrl/>", Some("https://x/filing.ZIP"), None, InputKind::Package)]
    #[case(b"<xbrl/>", None, Some("application/zip"), InputKind::Package)]
    #[case(b"<xbrl/>", Some("filing.xml"), Some("application/xml"), InputKind::Document)]
    #[case(b"PK\x03", None, None, InputKind::Document)]
    fn test_classify_input(
        #[case] bytes: &[u8],
        #[case] uri: Option<&str>,
        #[case] content_type: Option<&str>,
        #[case] expected: InputKind,
    ) {
        assert_eq!(classify_input(bytes, uri, content_type), expected);
    }

    #[rstest]
    #[case(r#"<?xml version="1.0"?><xbrli:xbrl xmlns:xbrli="x"/>"#, DocumentFormat::Xbrl)]
    #[case("<!-- generated --><xbrl>", DocumentFormat::Xbrl)]
    #[case(
        r#"<html xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"><body/></html>"#,
        DocumentFormat::InlineXbrl
    )]
    #[case("<html><body><ix:nonFraction/></body></html>", DocumentFormat::InlineXbrl)]
    #[case("<html><body>plain</body></html>", DocumentFormat::Unknown)]
    #[case("not xml at all", DocumentFormat::Unknown)]
    fn test_detect_format(#[case] text: &str, #[case] expected: DocumentFormat) {
        assert_eq!(detect_format(text), expected);
    }

    #[test]
    fn test_root_skips_doctype() {
        let text = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0//EN\"><html>";
        assert_eq!(root_local_name(text), Some("html"));
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBF<x/>"), b"<x/>");
        assert_eq!(strip_bom(b"<x/>"), b"<x/>");
    }
}
