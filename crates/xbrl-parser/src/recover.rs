//! Tolerant clean-up of malformed markup before a second parse attempt.
//!
//! SEC filings are frequently almost-XML: HTML named entities, bare `&`,
//! unclosed void elements, DOCTYPE declarations and prefixes used without a
//! declaration. [`sanitize`] rewrites those constructs so a strict XML parser
//! accepts the document.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use xbrl_core::{Result, XbrlError, namespaces};

/// Output of [`sanitize`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sanitized {
    /// Rewritten text.
    pub text: String,
    /// Undeclared prefixes bound through the well-known namespace table.
    pub namespace_fallbacks: usize,
    /// Undeclared prefixes bound to a placeholder URN.
    pub unknown_prefixes: Vec<String>,
}

/// HTML entities outside the five XML builtins, as code points.
const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("iexcl", 161),
    ("cent", 162),
    ("pound", 163),
    ("curren", 164),
    ("yen", 165),
    ("brvbar", 166),
    ("sect", 167),
    ("uml", 168),
    ("copy", 169),
    ("ordf", 170),
    ("laquo", 171),
    ("not", 172),
    ("shy", 173),
    ("reg", 174),
    ("macr", 175),
    ("deg", 176),
    ("plusmn", 177),
    ("sup2", 178),
    ("sup3", 179),
    ("acute", 180),
    ("micro", 181),
    ("para", 182),
    ("middot", 183),
    ("sup1", 185),
    ("ordm", 186),
    ("raquo", 187),
    ("frac14", 188),
    ("frac12", 189),
    ("frac34", 190),
    ("iquest", 191),
    ("eacute", 233),
    ("times", 215),
    ("divide", 247),
    ("ensp", 8194),
    ("emsp", 8195),
    ("thinsp", 8201),
    ("zwnj", 8204),
    ("zwj", 8205),
    ("ndash", 8211),
    ("mdash", 8212),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("sbquo", 8218),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("bdquo", 8222),
    ("dagger", 8224),
    ("Dagger", 8225),
    ("bull", 8226),
    ("hellip", 8230),
    ("permil", 8240),
    ("prime", 8242),
    ("euro", 8364),
    ("trade", 8482),
];

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

type Pattern = Lazy<std::result::Result<Regex, regex::Error>>;

static DOCTYPE: Pattern = Lazy::new(|| Regex::new(r"(?is)<!DOCTYPE[^\[>]*(\[.*?\])?\s*>"));
static VOID_ELEMENT: Pattern = Lazy::new(|| {
    Regex::new(r"(?i)<(br|hr|img|meta|input|col|area|base|wbr)(\s[^<>]*?)?\s*/?>")
});
static USED_PREFIX: Pattern = Lazy::new(|| {
    Regex::new(r"<\s*/?([A-Za-z_][\w.\-]*):[A-Za-z_]|\s([A-Za-z_][\w.\-]*):[\w.\-]+\s*=")
});
static DECLARED_PREFIX: Pattern = Lazy::new(|| Regex::new(r"xmlns:([A-Za-z_][\w.\-]*)\s*="));

/// Rewrites malformed markup into well-formed XML where possible.
pub fn sanitize(text: &str) -> Result<Sanitized> {
    let doctype = pattern(&DOCTYPE)?;
    let void = pattern(&VOID_ELEMENT)?;

    let text = doctype.replace_all(text, "");
    let text: String = text.chars().filter(|c| !is_forbidden_char(*c)).collect();
    let text = escape_entities(&text);
    let text = void.replace_all(&text, "<$1$2/>").into_owned();

    declare_missing_prefixes(text)
}

fn pattern(compiled: &'static Pattern) -> Result<&'static Regex> {
    Lazy::force(compiled)
        .as_ref()
        .map_err(|e| XbrlError::Parse(format!("recovery pattern: {e}")))
}

fn is_forbidden_char(c: char) -> bool {
    (c < ' ' && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{FFFE}' | '\u{FFFF}')
}

/// Maps HTML entities to character references and escapes stray ampersands.
fn escape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        match reference_name(rest) {
            Some(name) if is_char_reference(name) || XML_ENTITIES.contains(&name) => {
                out.push('&');
            }
            Some(name) => match HTML_ENTITIES.iter().find(|(n, _)| *n == name) {
                Some((_, code)) => {
                    out.push_str(&format!("&#{code};"));
                    rest = &rest[name.len() + 1..];
                }
                None => out.push_str("&amp;"),
            },
            None => out.push_str("&amp;"),
        }
    }
    out.push_str(rest);
    out
}

/// The text between `&` and the next `;` when it looks like a reference.
fn reference_name(after_amp: &str) -> Option<&str> {
    let end = after_amp.find(';')?;
    let name = &after_amp[..end];
    let valid = !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '#');
    valid.then_some(name)
}

fn is_char_reference(name: &str) -> bool {
    match name.strip_prefix('#') {
        Some(hex) if hex.starts_with(['x', 'X']) => {
            hex.len() > 1 && hex[1..].chars().all(|c| c.is_ascii_hexdigit())
        }
        Some(dec) => !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Adds `xmlns` declarations on the root element for prefixes used but never declared.
fn declare_missing_prefixes(text: String) -> Result<Sanitized> {
    let used_re = pattern(&USED_PREFIX)?;
    let declared_re = pattern(&DECLARED_PREFIX)?;

    let declared: BTreeSet<&str> = declared_re
        .captures_iter(&text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let missing: BTreeSet<String> = used_re
        .captures_iter(&text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str()))
        .filter(|p| !matches!(*p, "xml" | "xmlns") && !declared.contains(p))
        .map(str::to_string)
        .collect();

    let mut sanitized = Sanitized::default();
    let Some(insert_at) = (!missing.is_empty())
        .then(|| root_name_end(&text))
        .flatten()
    else {
        sanitized.text = text;
        return Ok(sanitized);
    };

    let mut declarations = String::new();
    for prefix in &missing {
        let uri = match namespaces::well_known(prefix) {
            Some(uri) => {
                sanitized.namespace_fallbacks += 1;
                uri.to_string()
            }
            None => {
                sanitized.unknown_prefixes.push(prefix.clone());
                format!("urn:xbrl:undeclared:{prefix}")
            }
        };
        declarations.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
    }

    let mut out = String::with_capacity(text.len() + declarations.len());
    out.push_str(&text[..insert_at]);
    out.push_str(&declarations);
    out.push_str(&text[insert_at..]);
    sanitized.text = out;
    Ok(sanitized)
}

/// Byte offset just past the root element's name.
fn root_name_end(text: &str) -> Option<usize> {
    let mut offset = 0;
    loop {
        let start = offset + text[offset..].find('<')?;
        let rest = &text[start..];
        if rest.starts_with("<?") {
            offset = start + rest.find("?>")? + 2;
        } else if rest.starts_with("<!--") {
            offset = start + rest.find("-->")? + 3;
        } else if rest.starts_with("<!") {
            offset = start + rest.find('>')? + 1;
        } else {
            let name_len = rest[1..]
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len() - 1);
            return Some(start + 1 + name_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities() {
        assert_eq!(escape_entities("a&nbsp;b"), "a&#160;b");
        assert_eq!(escape_entities("AT&T"), "AT&amp;T");
        assert_eq!(escape_entities("x &amp; y &#8212; z &#x2014;"), "x &amp; y &#8212; z &#x2014;");
        assert_eq!(escape_entities("&bogus;"), "&amp;bogus;");
        assert_eq!(escape_entities("trailing &"), "trailing &amp;");
    }

    #[test]
    fn test_patterns_compile_once() {
        for compiled in [&DOCTYPE, &VOID_ELEMENT, &USED_PREFIX, &DECLARED_PREFIX] {
            let first = pattern(compiled).unwrap();
            assert!(std::ptr::eq(first, pattern(compiled).unwrap()));
        }
    }

    #[test]
    fn test_doctype_and_void_elements() {
        let input = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"x.dtd\">\
                     <html><body>line<br>next<hr class=\"x\"><img src=\"a.png\"/></body></html>";
        let out = sanitize(input).unwrap();
        assert!(!out.text.contains("DOCTYPE"));
        assert!(out.text.contains("<br/>"));
        assert!(out.text.contains("<hr class=\"x\"/>"));
        assert!(out.text.contains("<img src=\"a.png\"/>"));
    }

    #[test]
    fn test_control_characters_removed() {
        let out = sanitize("<a>x\u{0}y\u{1b}z\n</a>").unwrap();
        assert_eq!(out.text, "<a>xyz\n</a>");
    }

    #[test]
    fn test_missing_prefixes_declared() {
        let input = r#"<?xml version="1.0"?><xbrl xmlns="http://www.xbrl.org/2003/instance"><us-gaap:Assets contextRef="c">1</us-gaap:Assets><acme:Thing contextRef="c">2</acme:Thing></xbrl>"#;
        let out = sanitize(input).unwrap();
        assert_eq!(out.namespace_fallbacks, 1);
        assert_eq!(out.unknown_prefixes, vec!["acme".to_string()]);
        assert!(out.text.contains(r#"<xbrl xmlns:acme="urn:xbrl:undeclared:acme" xmlns:us-gaap="http://fasb.org/us-gaap/2024" xmlns="#));
        assert!(roxmltree::Document::parse(&out.text).is_ok());
    }

    #[test]
    fn test_well_formed_input_untouched() {
        let input = r#"<root xmlns:a="urn:a"><a:b>1 &amp; 2</a:b></root>"#;
        let out = sanitize(input).unwrap();
        assert_eq!(out.text, input);
        assert_eq!(out.namespace_fallbacks, 0);
    }
}
