//! Well-known XBRL namespaces.

/// XBRL instance namespace.
pub const XBRLI: &str = "http://www.xbrl.org/2003/instance";
/// XBRL linkbase namespace.
pub const LINK: &str = "http://www.xbrl.org/2003/linkbase";
/// XLink namespace.
pub const XLINK: &str = "http://www.w3.org/1999/xlink";
/// XBRL dimensions instance namespace.
pub const XBRLDI: &str = "http://xbrl.org/2006/xbrldi";
/// XML Schema instance namespace.
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// XML Schema namespace.
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Inline XBRL 1.1 namespace.
pub const IX: &str = "http://www.xbrl.org/2013/inlineXBRL";
/// Inline XBRL 1.0 namespace.
pub const IX_10: &str = "http://www.xbrl.org/2008/inlineXBRL";
/// XML namespace (`xml:lang`).
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefixes commonly used without (or with broken) declarations in SEC filings.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("xbrli", XBRLI),
    ("link", LINK),
    ("xlink", XLINK),
    ("xbrldi", XBRLDI),
    ("xsi", XSI),
    ("xs", XS),
    ("ix", IX),
    ("iso4217", "http://www.xbrl.org/2003/iso4217"),
    ("us-gaap", "http://fasb.org/us-gaap/2024"),
    ("dei", "http://xbrl.sec.gov/dei/2024"),
    ("srt", "http://fasb.org/srt/2024"),
    ("ifrs-full", "https://xbrl.ifrs.org/taxonomy/2024-03-27/ifrs-full"),
    ("country", "http://xbrl.sec.gov/country/2024"),
    ("currency", "http://xbrl.sec.gov/currency/2024"),
    ("exch", "http://xbrl.sec.gov/exch/2024"),
    ("naics", "http://xbrl.sec.gov/naics/2024"),
    ("sic", "http://xbrl.sec.gov/sic/2024"),
    ("stpr", "http://xbrl.sec.gov/stpr/2024"),
    ("ecd", "http://xbrl.sec.gov/ecd/2024"),
    ("cyd", "http://xbrl.sec.gov/cyd/2024"),
];

/// Namespace URI for a well-known prefix.
#[must_use]
pub fn well_known(prefix: &str) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// Returns true for any version of the SEC document and entity information namespace.
#[must_use]
pub fn is_dei(namespace: &str) -> bool {
    namespace.starts_with("http://xbrl.sec.gov/dei/") || namespace.ends_with("/dei")
}

/// Returns true for any version of the US GAAP namespace.
#[must_use]
pub fn is_us_gaap(namespace: &str) -> bool {
    namespace.starts_with("http://fasb.org/us-gaap/")
}

/// Returns true for either inline XBRL namespace.
#[must_use]
pub fn is_inline(namespace: &str) -> bool {
    namespace == IX || namespace == IX_10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known() {
        assert_eq!(well_known("xbrli"), Some(XBRLI));
        assert!(well_known("us-gaap").is_some());
        assert!(well_known("acme").is_none());
    }

    #[test]
    fn test_namespace_families() {
        assert!(is_dei("http://xbrl.sec.gov/dei/2023"));
        assert!(!is_dei("http://fasb.org/us-gaap/2023"));
        assert!(is_us_gaap("http://fasb.org/us-gaap/2023"));
        assert!(is_inline(IX_10));
    }
}
