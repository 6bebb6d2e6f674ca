//! ZIP filing packages.
//!
//! EDGAR packages bundle the instance (inline or standalone) with its
//! extension schema, linkbases, exhibits and a `FilingSummary.xml`. Entries
//! are ranked so the inline document wins over a standalone instance; every
//! other instance document is parsed as a sibling.

use std::io::{Cursor, Read};
use tracing::{debug, warn};
use xbrl_core::{IssueCode, ParseIssue, ParseResult, Result, XbrlError, XbrlInstance};
use zip::ZipArchive;

use crate::parser::XbrlParser;

const LINKBASE_SUFFIXES: &[&str] = &["_cal.xml", "_def.xml", "_lab.xml", "_pre.xml", "_ref.xml"];
const INLINE_MARKERS: &[&[u8]] = &[b"ix:header", b"ix:nonFraction", b"ix:nonNumeric", b"inlineXBRL"];

/// The documents found in a filing package.
#[derive(Clone, Debug)]
pub struct ParsedPackage {
    /// Highest-ranked instance document.
    pub primary: XbrlInstance,
    /// Other instance documents, in rank order.
    pub siblings: Vec<XbrlInstance>,
    /// Names of `.xsd` entries.
    pub schema_files: Vec<String>,
    /// Names of linkbase entries.
    pub linkbase_files: Vec<String>,
    /// Every file entry in archive order.
    pub entries: Vec<String>,
    /// Package-level issues (unreadable or skipped entries).
    pub issues: ParseResult,
}

impl ParsedPackage {
    /// The primary document followed by its siblings.
    pub fn documents(&self) -> impl Iterator<Item = &XbrlInstance> {
        std::iter::once(&self.primary).chain(&self.siblings)
    }

    /// Consumes the package, keeping the primary document.
    #[must_use]
    pub fn into_primary(self) -> XbrlInstance {
        self.primary
    }
}

/// Rank of a candidate entry; lower is better.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Inline,
    Instance,
}

struct Candidate {
    rank: Rank,
    name: String,
    bytes: Vec<u8>,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn is_linkbase(lower: &str) -> bool {
    LINKBASE_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

fn rank(lower: &str, bytes: &[u8]) -> Option<Rank> {
    let html = [".htm", ".html", ".xhtml"].iter().any(|s| lower.ends_with(s));
    if html {
        return INLINE_MARKERS
            .iter()
            .any(|m| contains(bytes, m))
            .then_some(Rank::Inline);
    }
    if lower.ends_with(".xml") && !lower.ends_with("filingsummary.xml") && !is_linkbase(lower) {
        // Cheap root sniff; the parser reports anything stranger
        return (contains(bytes, b"<xbrl") || contains(bytes, b":xbrl")).then_some(Rank::Instance);
    }
    None
}

/// Reads a package and parses its instance documents.
pub(crate) fn parse(parser: &XbrlParser, bytes: &[u8], uri: &str) -> Result<ParsedPackage> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| XbrlError::Package(e.to_string()))?;

    let mut issues = ParseResult::new();
    let mut candidates = Vec::new();
    let mut schema_files = Vec::new();
    let mut linkbase_files = Vec::new();
    let mut entries = Vec::new();

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable package entry");
                issues.warn(
                    ParseIssue::new(IssueCode::PackageEntry, format!("entry #{index} is unreadable"))
                        .caused_by(e),
                );
                continue;
            }
        };
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        entries.push(name.clone());
        let lower = name.to_ascii_lowercase();

        if lower.ends_with(".xsd") {
            schema_files.push(name);
            continue;
        }
        if is_linkbase(&lower) {
            linkbase_files.push(name);
            continue;
        }
        if ![".htm", ".html", ".xhtml", ".xml"].iter().any(|s| lower.ends_with(s)) {
            continue;
        }
        if file.size() > parser.max_entry_bytes() as u64 {
            warn!(entry = %name, size = file.size(), "Skipping oversized package entry");
            issues.warn(ParseIssue::new(
                IssueCode::PackageEntry,
                format!("{name} exceeds {} bytes", parser.max_entry_bytes()),
            ));
            continue;
        }

        let mut buf = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        if let Err(e) = file.read_to_end(&mut buf) {
            warn!(entry = %name, error = %e, "Skipping corrupt package entry");
            issues.warn(
                ParseIssue::new(IssueCode::PackageEntry, format!("{name} could not be read"))
                    .caused_by(e),
            );
            continue;
        }
        if let Some(rank) = rank(&lower, &buf) {
            candidates.push(Candidate { rank, name, bytes: buf });
        }
    }

    // Stable sort keeps archive order within a rank
    candidates.sort_by_key(|c| c.rank);
    debug!(
        uri,
        entries = entries.len(),
        candidates = candidates.len(),
        "Read filing package"
    );

    let mut parsed = Vec::new();
    let mut failed = Vec::new();
    for candidate in candidates {
        let instance = parser.parse_document(&candidate.bytes, &format!("{uri}!/{}", candidate.name));
        if instance.parse_result.success {
            parsed.push(instance);
        } else {
            warn!(entry = %candidate.name, "Package entry failed to parse");
            issues.warn(ParseIssue::new(
                IssueCode::PackageEntry,
                format!("{} failed to parse", candidate.name),
            ));
            failed.push(instance);
        }
    }

    // A failed document is still reported when nothing parsed
    let mut documents = (if parsed.is_empty() { failed } else { parsed }).into_iter();
    let Some(mut primary) = documents.next() else {
        return Err(XbrlError::NoInstanceDocument);
    };
    let siblings = documents.collect();

    for name in &schema_files {
        if !primary.schema_refs.iter().any(|r| r.ends_with(name.as_str())) {
            primary.schema_refs.push(name.clone());
        }
    }
    for name in &linkbase_files {
        if !primary.linkbase_refs.iter().any(|r| r.ends_with(name.as_str())) {
            primary.linkbase_refs.push(name.clone());
        }
    }
    primary.parse_result.warnings.extend(issues.warnings.iter().cloned());

    Ok(ParsedPackage {
        primary,
        siblings,
        schema_files,
        linkbase_files,
        entries,
        issues,
    })
}
