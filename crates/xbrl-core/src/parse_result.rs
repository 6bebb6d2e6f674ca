//! Parse statistics and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a parse warning or error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    /// A fact references a context that does not exist.
    UnknownContext,
    /// A fact references a unit that does not exist.
    UnknownUnit,
    /// A numeric fact value could not be parsed.
    InvalidNumber,
    /// A context element is incomplete or has an invalid period.
    InvalidContext,
    /// A unit element has no usable measure.
    InvalidUnit,
    /// The document is not well-formed XML.
    MalformedXml,
    /// The declared encoding could not be used.
    EncodingFallback,
    /// The root element is neither an instance nor inline XBRL.
    MissingRootElement,
    /// An inline continuation chain is broken or cyclic.
    UnresolvedContinuation,
    /// A package entry could not be read or parsed.
    PackageEntry,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::UnknownContext => "UNKNOWN_CONTEXT",
            Self::UnknownUnit => "UNKNOWN_UNIT",
            Self::InvalidNumber => "INVALID_NUMBER",
            Self::InvalidContext => "INVALID_CONTEXT",
            Self::InvalidUnit => "INVALID_UNIT",
            Self::MalformedXml => "MALFORMED_XML",
            Self::EncodingFallback => "ENCODING_FALLBACK",
            Self::MissingRootElement => "MISSING_ROOT_ELEMENT",
            Self::UnresolvedContinuation => "UNRESOLVED_CONTINUATION",
            Self::PackageEntry => "PACKAGE_ENTRY",
        };
        f.write_str(code)
    }
}

/// A single warning or error found while parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    /// Issue category.
    pub code: IssueCode,
    /// Human readable description.
    pub message: String,
    /// 1-based line in the source document, when known.
    pub line: Option<usize>,
    /// Underlying error message, when the issue was caused by one.
    pub cause: Option<String>,
}

impl ParseIssue {
    /// Creates an issue.
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
            cause: None,
        }
    }

    /// Sets the line number.
    #[must_use]
    pub const fn at_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    /// Sets the underlying cause.
    #[must_use]
    pub fn caused_by(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Statistics and diagnostics for one parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// False once any error has been recorded.
    pub success: bool,
    /// Fact elements encountered.
    pub facts_found: usize,
    /// Facts successfully turned into [`XbrlFact`](crate::XbrlFact)s.
    pub facts_parsed: usize,
    /// Facts dropped because of a warning.
    pub facts_skipped: usize,
    /// Contexts parsed.
    pub contexts: usize,
    /// Units parsed.
    pub units: usize,
    /// Inline facts found nested inside another inline fact.
    pub nested_facts: usize,
    /// Inline continuation elements joined into facts.
    pub continuations_resolved: usize,
    /// Prefixes resolved through the well-known namespace table.
    pub namespace_fallbacks: usize,
    /// Times the declared encoding had to be abandoned.
    pub encoding_recoveries: usize,
    /// Times a tolerant re-parse was needed.
    pub malformed_recoveries: usize,
    /// Warnings in the order they were found.
    pub warnings: Vec<ParseIssue>,
    /// Errors in the order they were found.
    pub errors: Vec<ParseIssue>,
}

impl Default for ParseResult {
    fn default() -> Self {
        Self {
            success: true,
            facts_found: 0,
            facts_parsed: 0,
            facts_skipped: 0,
            contexts: 0,
            units: 0,
            nested_facts: 0,
            continuations_resolved: 0,
            namespace_fallbacks: 0,
            encoding_recoveries: 0,
            malformed_recoveries: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl ParseResult {
    /// Creates an empty, successful result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn warn(&mut self, issue: ParseIssue) {
        self.warnings.push(issue);
    }

    /// Records an error and marks the parse as failed.
    pub fn error(&mut self, issue: ParseIssue) {
        self.success = false;
        self.errors.push(issue);
    }

    /// Records a fact that was dropped with a warning.
    pub fn skip_fact(&mut self, issue: ParseIssue) {
        self.facts_skipped += 1;
        self.warn(issue);
    }

    /// Parsed facts divided by found facts; 1.0 when no facts were found.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.facts_found == 0 {
            1.0
        } else {
            self.facts_parsed as f64 / self.facts_found as f64
        }
    }

    /// Folds the counters and issues of another parse into this one.
    pub fn merge(&mut self, other: &Self) {
        self.success &= other.success;
        self.facts_found += other.facts_found;
        self.facts_parsed += other.facts_parsed;
        self.facts_skipped += other.facts_skipped;
        self.contexts += other.contexts;
        self.units += other.units;
        self.nested_facts += other.nested_facts;
        self.continuations_resolved += other.continuations_resolved;
        self.namespace_fallbacks += other.namespace_fallbacks;
        self.encoding_recoveries += other.encoding_recoveries;
        self.malformed_recoveries += other.malformed_recoveries;
        self.warnings.extend(other.warnings.iter().cloned());
        self.errors.extend(other.errors.iter().cloned());
    }
}
