//! Entry point tying detection, decoding, recovery and the format parsers together.

use roxmltree::{Document, ParsingOptions};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use xbrl_core::{
    DocumentFormat, IssueCode, ParseIssue, ParseResult, Result, XbrlFact, XbrlInstance,
    fetch::DEFAULT_MAX_DOCUMENT_BYTES,
};
use xbrl_taxonomy::TaxonomyResolver;

use crate::detect::{InputKind, classify_input, detect_format};
use crate::encoding::decode;
use crate::package::{self, ParsedPackage};
use crate::recover::sanitize;
use crate::stream::{self, FactStream};
use crate::{inline, xml};

fn parsing_options() -> ParsingOptions {
    ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    }
}

/// Parses XBRL instances, inline XBRL documents and filing packages.
///
/// The parser is cheap to clone and holds no per-document state; every
/// call produces a fresh [`XbrlInstance`] with its own [`ParseResult`].
#[derive(Clone, Debug)]
pub struct XbrlParser {
    resolver: Arc<TaxonomyResolver>,
    max_entry_bytes: usize,
}

impl Default for XbrlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl XbrlParser {
    /// Creates a parser with a fresh resolver and no remote schema loading.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(TaxonomyResolver::new()))
    }

    /// Creates a parser sharing `resolver`.
    #[must_use]
    pub const fn with_resolver(resolver: Arc<TaxonomyResolver>) -> Self {
        Self {
            resolver,
            max_entry_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Caps the uncompressed size of a package entry.
    #[must_use]
    pub const fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    /// The resolver used for fact types.
    pub const fn resolver(&self) -> &Arc<TaxonomyResolver> {
        &self.resolver
    }

    /// Largest package entry that will be parsed.
    pub const fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
    }

    /// Parses a document or package.
    ///
    /// `uri` and `content_type` only help to recognize ZIP packages; the
    /// magic number decides first. Errors are returned only when no instance
    /// could be produced at all; otherwise check `parse_result.success`.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn parse_bytes(
        &self,
        bytes: &[u8],
        uri: &str,
        content_type: Option<&str>,
    ) -> Result<XbrlInstance> {
        match classify_input(bytes, Some(uri), content_type) {
            InputKind::Package => self.parse_package(bytes, uri).map(ParsedPackage::into_primary),
            InputKind::Document => Ok(self.parse_document(bytes, uri)),
        }
    }

    /// Parses a ZIP filing package.
    pub fn parse_package(&self, bytes: &[u8], uri: &str) -> Result<ParsedPackage> {
        package::parse(self, bytes, uri)
    }

    /// Parses a single document, decoding it first.
    #[must_use]
    pub fn parse_document(&self, bytes: &[u8], uri: &str) -> XbrlInstance {
        let mut result = ParseResult::new();
        let text = decode(bytes, &mut result);
        self.parse_text(&text, uri, result)
    }

    /// Parses an already decoded document.
    #[must_use]
    pub fn parse_str(&self, text: &str, uri: &str) -> XbrlInstance {
        self.parse_text(text, uri, ParseResult::new())
    }

    fn parse_text(&self, text: &str, uri: &str, result: ParseResult) -> XbrlInstance {
        let mut instance = XbrlInstance::new(uri, DocumentFormat::Unknown);
        instance.parse_result = result;

        let format = detect_format(text);
        if format == DocumentFormat::Unknown {
            warn!(uri, "Document is neither XBRL nor inline XBRL");
            instance.parse_result.error(ParseIssue::new(
                IssueCode::MissingRootElement,
                "no xbrl root element and no inline XBRL markers",
            ));
            return instance;
        }

        match Document::parse_with_options(text, parsing_options()) {
            Ok(doc) => self.dispatch(&doc, format, instance),
            Err(first) => {
                warn!(uri, error = %first, "Malformed document, retrying with recovery");
                let recovered = match sanitize(text) {
                    Ok(recovered) => recovered,
                    Err(e) => {
                        instance.parse_result.error(
                            ParseIssue::new(IssueCode::MalformedXml, "document is not well-formed")
                                .caused_by(e),
                        );
                        return instance;
                    }
                };
                let result = &mut instance.parse_result;
                result.malformed_recoveries += 1;
                result.namespace_fallbacks += recovered.namespace_fallbacks;
                result.warn(
                    ParseIssue::new(IssueCode::MalformedXml, "document recovered after sanitizing")
                        .at_line(Some(first.pos().row as usize))
                        .caused_by(&first),
                );
                for prefix in &recovered.unknown_prefixes {
                    result.warn(ParseIssue::new(
                        IssueCode::MalformedXml,
                        format!("prefix '{prefix}' is undeclared and unknown"),
                    ));
                }

                match Document::parse_with_options(&recovered.text, parsing_options()) {
                    Ok(doc) => self.dispatch(&doc, format, instance),
                    Err(e) => {
                        debug!(uri, error = %e, "Recovery parse failed");
                        instance.parse_result.error(
                            ParseIssue::new(
                                IssueCode::MalformedXml,
                                "document is not well-formed after recovery",
                            )
                            .at_line(Some(e.pos().row as usize))
                            .caused_by(e),
                        );
                        instance
                    }
                }
            }
        }
    }

    fn dispatch(&self, doc: &Document<'_>, format: DocumentFormat, instance: XbrlInstance) -> XbrlInstance {
        match format {
            DocumentFormat::InlineXbrl => inline::parse(doc, &self.resolver, instance),
            _ => xml::parse(doc, &self.resolver, instance),
        }
    }

    /// Streams facts from `reader` without building an instance.
    pub fn stream<R: BufRead>(&self, reader: R) -> FactStream<R> {
        FactStream::new(reader, Arc::clone(&self.resolver))
    }

    /// Streams every fact to `handler` and returns the final statistics.
    pub fn parse_with_callback<R, F>(&self, reader: R, handler: F) -> ParseResult
    where
        R: BufRead,
        F: FnMut(XbrlFact),
    {
        stream::parse_with_callback(reader, Arc::clone(&self.resolver), handler)
    }

    /// Counts fact elements without parsing values.
    pub fn count_facts<R: BufRead>(&self, reader: R) -> usize {
        stream::count_facts(reader)
    }
}
