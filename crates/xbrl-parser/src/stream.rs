//! Streaming fact extraction over `quick_xml`.
//!
//! [`FactStream`] pulls events from a [`BufRead`] and yields each fact as
//! soon as its closing tag is read, so memory stays bounded by the reader
//! buffer and the largest single fact rather than the document.
//!
//! Units are tracked as they stream past so facts after them get unit-based
//! types. Context references are not checked, since a context may legally
//! follow the facts that use them, and inline continuation chains are not
//! joined; use [`XbrlParser::parse_bytes`](crate::XbrlParser::parse_bytes)
//! when those matter.

use quick_xml::NsReader;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use std::collections::{HashMap, VecDeque};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, warn};
use xbrl_core::{
    DocumentFormat, IssueCode, Measure, ParseIssue, ParseResult, UnitKind, XbrlFact, XbrlUnit,
    namespaces,
};
use xbrl_taxonomy::TaxonomyResolver;

use crate::build::{NumberSyntax, complete, is_true, parse_accuracy};

#[derive(Debug)]
struct Attr {
    namespace: Option<String>,
    local: String,
    value: String,
}

/// Owned view of a start tag, detached from the reader buffer.
#[derive(Debug)]
struct Element {
    namespace: Option<String>,
    prefix: String,
    local: String,
    attrs: Vec<Attr>,
}

impl Element {
    fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.namespace.is_none() && a.local == local)
            .map(|a| a.value.as_str())
    }

    fn ns_attr(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local == local)
            .map(|a| a.value.as_str())
    }

    fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }

    fn is_ix(&self, local: &str) -> bool {
        self.is(namespaces::IX, local) || self.is(namespaces::IX_10, local)
    }

    fn is_xbrli(&self, local: &str) -> bool {
        self.local == local && matches!(self.namespace.as_deref(), None | Some(namespaces::XBRLI))
    }
}

fn bound(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

#[derive(Debug)]
struct OpenFact {
    fact: XbrlFact,
    numeric: bool,
    depth: usize,
}

#[derive(Debug, Default)]
struct OpenUnit {
    id: String,
    depth: usize,
    numerator: Vec<Measure>,
    denominator: Vec<Measure>,
    in_denominator: bool,
    measure: Option<String>,
}

impl OpenUnit {
    fn finish(mut self) -> Option<XbrlUnit> {
        if !self.denominator.is_empty() {
            return Some(XbrlUnit::divide(self.id, self.numerator, self.denominator));
        }
        match self.numerator.len() {
            0 => None,
            1 => self.numerator.pop().map(|m| XbrlUnit::simple(self.id, m)),
            _ => Some(XbrlUnit {
                id: self.id,
                kind: UnitKind::Multiply(self.numerator),
            }),
        }
    }
}

enum Step {
    Start(Element),
    Empty(Element),
    End,
    Text(String),
    Eof,
    Skip,
    Failed(String),
}

/// A lazy sequence of facts read from a document.
///
/// Each call to [`XbrlParser::stream`](crate::XbrlParser::stream) starts a
/// fresh pass; the stream itself is single-use.
pub struct FactStream<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    resolver: Arc<TaxonomyResolver>,
    format: DocumentFormat,
    depth: usize,
    exclude_depth: Option<usize>,
    units: HashMap<String, XbrlUnit>,
    unit: Option<OpenUnit>,
    open: Vec<OpenFact>,
    ready: VecDeque<XbrlFact>,
    result: ParseResult,
    done: bool,
}

impl<R: BufRead> std::fmt::Debug for FactStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactStream")
            .field("format", &self.format)
            .field("depth", &self.depth)
            .field("units", &self.units.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead> FactStream<R> {
    /// Starts streaming facts from `reader`.
    pub fn new(reader: R, resolver: Arc<TaxonomyResolver>) -> Self {
        let mut reader = NsReader::from_reader(reader);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            resolver,
            format: DocumentFormat::Unknown,
            depth: 0,
            exclude_depth: None,
            units: HashMap::new(),
            unit: None,
            open: Vec::new(),
            ready: VecDeque::new(),
            result: ParseResult::new(),
            done: false,
        }
    }

    /// Statistics so far; final once the stream is exhausted.
    pub const fn result(&self) -> &ParseResult {
        &self.result
    }

    /// Format detected from the root element.
    pub const fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Consumes the stream, returning its statistics.
    pub fn into_result(self) -> ParseResult {
        self.result
    }

    fn read(&mut self) -> Step {
        let mut buf = std::mem::take(&mut self.buf);
        let step = match self.reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => Step::Start(self.element(&e)),
            Ok(Event::Empty(e)) => Step::Empty(self.element(&e)),
            Ok(Event::End(_)) => Step::End,
            Ok(Event::Text(t)) => Step::Text(match t.unescape() {
                Ok(text) => text.into_owned(),
                Err(_) => String::from_utf8_lossy(&t).into_owned(),
            }),
            Ok(Event::CData(t)) => Step::Text(String::from_utf8_lossy(&t).into_owned()),
            Ok(Event::Eof) => Step::Eof,
            Ok(_) => Step::Skip,
            Err(e) => Step::Failed(format!(
                "{e} at byte {}",
                self.reader.error_position()
            )),
        };
        buf.clear();
        self.buf = buf;
        step
    }

    fn element(&self, e: &BytesStart<'_>) -> Element {
        let (resolved, local) = self.reader.resolve_element(e.name());
        let prefix = e
            .name()
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
            .unwrap_or_default();
        let attrs = e
            .attributes()
            .flatten()
            .map(|a| {
                let (resolved, local) = self.reader.resolve_attribute(a.key);
                Attr {
                    namespace: bound(resolved),
                    local: String::from_utf8_lossy(local.as_ref()).into_owned(),
                    value: a
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned()),
                }
            })
            .collect();
        Element {
            namespace: bound(resolved),
            prefix,
            local: String::from_utf8_lossy(local.as_ref()).into_owned(),
            attrs,
        }
    }

    /// Resolves a QName found in content or an attribute value.
    fn resolve(&mut self, qname: &str) -> (String, String, String) {
        let qname = qname.trim();
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        let (resolved, _) = self.reader.resolve_element(QName(qname.as_bytes()));
        let namespace = match bound(resolved) {
            Some(uri) => uri,
            None => match namespaces::well_known(prefix) {
                Some(uri) => {
                    self.result.namespace_fallbacks += 1;
                    uri.to_string()
                }
                None => String::new(),
            },
        };
        (namespace, prefix.to_string(), local.to_string())
    }

    fn start(&mut self, el: Element) {
        self.depth += 1;
        if self.format == DocumentFormat::Unknown {
            self.format = if el.local == "xbrl" {
                DocumentFormat::Xbrl
            } else {
                DocumentFormat::InlineXbrl
            };
        }
        if self.exclude_depth.is_some() {
            return;
        }

        if let Some(unit) = &mut self.unit {
            match el.local.as_str() {
                "unitDenominator" => unit.in_denominator = true,
                "unitNumerator" => unit.in_denominator = false,
                "measure" => unit.measure = Some(String::new()),
                _ => {}
            }
            return;
        }

        if el.is_xbrli("unit") {
            self.unit = Some(OpenUnit {
                id: el.attr("id").unwrap_or_default().to_string(),
                depth: self.depth,
                ..OpenUnit::default()
            });
        } else if el.is_xbrli("context") {
            self.result.contexts += 1;
        } else if el.is_ix("exclude") {
            self.exclude_depth = Some(self.depth);
        } else if self.format == DocumentFormat::InlineXbrl {
            if el.is_ix("nonFraction") || el.is_ix("nonNumeric") {
                self.open_inline(&el);
            }
        } else if self.depth >= 2
            && !matches!(
                el.namespace.as_deref(),
                Some(namespaces::XBRLI | namespaces::LINK)
            )
        {
            if let Some(context_ref) = el.attr("contextRef") {
                let namespace = el.namespace.clone().unwrap_or_default();
                let mut fact = XbrlFact::new(namespace, el.prefix.as_str(), el.local.as_str(), context_ref);
                Self::copy_attributes(&el, &mut fact);
                self.open.push(OpenFact {
                    fact,
                    numeric: false,
                    depth: self.depth,
                });
            }
        }
    }

    fn open_inline(&mut self, el: &Element) {
        let (Some(name), Some(context_ref)) = (el.attr("name"), el.attr("contextRef")) else {
            self.result.facts_found += 1;
            self.result.skip_fact(ParseIssue::new(
                IssueCode::UnknownContext,
                format!("ix:{} without name or contextRef", el.local),
            ));
            return;
        };
        let (namespace, prefix, local) = self.resolve(name);
        let mut fact = XbrlFact::new(namespace, prefix, local, context_ref);
        Self::copy_attributes(el, &mut fact);
        fact.format = el.attr("format").map(str::to_string);
        fact.scale = el.attr("scale").and_then(|s| s.trim().parse().ok());
        fact.sign = el.attr("sign").map(str::to_string);
        fact.is_nested = !self.open.is_empty();
        self.open.push(OpenFact {
            fact,
            numeric: el.local == "nonFraction",
            depth: self.depth,
        });
    }

    fn copy_attributes(el: &Element, fact: &mut XbrlFact) {
        fact.id = el.attr("id").map(str::to_string);
        fact.unit_ref = el.attr("unitRef").map(str::to_string);
        fact.decimals = parse_accuracy(el.attr("decimals"));
        fact.precision = parse_accuracy(el.attr("precision"));
        fact.is_nil = is_true(el.ns_attr(namespaces::XSI, "nil"));
        fact.language = el.ns_attr(namespaces::XML, "lang").map(str::to_string);
    }

    fn text(&mut self, text: &str) {
        if self.exclude_depth.is_some() {
            return;
        }
        if let Some(unit) = &mut self.unit {
            if let Some(measure) = &mut unit.measure {
                measure.push_str(text);
            }
            return;
        }
        let inline = self.format == DocumentFormat::InlineXbrl;
        let depth = self.depth;
        for open in &mut self.open {
            // Standalone facts only own their direct text
            if !inline && open.depth != depth {
                continue;
            }
            let raw = &mut open.fact.raw_value;
            if !raw.is_empty() && !open.numeric {
                raw.push(' ');
            }
            raw.push_str(text);
        }
    }

    fn end(&mut self) {
        if self.exclude_depth == Some(self.depth) {
            self.exclude_depth = None;
        } else if self.exclude_depth.is_some() {
            self.depth = self.depth.saturating_sub(1);
            return;
        }

        if let Some(measure) = self.unit.as_mut().and_then(|u| u.measure.take()) {
            let (namespace, _, local) = self.resolve(&measure);
            if let Some(unit) = &mut self.unit {
                let target = if unit.in_denominator {
                    &mut unit.denominator
                } else {
                    &mut unit.numerator
                };
                target.push(Measure::new(namespace, local));
            }
        } else if self.unit.as_ref().is_some_and(|u| u.depth == self.depth) {
            if let Some(unit) = self.unit.take().and_then(OpenUnit::finish) {
                self.result.units += 1;
                self.units.insert(unit.id.clone(), unit);
            } else {
                self.result.warn(ParseIssue::new(IssueCode::InvalidUnit, "unit has no measure"));
            }
        } else if self.open.last().is_some_and(|o| o.depth == self.depth) {
            if let Some(open) = self.open.pop() {
                self.finish(open);
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(&mut self, open: OpenFact) {
        self.result.facts_found += 1;
        let OpenFact {
            mut fact, numeric, ..
        } = open;
        fact.raw_value = fact.raw_value.trim().to_string();
        let unit = fact.unit_ref.as_deref().and_then(|id| self.units.get(id));
        let numeric = numeric || fact.unit_ref.is_some();
        let format = fact.format.clone();
        let syntax = if self.format == DocumentFormat::InlineXbrl && numeric {
            NumberSyntax::Inline(format.as_deref())
        } else {
            NumberSyntax::Decimal
        };
        match complete(fact, &self.resolver, unit, numeric, syntax) {
            Ok(fact) => {
                self.result.facts_parsed += 1;
                if fact.is_nested {
                    self.result.nested_facts += 1;
                }
                self.ready.push_back(fact);
            }
            Err(issue) => self.result.skip_fact(issue),
        }
    }

    fn step(&mut self) {
        match self.read() {
            Step::Start(el) => self.start(el),
            Step::Empty(el) => {
                self.start(el);
                self.end();
            }
            Step::End => self.end(),
            Step::Text(text) => self.text(&text),
            Step::Skip => {}
            Step::Eof => {
                self.done = true;
                if self.format == DocumentFormat::Unknown {
                    self.result.error(ParseIssue::new(
                        IssueCode::MissingRootElement,
                        "document has no root element",
                    ));
                }
                debug!(
                    facts = self.result.facts_parsed,
                    skipped = self.result.facts_skipped,
                    "Finished fact stream"
                );
            }
            Step::Failed(reason) => {
                self.done = true;
                warn!(%reason, "Fact stream stopped on malformed XML");
                self.result.error(
                    ParseIssue::new(IssueCode::MalformedXml, "stream stopped on malformed XML")
                        .caused_by(reason),
                );
            }
        }
    }
}

impl<R: BufRead> Iterator for FactStream<R> {
    type Item = XbrlFact;

    fn next(&mut self) -> Option<XbrlFact> {
        loop {
            if let Some(fact) = self.ready.pop_front() {
                return Some(fact);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }
}

/// Streams every fact to `handler` and returns the final statistics.
pub fn parse_with_callback<R, F>(reader: R, resolver: Arc<TaxonomyResolver>, mut handler: F) -> ParseResult
where
    R: BufRead,
    F: FnMut(XbrlFact),
{
    let mut stream = FactStream::new(reader, resolver);
    for fact in stream.by_ref() {
        handler(fact);
    }
    stream.into_result()
}

/// Counts fact elements without parsing their values.
///
/// Stops at the first malformed construct and returns the count so far.
pub fn count_facts<R: BufRead>(reader: R) -> usize {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let local = e.local_name();
                let inline = matches!(local.as_ref(), b"nonFraction" | b"nonNumeric");
                let has_context = matches!(e.try_get_attribute("contextRef"), Ok(Some(_)));
                let structural = matches!(
                    e.name().prefix().map(|p| p.as_ref().to_vec()).as_deref(),
                    Some(b"xbrli" | b"link")
                );
                if has_context && (inline || !structural) {
                    count += 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, count, "Fact count stopped on malformed XML");
                break;
            }
        }
        buf.clear();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use xbrl_core::FactType;

    const INSTANCE: &str = r#"<?xml version="1.0"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
    xmlns:us-gaap="http://fasb.org/us-gaap/2024">
  <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
  <xbrli:context id="c1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>2024-09-28</xbrli:instant></xbrli:period>
  </xbrli:context>
  <us-gaap:Assets contextRef="c1" unitRef="usd" decimals="-6">364980000000</us-gaap:Assets>
  <us-gaap:Liabilities contextRef="c1" unitRef="usd" decimals="-6">308030000000</us-gaap:Liabilities>
  <us-gaap:AuditorName contextRef="c1">Ernst &amp; Young LLP</us-gaap:AuditorName>
</xbrli:xbrl>"#;

    fn resolver() -> Arc<TaxonomyResolver> {
        Arc::new(TaxonomyResolver::new())
    }

    #[test]
    fn test_stream_instance() {
        let mut stream = FactStream::new(INSTANCE.as_bytes(), resolver());
        let facts: Vec<_> = stream.by_ref().collect();
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].local_name, "Assets");
        assert_eq!(facts[0].fact_type, FactType::Monetary);
        assert_relative_eq!(facts[0].numeric_value.unwrap_or_default(), 364_980_000_000.0);
        assert_eq!(facts[2].string_value.as_deref(), Some("Ernst & Young LLP"));

        let result = stream.result();
        assert!(result.success);
        assert_eq!(result.units, 1);
        assert_eq!(result.contexts, 1);
        assert_eq!(stream.format(), DocumentFormat::Xbrl);
    }

    #[test]
    fn test_callback_matches_stream() {
        let mut seen = Vec::new();
        let result = parse_with_callback(INSTANCE.as_bytes(), resolver(), |f| seen.push(f.local_name));
        assert_eq!(seen, ["Assets", "Liabilities", "AuditorName"]);
        assert_eq!(result.facts_parsed, 3);
        assert_relative_eq!(result.success_rate(), 1.0);
    }

    #[test]
    fn test_count_facts() {
        assert_eq!(count_facts(INSTANCE.as_bytes()), 3);
    }

    #[test]
    fn test_inline_nested_and_excluded() {
        let doc = r#"<html xmlns="http://www.w3.org/1999/xhtml"
    xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"
    xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:us-gaap="http://fasb.org/us-gaap/2024"
    xmlns:ixt="http://www.xbrl.org/inlineXBRL/transformation/2020-02-12">
<body>
<ix:header><ix:resources>
  <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
</ix:resources></ix:header>
<ix:nonNumeric name="us-gaap:RevenueRecognitionPolicyTextBlock" contextRef="c1">
  Revenue of <ix:nonFraction name="us-gaap:Revenues" contextRef="c1" unitRef="usd"
  decimals="-6" scale="6" format="ixt:num-dot-decimal">391,035</ix:nonFraction> million
  <ix:exclude>page 12</ix:exclude>
</ix:nonNumeric>
</body></html>"#;
        let mut stream = FactStream::new(doc.as_bytes(), resolver());
        let facts: Vec<_> = stream.by_ref().collect();
        assert_eq!(facts.len(), 2);

        // The inner fact closes first
        assert_eq!(facts[0].local_name, "Revenues");
        assert!(facts[0].is_nested);
        assert_relative_eq!(facts[0].normalized_value().unwrap_or_default(), 391_035_000_000.0);

        assert_eq!(facts[1].raw_value, "Revenue of 391,035 million");
        assert_eq!(stream.result().nested_facts, 1);
        // iso4217 is not declared; the well-known table supplies it
        assert_eq!(stream.result().namespace_fallbacks, 1);
    }

    #[test]
    fn test_malformed_stops_with_error() {
        let doc = "<xbrli:xbrl xmlns:xbrli=\"http://www.xbrl.org/2003/instance\"><a></b></xbrli:xbrl>";
        let mut stream = FactStream::new(doc.as_bytes(), resolver());
        assert_eq!(stream.by_ref().count(), 0);
        assert!(!stream.result().success);
        assert_eq!(stream.result().errors[0].code, IssueCode::MalformedXml);
    }
}
