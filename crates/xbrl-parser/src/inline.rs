//! Inline XBRL (iXBRL) parser.
//!
//! Facts are `ix:nonFraction` and `ix:nonNumeric` elements anywhere in the
//! XHTML body; contexts and units live under `ix:header/ix:resources`.
//! Both the 1.0 and 1.1 inline namespaces are accepted.

use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use xbrl_core::{
    DocumentFormat, IssueCode, ParseIssue, XbrlFact, XbrlFootnote, XbrlInstance, namespaces,
};
use xbrl_taxonomy::TaxonomyResolver;

use crate::build::{Collector, NumberSyntax, is_true, parse_accuracy};
use crate::dom::{
    is_xbrli, line_of, namespace_table, parse_context, parse_unit, resolve_qname, text_content,
};

fn is_ix(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && matches!(
            node.tag_name().namespace(),
            Some(namespaces::IX | namespaces::IX_10)
        )
}

fn is_fact(node: Node<'_, '_>) -> bool {
    is_ix(node, "nonFraction") || is_ix(node, "nonNumeric")
}

/// Parses an inline document into `instance`.
pub(crate) fn parse(
    doc: &Document<'_>,
    resolver: &TaxonomyResolver,
    mut instance: XbrlInstance,
) -> XbrlInstance {
    instance.format = DocumentFormat::InlineXbrl;
    let root = doc.root_element();
    instance.namespaces = namespace_table(root);

    let mut continuations: HashMap<&str, Node<'_, '_>> = HashMap::new();
    for node in root.descendants().filter(Node::is_element) {
        if is_xbrli(node, "context") {
            if let Some(context) = parse_context(doc, node, &mut instance.parse_result) {
                instance.add_context(context);
            }
        } else if is_xbrli(node, "unit") {
            if let Some(unit) = parse_unit(doc, node, &mut instance.parse_result) {
                instance.add_unit(unit);
            }
        } else if is_ix(node, "continuation") {
            if let Some(id) = node.attribute("id") {
                continuations.insert(id, node);
            }
        } else if node.tag_name().namespace() == Some(namespaces::LINK) {
            let href = node.attribute((namespaces::XLINK, "href")).map(str::to_string);
            match node.tag_name().name() {
                "schemaRef" => instance.schema_refs.extend(href),
                "linkbaseRef" => instance.linkbase_refs.extend(href),
                _ => {}
            }
        }
    }

    let mut collector = Collector::new(resolver, instance);
    let mut footnote_refs: HashMap<String, Vec<String>> = HashMap::new();
    for node in root.descendants().filter(|n| is_fact(*n)) {
        let Some(fact) = read_fact(doc, node, &continuations, &mut collector.instance) else {
            continue;
        };
        if let (Some(id), Some(refs)) = (&fact.id, node.attribute("footnoteRefs")) {
            footnote_refs
                .entry(id.clone())
                .or_default()
                .extend(refs.split_whitespace().map(str::to_string));
        }
        let numeric = is_ix(node, "nonFraction");
        let syntax = if numeric {
            NumberSyntax::Inline(node.attribute("format"))
        } else {
            NumberSyntax::Decimal
        };
        collector.accept(fact, numeric, syntax);
    }
    let mut instance = collector.instance;

    read_footnotes(root, &mut instance, &mut footnote_refs);
    for fact in &mut instance.facts {
        if let Some(refs) = fact.id.as_deref().and_then(|id| footnote_refs.get(id)) {
            fact.footnote_refs.extend(refs.iter().cloned());
        }
    }

    debug!(
        uri = %instance.document_uri,
        facts = instance.facts.len(),
        nested = instance.parse_result.nested_facts,
        continuations = instance.parse_result.continuations_resolved,
        "Parsed inline XBRL document"
    );
    instance
}

/// Reads the attributes and text of one `ix:nonFraction` or `ix:nonNumeric`.
fn read_fact(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    continuations: &HashMap<&str, Node<'_, '_>>,
    instance: &mut XbrlInstance,
) -> Option<XbrlFact> {
    let line = Some(line_of(doc, node));
    let result = &mut instance.parse_result;

    let (Some(name), Some(context_ref)) = (node.attribute("name"), node.attribute("contextRef"))
    else {
        result.facts_found += 1;
        result.skip_fact(
            ParseIssue::new(
                IssueCode::UnknownContext,
                format!("ix:{} without name or contextRef", node.tag_name().name()),
            )
            .at_line(line),
        );
        return None;
    };

    let qname = resolve_qname(node, name, result);
    let mut fact = XbrlFact::new(qname.namespace, qname.prefix, qname.local, context_ref);
    fact.id = node.attribute("id").map(str::to_string);
    fact.unit_ref = node.attribute("unitRef").map(str::to_string);
    fact.decimals = parse_accuracy(node.attribute("decimals"));
    fact.precision = parse_accuracy(node.attribute("precision"));
    fact.format = node.attribute("format").map(str::to_string);
    fact.scale = node.attribute("scale").and_then(|s| s.trim().parse().ok());
    fact.sign = node.attribute("sign").map(str::to_string);
    fact.is_nil = is_true(node.attribute((namespaces::XSI, "nil")));
    fact.language = node
        .ancestors()
        .find_map(|n| n.attribute((namespaces::XML, "lang")))
        .map(str::to_string);
    fact.is_nested = node.ancestors().skip(1).any(is_fact);
    fact.line = line;

    fact.raw_value = if is_ix(node, "nonFraction") {
        text_content(node).trim().to_string()
    } else {
        let escape = is_true(node.attribute("escape"));
        let mut text = segment(doc, node, escape);
        if let Some(first) = node.attribute("continuedAt") {
            follow_continuations(doc, first, continuations, escape, &mut text, fact.line, result);
        }
        if escape { text.trim().to_string() } else { collapse_whitespace(&text) }
    };
    Some(fact)
}

/// Appends the text of a `continuedAt` chain, stopping at cycles and dangling ids.
fn follow_continuations(
    doc: &Document<'_>,
    first: &str,
    continuations: &HashMap<&str, Node<'_, '_>>,
    escape: bool,
    text: &mut String,
    line: Option<usize>,
    result: &mut xbrl_core::ParseResult,
) {
    let mut visited = HashSet::new();
    let mut next = Some(first);
    while let Some(id) = next {
        if !visited.insert(id) {
            result.warn(
                ParseIssue::new(
                    IssueCode::UnresolvedContinuation,
                    format!("continuation chain revisits '{id}'"),
                )
                .at_line(line),
            );
            return;
        }
        let Some(node) = continuations.get(id) else {
            result.warn(
                ParseIssue::new(
                    IssueCode::UnresolvedContinuation,
                    format!("continuation '{id}' not found"),
                )
                .at_line(line),
            );
            return;
        };
        text.push(' ');
        text.push_str(&segment(doc, *node, escape));
        result.continuations_resolved += 1;
        next = node.attribute("continuedAt");
    }
}

/// Content of a fact or continuation, leaving out `ix:exclude` subtrees.
///
/// Escaped content keeps its markup; otherwise only text is kept.
fn segment(doc: &Document<'_>, node: Node<'_, '_>, escape: bool) -> String {
    let mut out = String::new();
    for child in node.children() {
        if is_ix(child, "exclude") {
            continue;
        }
        if escape {
            if child.is_element() && child.descendants().any(|d| is_ix(d, "exclude")) {
                out.push_str(&segment(doc, child, true));
            } else {
                out.push_str(&doc.input_text()[child.range()]);
            }
        } else if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
        } else if child.is_element() {
            out.push_str(&segment(doc, child, false));
            // Block boundaries separate words
            out.push(' ');
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collects `ix:footnote` elements and `ix:relationship` links.
fn read_footnotes(
    root: Node<'_, '_>,
    instance: &mut XbrlInstance,
    refs: &mut HashMap<String, Vec<String>>,
) {
    for node in root.descendants() {
        if is_ix(node, "footnote") {
            let Some(id) = node
                .attribute("id")
                .or_else(|| node.attribute("footnoteID"))
            else {
                continue;
            };
            instance.footnotes.push(XbrlFootnote {
                id: id.to_string(),
                text: collapse_whitespace(&text_content(node)),
                language: node
                    .ancestors()
                    .find_map(|n| n.attribute((namespaces::XML, "lang")))
                    .map(str::to_string),
            });
        } else if is_ix(node, "relationship") {
            let (Some(from), Some(to)) = (node.attribute("fromRefs"), node.attribute("toRefs"))
            else {
                continue;
            };
            for source in from.split_whitespace() {
                refs.entry(source.to_string())
                    .or_default()
                    .extend(to.split_whitespace().map(str::to_string));
            }
        }
    }

    // Relationships may also point at other facts; keep only footnote targets
    let ids: HashSet<&str> = instance.footnotes.iter().map(|f| f.id.as_str()).collect();
    for targets in refs.values_mut() {
        targets.retain(|t| ids.contains(t.as_str()));
        targets.dedup();
    }
}
