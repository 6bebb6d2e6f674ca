//! Standalone XBRL instance parser.

use roxmltree::{Document, Node};
use std::collections::HashMap;
use tracing::debug;
use xbrl_core::{
    DocumentFormat, IssueCode, ParseIssue, XbrlFact, XbrlFootnote, XbrlInstance, namespaces,
};
use xbrl_taxonomy::TaxonomyResolver;

use crate::build::{Collector, NumberSyntax, is_true, parse_accuracy};
use crate::dom::{
    is_xbrli, line_of, namespace_table, parse_context, parse_unit, text_content,
};

/// Parses a standalone instance document into `instance`.
pub(crate) fn parse(
    doc: &Document<'_>,
    resolver: &TaxonomyResolver,
    mut instance: XbrlInstance,
) -> XbrlInstance {
    instance.format = DocumentFormat::Xbrl;
    let root = doc.root_element();
    if root.tag_name().name() != "xbrl" {
        instance.parse_result.error(
            ParseIssue::new(
                IssueCode::MissingRootElement,
                format!("expected an xbrl root element, found '{}'", root.tag_name().name()),
            )
            .at_line(Some(line_of(doc, root))),
        );
        return instance;
    }
    instance.namespaces = namespace_table(root);

    // Contexts and units may follow the facts that use them
    for node in root.children().filter(Node::is_element) {
        if is_xbrli(node, "context") {
            if let Some(context) = parse_context(doc, node, &mut instance.parse_result) {
                instance.add_context(context);
            }
        } else if is_xbrli(node, "unit") {
            if let Some(unit) = parse_unit(doc, node, &mut instance.parse_result) {
                instance.add_unit(unit);
            }
        } else if is_link(node, "schemaRef") {
            instance.schema_refs.extend(href(node));
        } else if is_link(node, "linkbaseRef") {
            instance.linkbase_refs.extend(href(node));
        }
    }

    let mut collector = Collector::new(resolver, instance);
    for node in root.children().filter(Node::is_element) {
        if !is_structural(node) {
            visit(doc, node, &mut collector);
        }
    }
    let mut instance = collector.instance;

    for link in root.children().filter(|n| is_link(*n, "footnoteLink")) {
        attach_footnotes(link, &mut instance);
    }

    debug!(
        uri = %instance.document_uri,
        facts = instance.facts.len(),
        contexts = instance.contexts.len(),
        "Parsed XBRL instance"
    );
    instance
}

fn is_link(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(namespaces::LINK)
}

fn is_structural(node: Node<'_, '_>) -> bool {
    matches!(
        node.tag_name().namespace(),
        Some(namespaces::XBRLI | namespaces::LINK)
    )
}

fn href(node: Node<'_, '_>) -> Option<String> {
    node.attribute((namespaces::XLINK, "href")).map(str::to_string)
}

/// Facts carry a `contextRef`; anything else with element children is a tuple.
fn visit(doc: &Document<'_>, node: Node<'_, '_>, collector: &mut Collector<'_>) {
    let Some(context_ref) = node.attribute("contextRef") else {
        for child in node.children().filter(Node::is_element) {
            visit(doc, child, collector);
        }
        return;
    };

    let tag = node.tag_name();
    let namespace = tag.namespace().unwrap_or_default();
    let prefix = if namespace.is_empty() {
        ""
    } else {
        node.lookup_prefix(namespace).unwrap_or_default()
    };

    let mut fact = XbrlFact::new(namespace, prefix, tag.name(), context_ref);
    fact.id = node.attribute("id").map(str::to_string);
    fact.unit_ref = node.attribute("unitRef").map(str::to_string);
    fact.decimals = parse_accuracy(node.attribute("decimals"));
    fact.precision = parse_accuracy(node.attribute("precision"));
    fact.is_nil = is_true(node.attribute((namespaces::XSI, "nil")));
    fact.language = node
        .attribute((namespaces::XML, "lang"))
        .map(str::to_string);
    fact.line = Some(line_of(doc, node));
    fact.raw_value = text_content(node).trim().to_string();

    collector.accept(fact, false, NumberSyntax::Decimal);
}

/// Reads a `link:footnoteLink` and attaches its footnotes to facts by id.
fn attach_footnotes(link: Node<'_, '_>, instance: &mut XbrlInstance) {
    let label = |n: Node<'_, '_>| n.attribute((namespaces::XLINK, "label")).map(str::to_string);

    let mut locators: HashMap<String, String> = HashMap::new();
    let mut notes: HashMap<String, String> = HashMap::new();
    let mut arcs: Vec<(String, String)> = Vec::new();

    for node in link.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "loc" => {
                let target = node
                    .attribute((namespaces::XLINK, "href"))
                    .and_then(|h| h.rsplit_once('#').map(|(_, id)| id.to_string()));
                if let (Some(label), Some(target)) = (label(node), target) {
                    locators.insert(label, target);
                }
            }
            "footnote" => {
                let Some(label) = label(node) else { continue };
                let id = node.attribute("id").map_or_else(|| label.clone(), str::to_string);
                instance.footnotes.push(XbrlFootnote {
                    id: id.clone(),
                    text: text_content(node).trim().to_string(),
                    language: node
                        .attribute((namespaces::XML, "lang"))
                        .map(str::to_string),
                });
                notes.insert(label, id);
            }
            "footnoteArc" => {
                let from = node.attribute((namespaces::XLINK, "from"));
                let to = node.attribute((namespaces::XLINK, "to"));
                if let (Some(from), Some(to)) = (from, to) {
                    arcs.push((from.to_string(), to.to_string()));
                }
            }
            _ => {}
        }
    }

    let mut by_fact: HashMap<&str, Vec<String>> = HashMap::new();
    for (from, to) in &arcs {
        if let (Some(fact_id), Some(note_id)) = (locators.get(from), notes.get(to)) {
            by_fact.entry(fact_id.as_str()).or_default().push(note_id.clone());
        }
    }
    for fact in &mut instance.facts {
        if let Some(refs) = fact.id.as_deref().and_then(|id| by_fact.get(id)) {
            fact.footnote_refs.extend(refs.iter().cloned());
        }
    }
}
