//! Helpers shared by the DOM-based parsers: contexts, units, QNames and text.

use chrono::NaiveDate;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use xbrl_core::{
    IssueCode, Measure, ParseIssue, ParseResult, UnitKind, XbrlContext, XbrlDimension, XbrlPeriod,
    XbrlUnit, namespaces,
};

/// 1-based line of a node.
pub(crate) fn line_of(doc: &Document<'_>, node: Node<'_, '_>) -> usize {
    doc.text_pos_at(node.range().start).row as usize
}

/// True for an element with this local name in the instance namespace
/// (or in no namespace, as produced by sloppy generators).
pub(crate) fn is_xbrli(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node
            .tag_name()
            .namespace()
            .is_none_or(|ns| ns == namespaces::XBRLI)
}

/// First child element with the given local name.
pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, local: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local)
}

/// Concatenated text of all descendant text nodes.
pub(crate) fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// A resolved QName.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QName {
    pub(crate) namespace: String,
    pub(crate) prefix: String,
    pub(crate) local: String,
}

/// Resolves a QName-valued attribute or text in the scope of `node`.
///
/// Unbound prefixes fall back to the well-known namespace table and count
/// as namespace fallbacks; unknown ones resolve to an empty namespace.
pub(crate) fn resolve_qname(node: Node<'_, '_>, qname: &str, result: &mut ParseResult) -> QName {
    let qname = qname.trim();
    let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
    let lookup = if prefix.is_empty() { None } else { Some(prefix) };

    let namespace = match node.lookup_namespace_uri(lookup) {
        Some(uri) => uri.to_string(),
        None => match namespaces::well_known(prefix) {
            Some(uri) => {
                result.namespace_fallbacks += 1;
                uri.to_string()
            }
            None => String::new(),
        },
    };
    QName {
        namespace,
        prefix: prefix.to_string(),
        local: local.to_string(),
    }
}

/// Namespace declarations in scope at `node`, keyed by prefix ("" for the default).
pub(crate) fn namespace_table(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .map(|ns| (ns.name().unwrap_or_default().to_string(), ns.uri().to_string()))
        .collect()
}

/// Parses an `xsd:date` or `xsd:dateTime`, ignoring any time part.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Parses an `xbrli:context` element.
pub(crate) fn parse_context(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    result: &mut ParseResult,
) -> Option<XbrlContext> {
    let line = Some(line_of(doc, node));
    let invalid = |message: String| ParseIssue::new(IssueCode::InvalidContext, message).at_line(line);

    let Some(id) = node.attribute("id") else {
        result.warn(invalid("context without id".to_string()));
        return None;
    };

    let identifier = child(node, "entity").and_then(|e| child(e, "identifier"));
    let entity_identifier = identifier.map(text_content).unwrap_or_default();
    let entity_scheme = identifier
        .and_then(|i| i.attribute("scheme"))
        .unwrap_or_default();

    let Some(period_node) = child(node, "period") else {
        result.warn(invalid(format!("context '{id}' has no period")));
        return None;
    };
    let date_of = |local: &str| child(period_node, local).map(|n| parse_date(&text_content(n)));
    let period = if child(period_node, "forever").is_some() {
        Some(XbrlPeriod::Forever)
    } else if let Some(instant) = date_of("instant") {
        instant.map(XbrlPeriod::Instant)
    } else {
        match (date_of("startDate"), date_of("endDate")) {
            (Some(Some(start)), Some(Some(end))) => Some(XbrlPeriod::Duration { start, end }),
            _ => None,
        }
    };
    let Some(period) = period else {
        result.warn(invalid(format!("context '{id}' has an invalid period")));
        return None;
    };

    let mut context = XbrlContext::new(id, entity_identifier.trim(), entity_scheme, period);
    for member in node.descendants().filter(Node::is_element) {
        let Some(axis) = member.attribute("dimension") else {
            continue;
        };
        // Resolving counts any namespace fallback for the axis prefix
        let _ = resolve_qname(member, axis, result);
        match member.tag_name().name() {
            "explicitMember" => {
                let value = text_content(member);
                let _ = resolve_qname(member, &value, result);
                context = context.with_dimension(XbrlDimension::explicit(axis, value.trim()));
            }
            "typedMember" => {
                let value = member
                    .children()
                    .find(Node::is_element)
                    .map(text_content)
                    .unwrap_or_else(|| text_content(member));
                context = context.with_dimension(XbrlDimension::typed(axis, value.trim()));
            }
            _ => {}
        }
    }

    result.contexts += 1;
    Some(context)
}

/// Parses an `xbrli:unit` element.
pub(crate) fn parse_unit(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    result: &mut ParseResult,
) -> Option<XbrlUnit> {
    let line = Some(line_of(doc, node));
    let Some(id) = node.attribute("id") else {
        result.warn(ParseIssue::new(IssueCode::InvalidUnit, "unit without id").at_line(line));
        return None;
    };

    let kind = if let Some(divide) = child(node, "divide") {
        let numerator = child(divide, "unitNumerator")
            .map(|n| measures(n, result))
            .unwrap_or_default();
        let denominator = child(divide, "unitDenominator")
            .map(|n| measures(n, result))
            .unwrap_or_default();
        (!numerator.is_empty() && !denominator.is_empty()).then_some(UnitKind::Divide {
            numerator,
            denominator,
        })
    } else {
        let mut list = measures(node, result);
        match list.len() {
            0 => None,
            1 => list.pop().map(UnitKind::Simple),
            _ => Some(UnitKind::Multiply(list)),
        }
    };

    let Some(kind) = kind else {
        result.warn(
            ParseIssue::new(IssueCode::InvalidUnit, format!("unit '{id}' has no measure"))
                .at_line(line),
        );
        return None;
    };
    result.units += 1;
    Some(XbrlUnit {
        id: id.to_string(),
        kind,
    })
}

fn measures(parent: Node<'_, '_>, result: &mut ParseResult) -> Vec<Measure> {
    parent
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "measure")
        .map(|m| {
            let q = resolve_qname(m, &text_content(m), result);
            Measure::new(q.namespace, q.local)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
        xmlns:xbrldi="http://xbrl.org/2006/xbrldi"
        xmlns:iso4217="http://www.xbrl.org/2003/iso4217">
      <xbrli:context id="D2023">
        <xbrli:entity>
          <xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier>
          <xbrli:segment>
            <xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">aapl:AmericasSegmentMember</xbrldi:explicitMember>
          </xbrli:segment>
        </xbrli:entity>
        <xbrli:period>
          <xbrli:startDate>2022-09-25</xbrli:startDate>
          <xbrli:endDate>2023-09-30</xbrli:endDate>
        </xbrli:period>
      </xbrli:context>
      <xbrli:context id="broken">
        <xbrli:entity><xbrli:identifier scheme="s">1</xbrli:identifier></xbrli:entity>
        <xbrli:period><xbrli:instant>not-a-date</xbrli:instant></xbrli:period>
      </xbrli:context>
      <xbrli:unit id="usdPerShare">
        <xbrli:divide>
          <xbrli:unitNumerator><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unitNumerator>
          <xbrli:unitDenominator><xbrli:measure>xbrli:shares</xbrli:measure></xbrli:unitDenominator>
        </xbrli:divide>
      </xbrli:unit>
      <xbrli:unit id="empty"/>
    </xbrli:xbrl>"#;

    fn element<'a, 'i>(doc: &'a Document<'i>, id: &str) -> Node<'a, 'i> {
        doc.descendants()
            .find(|n| n.attribute("id") == Some(id))
            .unwrap()
    }

    #[test]
    fn test_parse_dimensional_context() {
        let doc = Document::parse(DOC).unwrap();
        let mut result = ParseResult::new();
        let ctx = parse_context(&doc, element(&doc, "D2023"), &mut result).unwrap();
        assert_eq!(ctx.entity_identifier, "0000320193");
        assert_eq!(ctx.period.duration_days(), Some(370));
        assert_eq!(ctx.dimensions.len(), 1);
        assert_eq!(ctx.dimensions[0].member.value(), "aapl:AmericasSegmentMember");
        // us-gaap is well known, aapl is not
        assert_eq!(result.namespace_fallbacks, 1);
        assert_eq!(result.contexts, 1);
    }

    #[test]
    fn test_invalid_period_is_warning() {
        let doc = Document::parse(DOC).unwrap();
        let mut result = ParseResult::new();
        assert!(parse_context(&doc, element(&doc, "broken"), &mut result).is_none());
        assert_eq!(result.warnings[0].code, IssueCode::InvalidContext);
        assert!(result.success);
    }

    #[test]
    fn test_parse_units() {
        let doc = Document::parse(DOC).unwrap();
        let mut result = ParseResult::new();
        let unit = parse_unit(&doc, element(&doc, "usdPerShare"), &mut result).unwrap();
        assert!(unit.is_per_share());
        assert_eq!(unit.to_string(), "USD/shares");

        assert!(parse_unit(&doc, element(&doc, "empty"), &mut result).is_none());
        assert_eq!(result.warnings[0].code, IssueCode::InvalidUnit);
        assert_eq!(result.units, 1);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2023-12-31"), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(parse_date(" 2023-12-31T00:00:00 "), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(parse_date("12/31/2023"), None);
    }
}
