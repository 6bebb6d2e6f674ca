//! Taxonomy schema (`.xsd`) parsing.
//!
//! Only the parts needed for concept typing are read: the target namespace,
//! top-level element declarations, schema imports and linkbase references.
//! Import chains are recorded, not followed.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use xbrl_core::{
    BalanceType, ConceptDefinition, ConceptPeriod, DefinitionSource, FactType, Result,
    TaxonomySchema, XbrlError,
};

/// Parses a taxonomy schema.
///
/// An element whose `type` is not a recognized XBRL item type keeps the type
/// inferred from its name.
pub fn parse_schema(url: &str, bytes: &[u8]) -> Result<TaxonomySchema> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut schema = TaxonomySchema {
        url: url.to_string(),
        ..Default::default()
    };
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| XbrlError::Schema {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match event {
            Event::Start(ref e) => {
                visit(&mut schema, e, depth);
                depth += 1;
            }
            Event::Empty(ref e) => visit(&mut schema, e, depth),
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if schema.target_namespace.is_empty() && schema.elements.is_empty() {
        return Err(XbrlError::Schema {
            url: url.to_string(),
            reason: "no xs:schema root".to_string(),
        });
    }

    debug!(
        url,
        namespace = %schema.target_namespace,
        elements = schema.elements.len(),
        "Parsed taxonomy schema"
    );
    Ok(schema)
}

fn visit(schema: &mut TaxonomySchema, e: &BytesStart<'_>, depth: usize) {
    match e.local_name().as_ref() {
        b"schema" if depth == 0 => {
            if let Some(ns) = attr(e, b"targetNamespace") {
                schema.target_namespace = ns;
            }
        }
        b"import" | b"include" => {
            if let Some(location) = attr(e, b"schemaLocation") {
                schema.imports.push(location);
            }
        }
        b"linkbaseRef" => {
            if let Some(href) = attr(e, b"href") {
                schema.linkbases.push(href);
            }
        }
        // Only global declarations define concepts
        b"element" if depth == 1 => {
            if let Some(definition) = element(&schema.target_namespace, e) {
                schema.elements.push(definition);
            }
        }
        _ => {}
    }
}

fn element(namespace: &str, e: &BytesStart<'_>) -> Option<ConceptDefinition> {
    let name = attr(e, b"name")?;
    let fact_type = match attr(e, b"type").map(|t| FactType::from_xsd_type(&t)) {
        Some(FactType::Unknown) | None => FactType::infer(&name),
        Some(t) => t,
    };
    let period = attr(e, b"periodType").and_then(|p| match p.as_str() {
        "instant" => Some(ConceptPeriod::Instant),
        "duration" => Some(ConceptPeriod::Duration),
        _ => None,
    });
    let balance = attr(e, b"balance").and_then(|b| match b.as_str() {
        "debit" => Some(BalanceType::Debit),
        "credit" => Some(BalanceType::Credit),
        _ => None,
    });

    Some(ConceptDefinition {
        namespace: namespace.to_string(),
        local_name: name,
        fact_type,
        period,
        balance,
        is_abstract: attr(e, b"abstract").is_some_and(|v| v == "true"),
        nillable: attr(e, b"nillable").is_none_or(|v| v == "true"),
        substitution_group: attr(e, b"substitutionGroup"),
        source: DefinitionSource::Schema,
    })
}

/// Attribute value by local name, ignoring the prefix.
fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:xbrli="http://www.xbrl.org/2003/instance"
           xmlns:link="http://www.xbrl.org/2003/linkbase"
           xmlns:xlink="http://www.w3.org/1999/xlink"
           targetNamespace="http://www.acme.com/20231231">
  <xs:annotation>
    <xs:appinfo>
      <link:linkbaseRef xlink:type="simple" xlink:href="acme-20231231_lab.xml"/>
    </xs:appinfo>
  </xs:annotation>
  <xs:import namespace="http://fasb.org/us-gaap/2023" schemaLocation="https://xbrl.fasb.org/us-gaap/2023/elts/us-gaap-2023.xsd"/>
  <xs:element name="WidgetRevenue" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item"
              xbrli:periodType="duration" xbrli:balance="credit" nillable="true"/>
  <xs:element name="WidgetsShipped" type="xbrli:sharesItemType" substitutionGroup="xbrli:item"
              xbrli:periodType="duration"/>
  <xs:element name="SegmentAxis" type="xbrli:stringItemType" abstract="true"
              substitutionGroup="xbrldt:dimensionItem" xbrli:periodType="duration"/>
  <xs:element name="CustomThing" type="acme:oddType" xbrli:periodType="instant"/>
  <xs:complexType name="Wrapper">
    <xs:sequence>
      <xs:element name="Nested" type="xs:string"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;

    #[test]
    fn test_parse_schema() {
        let schema = parse_schema("acme.xsd", SCHEMA.as_bytes()).unwrap();
        assert_eq!(schema.target_namespace, "http://www.acme.com/20231231");
        assert_eq!(schema.elements.len(), 4);
        assert_eq!(schema.imports.len(), 1);
        assert_eq!(schema.linkbases, vec!["acme-20231231_lab.xml"]);

        let revenue = schema.element("WidgetRevenue").unwrap();
        assert_eq!(revenue.fact_type, FactType::Monetary);
        assert_eq!(revenue.period, Some(ConceptPeriod::Duration));
        assert_eq!(revenue.balance, Some(BalanceType::Credit));
        assert_eq!(revenue.source, DefinitionSource::Schema);
        assert_eq!(revenue.namespace, "http://www.acme.com/20231231");

        // Schema type wins over the name
        assert_eq!(schema.element("WidgetsShipped").unwrap().fact_type, FactType::Shares);
        assert!(schema.element("SegmentAxis").unwrap().is_abstract);
        assert!(schema.element("Nested").is_none());
    }

    #[test]
    fn test_unknown_type_falls_back_to_name() {
        let schema = parse_schema("acme.xsd", SCHEMA.as_bytes()).unwrap();
        let custom = schema.element("CustomThing").unwrap();
        assert_eq!(custom.fact_type, FactType::infer("CustomThing"));
        assert_eq!(custom.period, Some(ConceptPeriod::Instant));
    }

    #[test]
    fn test_malformed_schema() {
        let err = parse_schema("bad.xsd", b"<xs:schema><xs:element></xs:schema>").unwrap_err();
        assert!(matches!(err, XbrlError::Schema { .. }));
    }

    #[test]
    fn test_not_a_schema() {
        assert!(parse_schema("x.xsd", b"<html><body/></html>").is_err());
    }
}
