//! Taxonomy value types shared by the resolver and the parsers.

use serde::{Deserialize, Serialize};

use crate::fact_type::FactType;

/// `xbrli:periodType` of a concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptPeriod {
    /// Reported at a point in time.
    Instant,
    /// Reported over a span of time.
    Duration,
}

/// `xbrli:balance` of a monetary concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceType {
    /// Debit balance.
    Debit,
    /// Credit balance.
    Credit,
}

/// Where a concept definition came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionSource {
    /// Read from a taxonomy schema element.
    Schema,
    /// Derived from the local name by heuristics.
    #[default]
    Inferred,
}

/// Definition of a taxonomy concept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDefinition {
    /// Namespace URI.
    pub namespace: String,
    /// Local name.
    pub local_name: String,
    /// Data type.
    pub fact_type: FactType,
    /// Period type, when declared.
    pub period: Option<ConceptPeriod>,
    /// Balance, when declared.
    pub balance: Option<BalanceType>,
    /// Abstract concepts never carry values.
    pub is_abstract: bool,
    /// Whether the concept may be nil.
    pub nillable: bool,
    /// Substitution group (e.g. "xbrli:item").
    pub substitution_group: Option<String>,
    /// Origin of this definition.
    pub source: DefinitionSource,
}

impl ConceptDefinition {
    /// Builds a definition from local-name heuristics alone.
    #[must_use]
    pub fn inferred(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        let local_name = local_name.into();
        Self {
            namespace: namespace.into(),
            fact_type: FactType::infer(&local_name),
            local_name,
            period: None,
            balance: None,
            is_abstract: false,
            nillable: true,
            substitution_group: None,
            source: DefinitionSource::Inferred,
        }
    }
}

/// A parsed taxonomy schema (`.xsd`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySchema {
    /// Location the schema was loaded from.
    pub url: String,
    /// `targetNamespace` of the schema.
    pub target_namespace: String,
    /// Element declarations.
    pub elements: Vec<ConceptDefinition>,
    /// `xs:import`/`xs:include` schema locations.
    pub imports: Vec<String>,
    /// `link:linkbaseRef` locations.
    pub linkbases: Vec<String>,
}

impl TaxonomySchema {
    /// Looks up an element by local name.
    #[must_use]
    pub fn element(&self, local_name: &str) -> Option<&ConceptDefinition> {
        self.elements.iter().find(|e| e.local_name == local_name)
    }
}

/// Cache key for concept definitions: `namespace#localName`.
#[must_use]
pub fn concept_key(namespace: &str, local_name: &str) -> String {
    format!("{namespace}#{local_name}")
}

/// Cache key for labels: `namespace#localName#lang`.
#[must_use]
pub fn label_key(namespace: &str, local_name: &str, lang: &str) -> String {
    format!("{namespace}#{local_name}#{lang}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inferred_definition() {
        let def = ConceptDefinition::inferred("http://fasb.org/us-gaap/2024", "Assets");
        assert_eq!(def.fact_type, FactType::Monetary);
        assert_eq!(def.source, DefinitionSource::Inferred);
    }

    #[test]
    fn test_keys() {
        assert_eq!(concept_key("ns", "Assets"), "ns#Assets");
        assert_eq!(label_key("ns", "Assets", "en-US"), "ns#Assets#en-US");
    }
}
