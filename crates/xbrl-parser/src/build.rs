//! Turning raw fact attributes into typed [`XbrlFact`]s.

use xbrl_core::{
    Accuracy, DefinitionSource, FactType, IssueCode, ParseIssue, XbrlFact, XbrlInstance, XbrlUnit,
};
use xbrl_taxonomy::TaxonomyResolver;

use crate::transform::{apply_format, parse_decimal};

/// Lexical form of a numeric value.
#[derive(Clone, Copy, Debug)]
pub(crate) enum NumberSyntax<'a> {
    /// `xsd:decimal`, as in standalone instances.
    Decimal,
    /// Display text with an optional `ixt` format.
    Inline(Option<&'a str>),
}

impl NumberSyntax<'_> {
    fn parse(self, text: &str) -> Result<f64, String> {
        match self {
            Self::Decimal => parse_decimal(text).ok_or_else(|| format!("'{}' is not a decimal", text.trim())),
            Self::Inline(format) => apply_format(format, text).map_err(|e| e.to_string()),
        }
    }
}

/// Parses a `decimals` or `precision` attribute.
pub(crate) fn parse_accuracy(value: Option<&str>) -> Option<Accuracy> {
    value.and_then(|v| v.parse().ok())
}

/// Reads an `xs:boolean` attribute such as `xsi:nil` or `escape`.
pub(crate) fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim(), "true" | "1"))
}

/// Determines the type of a fact.
///
/// A type declared by a loaded schema is final. Otherwise the unit decides
/// for numeric facts, and names that look numeric are demoted to strings
/// when the fact carries no number.
pub(crate) fn classify(
    resolver: &TaxonomyResolver,
    namespace: &str,
    local_name: &str,
    unit: Option<&XbrlUnit>,
    numeric: bool,
) -> FactType {
    let definition = resolver.resolve_concept(namespace, local_name);
    if definition.source == DefinitionSource::Schema && definition.fact_type != FactType::Unknown {
        return definition.fact_type;
    }
    let inferred = definition.fact_type;
    if !numeric {
        return if inferred.is_quantitative() {
            FactType::String
        } else {
            inferred
        };
    }
    match unit {
        Some(u) if u.is_monetary() => FactType::Monetary,
        Some(u) if u.is_per_share() => FactType::PerShare,
        Some(u) if u.is_shares() => FactType::Shares,
        Some(u) if u.is_pure() => FactType::Pure,
        _ if inferred.is_quantitative() => inferred,
        _ => FactType::Decimal,
    }
}

/// Assigns the type and parses the value of a fact whose identity,
/// references and attributes are already set.
///
/// `numeric` is true when the markup itself says the fact is a number
/// (a unit reference, or an `ix:nonFraction`). Returns the issue that makes
/// the fact unusable.
pub(crate) fn complete(
    mut fact: XbrlFact,
    resolver: &TaxonomyResolver,
    unit: Option<&XbrlUnit>,
    numeric: bool,
    syntax: NumberSyntax<'_>,
) -> Result<XbrlFact, ParseIssue> {
    let fact_type = classify(resolver, &fact.namespace, &fact.local_name, unit, numeric);
    fact.fact_type = fact_type;

    if fact.is_nil {
        fact.numeric_value = None;
        fact.string_value = None;
        return Ok(fact);
    }

    if numeric || fact_type.is_quantitative() {
        match syntax.parse(&fact.raw_value) {
            Ok(value) => {
                fact.numeric_value = Some(value);
                fact.string_value = None;
                return Ok(fact);
            }
            Err(reason) if numeric => {
                return Err(ParseIssue::new(
                    IssueCode::InvalidNumber,
                    format!("invalid value for {}", fact.qualified_name()),
                )
                .at_line(fact.line)
                .caused_by(reason));
            }
            // A schema said numeric but the markup carries text
            Err(_) => fact.fact_type = FactType::String,
        }
    }

    fact.numeric_value = None;
    fact.string_value = Some(fact.raw_value.clone());
    Ok(fact)
}

/// Accumulates facts into an instance, checking references.
#[derive(Debug)]
pub(crate) struct Collector<'r> {
    pub(crate) resolver: &'r TaxonomyResolver,
    pub(crate) instance: XbrlInstance,
}

impl<'r> Collector<'r> {
    pub(crate) const fn new(resolver: &'r TaxonomyResolver, instance: XbrlInstance) -> Self {
        Self { resolver, instance }
    }

    /// Validates and adds one fact; problems are recorded as skipped-fact warnings.
    pub(crate) fn accept(&mut self, fact: XbrlFact, numeric: bool, syntax: NumberSyntax<'_>) {
        let result = &mut self.instance.parse_result;
        result.facts_found += 1;

        if !self.instance.contexts.contains_key(&fact.context_ref) {
            result.skip_fact(
                ParseIssue::new(
                    IssueCode::UnknownContext,
                    format!(
                        "{} references unknown context '{}'",
                        fact.qualified_name(),
                        fact.context_ref
                    ),
                )
                .at_line(fact.line),
            );
            return;
        }

        let unit = match fact.unit_ref.as_deref() {
            Some(id) => match self.instance.units.get(id) {
                Some(unit) => Some(unit),
                None => {
                    result.skip_fact(
                        ParseIssue::new(
                            IssueCode::UnknownUnit,
                            format!("{} references unknown unit '{id}'", fact.qualified_name()),
                        )
                        .at_line(fact.line),
                    );
                    return;
                }
            },
            None => None,
        };

        let numeric = numeric || unit.is_some();
        match complete(fact, self.resolver, unit, numeric, syntax) {
            Ok(fact) => {
                result.facts_parsed += 1;
                if fact.is_nested {
                    result.nested_facts += 1;
                }
                self.instance.facts.push(fact);
            }
            Err(issue) => result.skip_fact(issue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use xbrl_core::{
        Measure,
        unit::{ISO4217_NAMESPACE, XBRLI_NAMESPACE},
    };

    const NS: &str = "http://fasb.org/us-gaap/2024";

    fn usd() -> XbrlUnit {
        XbrlUnit::simple("usd", Measure::new(ISO4217_NAMESPACE, "USD"))
    }

    fn shares() -> XbrlUnit {
        XbrlUnit::simple("shares", Measure::new(XBRLI_NAMESPACE, "shares"))
    }

    #[rstest]
    #[case("Assets", Some(usd()), true, FactType::Monetary)]
    // "Operations" contains "ratio"; the currency unit corrects it
    #[case("IncomeLossFromContinuingOperations", Some(usd()), true, FactType::Monetary)]
    #[case("WeightedAverageNumberOfDilutedSharesOutstanding", Some(shares()), true, FactType::Shares)]
    #[case("NumberOfStores", None, true, FactType::Integer)]
    #[case("SomethingCustom", None, true, FactType::Decimal)]
    #[case("RevenueRecognitionPolicy", None, false, FactType::String)]
    #[case("DocumentPeriodEndDate", None, false, FactType::Date)]
    fn test_classify(
        #[case] name: &str,
        #[case] unit: Option<XbrlUnit>,
        #[case] numeric: bool,
        #[case] expected: FactType,
    ) {
        let resolver = TaxonomyResolver::new();
        assert_eq!(classify(&resolver, NS, name, unit.as_ref(), numeric), expected);
    }

    #[test]
    fn test_complete_numeric() {
        let resolver = TaxonomyResolver::new();
        let mut fact = XbrlFact::new(NS, "us-gaap", "Assets", "c1").with_unit("usd");
        fact.raw_value = " 1000 ".to_string();
        let fact = complete(fact, &resolver, Some(&usd()), true, NumberSyntax::Decimal).unwrap();
        assert_relative_eq!(fact.numeric_value.unwrap(), 1000.0);
        assert_eq!(fact.fact_type, FactType::Monetary);
        assert!(fact.string_value.is_none());
    }

    #[test]
    fn test_complete_invalid_number() {
        let resolver = TaxonomyResolver::new();
        let mut fact = XbrlFact::new(NS, "us-gaap", "Assets", "c1").with_unit("usd");
        fact.raw_value = "lots".to_string();
        fact.line = Some(7);
        let issue = complete(fact, &resolver, Some(&usd()), true, NumberSyntax::Decimal).unwrap_err();
        assert_eq!(issue.code, IssueCode::InvalidNumber);
        assert_eq!(issue.line, Some(7));
    }

    #[test]
    fn test_complete_nil() {
        let resolver = TaxonomyResolver::new();
        let mut fact = XbrlFact::new(NS, "us-gaap", "Assets", "c1").with_unit("usd");
        fact.is_nil = true;
        let fact = complete(fact, &resolver, Some(&usd()), true, NumberSyntax::Decimal).unwrap();
        assert!(fact.numeric_value.is_none());
        assert_eq!(fact.fact_type, FactType::Monetary);
    }

    #[test]
    fn test_complete_text() {
        let resolver = TaxonomyResolver::new();
        let mut fact = XbrlFact::new("http://xbrl.sec.gov/dei/2024", "dei", "EntityRegistrantName", "c1");
        fact.raw_value = "Apple Inc.".to_string();
        let fact = complete(fact, &resolver, None, false, NumberSyntax::Decimal).unwrap();
        assert_eq!(fact.string_value.as_deref(), Some("Apple Inc."));
        assert_eq!(fact.fact_type, FactType::String);
    }

    #[test]
    fn test_parse_accuracy() {
        assert_eq!(parse_accuracy(Some("INF")), Some(Accuracy::Infinite));
        assert_eq!(parse_accuracy(Some("-3")), Some(Accuracy::Finite(-3)));
        assert_eq!(parse_accuracy(Some("x")), None);
        assert_eq!(parse_accuracy(None), None);
    }
}
