//! Calculation checks between parent and child concepts.
//!
//! Each relationship says a parent equals the weighted sum of its children.
//! A check runs per non-dimensional context when the parent and at least one
//! child are reported; it passes when the difference stays within half a
//! unit of the parent's reported `decimals`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use xbrl_core::{XbrlFact, XbrlInstance};

/// Absolute slack absorbing binary floating point error in sums.
const FLOAT_SLACK: f64 = 1e-6;

/// Relative slack for very large magnitudes.
const RELATIVE_SLACK: f64 = 1e-12;

/// Tolerance used for the balance sheet identity check.
pub const BALANCE_SHEET_TOLERANCE: f64 = 1.0;

/// A parent concept and its weighted children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Local name of the total.
    pub parent: String,
    /// Local names of the components with their weights (usually 1 or -1).
    pub children: Vec<(String, f64)>,
}

impl Relationship {
    /// Creates a relationship from local names and weights.
    #[must_use]
    pub fn new(parent: &str, children: &[(&str, f64)]) -> Self {
        Self {
            parent: parent.to_string(),
            children: children
                .iter()
                .map(|(name, weight)| ((*name).to_string(), *weight))
                .collect(),
        }
    }
}

/// The relationships checked by a [`CalculationValidator`].
///
/// The default table covers common US GAAP totals. It is not exhaustive;
/// filers' own calculation linkbases go further, and callers can
/// [`push`](Self::push) more relationships.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationTable {
    relationships: Vec<Relationship>,
}

impl Default for CalculationTable {
    fn default() -> Self {
        Self::gaap()
    }
}

impl CalculationTable {
    /// A table with no relationships.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            relationships: Vec::new(),
        }
    }

    /// The built-in US GAAP relationships.
    #[must_use]
    pub fn gaap() -> Self {
        let relationships = vec![
            Relationship::new("Assets", &[("AssetsCurrent", 1.0), ("AssetsNoncurrent", 1.0)]),
            Relationship::new(
                "LiabilitiesAndStockholdersEquity",
                &[
                    ("Liabilities", 1.0),
                    ("StockholdersEquity", 1.0),
                    ("MinorityInterest", 1.0),
                ],
            ),
            Relationship::new(
                "Liabilities",
                &[("LiabilitiesCurrent", 1.0), ("LiabilitiesNoncurrent", 1.0)],
            ),
            Relationship::new(
                "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
                &[("StockholdersEquity", 1.0), ("MinorityInterest", 1.0)],
            ),
            Relationship::new("GrossProfit", &[("Revenues", 1.0), ("CostOfRevenue", -1.0)]),
            Relationship::new(
                "OperatingIncomeLoss",
                &[("GrossProfit", 1.0), ("OperatingExpenses", -1.0)],
            ),
            Relationship::new(
                "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
                &[
                    ("NetCashProvidedByUsedInOperatingActivities", 1.0),
                    ("NetCashProvidedByUsedInInvestingActivities", 1.0),
                    ("NetCashProvidedByUsedInFinancingActivities", 1.0),
                    (
                        "EffectOfExchangeRateOnCashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
                        1.0,
                    ),
                ],
            ),
            Relationship::new(
                "ComprehensiveIncomeNetOfTax",
                &[
                    ("NetIncomeLoss", 1.0),
                    ("OtherComprehensiveIncomeLossNetOfTax", 1.0),
                ],
            ),
        ];
        Self { relationships }
    }

    /// Adds a relationship.
    pub fn push(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Adds a relationship, builder style.
    #[must_use]
    pub fn with(mut self, relationship: Relationship) -> Self {
        self.push(relationship);
        self
    }

    /// Relationships in check order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Number of relationships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Returns true when the table has no relationships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// A failed calculation check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcError {
    /// Local name of the total.
    pub parent: String,
    /// Reported total.
    pub parent_value: f64,
    /// Weighted sum of the reported children.
    pub computed_sum: f64,
    /// `parent_value - computed_sum`.
    pub difference: f64,
    /// Allowed absolute difference.
    pub tolerance: f64,
    /// Context the check ran in.
    pub context_id: String,
    /// Children that were actually reported.
    pub children: Vec<String>,
}

/// Outcome of validating one instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Checks that ran.
    pub total_checks: usize,
    /// Checks within tolerance.
    pub valid_calculations: usize,
    /// Checks outside tolerance.
    pub errors: Vec<CalcError>,
}

impl ValidationResult {
    /// Returns true when no check failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failed checks over checks run; 0.0 when nothing ran.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.errors.len() as f64 / self.total_checks as f64
        }
    }
}

/// Kind of advisory finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Assets differ from liabilities plus equity.
    BalanceSheetImbalance,
    /// No non-dimensional context with an end date exists.
    NoPrimaryContext,
}

/// An advisory finding, separate from calculation errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PotentialIssue {
    /// Finding kind.
    pub kind: IssueKind,
    /// Human readable description.
    pub message: String,
    /// Size of the discrepancy, when there is one.
    pub difference: Option<f64>,
}

/// Checks calculation relationships within an instance.
#[derive(Clone, Debug, Default)]
pub struct CalculationValidator {
    table: CalculationTable,
}

impl CalculationValidator {
    /// Creates a validator with the default relationships.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator using `table`.
    #[must_use]
    pub const fn with_table(table: CalculationTable) -> Self {
        Self { table }
    }

    /// The relationships being checked.
    #[must_use]
    pub const fn table(&self) -> &CalculationTable {
        &self.table
    }

    /// Runs every relationship in every non-dimensional context.
    #[must_use]
    pub fn validate(&self, instance: &XbrlInstance) -> ValidationResult {
        let mut by_context: BTreeMap<&str, HashMap<&str, &XbrlFact>> = BTreeMap::new();
        for fact in &instance.facts {
            let Some(context) = instance.context(&fact.context_ref) else {
                continue;
            };
            if context.is_dimensional() || fact.normalized_value().is_none() {
                continue;
            }
            by_context
                .entry(context.id.as_str())
                .or_default()
                .entry(fact.local_name.as_str())
                .or_insert(fact);
        }

        let mut result = ValidationResult::default();
        for (context_id, facts) in &by_context {
            for relationship in self.table.iter() {
                if let Some(outcome) = check(relationship, context_id, facts) {
                    result.total_checks += 1;
                    match outcome {
                        Ok(()) => result.valid_calculations += 1,
                        Err(error) => result.errors.push(error),
                    }
                }
            }
        }

        debug!(
            uri = %instance.document_uri,
            checks = result.total_checks,
            errors = result.errors.len(),
            "Validated calculations"
        );
        result
    }

    /// Checks `Assets ≈ Liabilities + Equity` in the primary context.
    ///
    /// Uses a flat tolerance of [`BALANCE_SHEET_TOLERANCE`]. When the
    /// liabilities total is not reported, `LiabilitiesAndStockholdersEquity`
    /// stands in for the right-hand side.
    #[must_use]
    pub fn find_potential_issues(&self, instance: &XbrlInstance) -> Vec<PotentialIssue> {
        if instance.primary_context().is_none() {
            return vec![PotentialIssue {
                kind: IssueKind::NoPrimaryContext,
                message: "no non-dimensional context with a period end".to_string(),
                difference: None,
            }];
        }

        let value = |name: &str| instance.primary_fact(name).and_then(XbrlFact::normalized_value);
        let Some(assets) = value("Assets") else {
            return Vec::new();
        };
        let equity = value("StockholdersEquity").or_else(|| {
            value("StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest")
        });
        let right = match (value("Liabilities"), equity) {
            (Some(liabilities), Some(equity)) => liabilities + equity,
            _ => match value("LiabilitiesAndStockholdersEquity") {
                Some(total) => total,
                None => return Vec::new(),
            },
        };

        let difference = assets - right;
        if difference.abs() > BALANCE_SHEET_TOLERANCE {
            vec![PotentialIssue {
                kind: IssueKind::BalanceSheetImbalance,
                message: format!(
                    "assets {assets} differ from liabilities and equity {right} by {difference}"
                ),
                difference: Some(difference),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Runs one relationship; `None` when it does not apply.
fn check(
    relationship: &Relationship,
    context_id: &str,
    facts: &HashMap<&str, &XbrlFact>,
) -> Option<Result<(), CalcError>> {
    let parent = facts.get(relationship.parent.as_str())?;
    let parent_value = parent.normalized_value()?;

    let mut present = Vec::new();
    let mut sum = 0.0;
    for (child, weight) in &relationship.children {
        if let Some(value) = facts.get(child.as_str()).and_then(|f| f.normalized_value()) {
            sum += value * weight;
            present.push(child.clone());
        }
    }
    if present.is_empty() {
        return None;
    }

    let tolerance = parent.tolerance();
    let difference = parent_value - sum;
    let slack = FLOAT_SLACK + RELATIVE_SLACK * parent_value.abs();
    if difference.abs() <= tolerance + slack {
        Some(Ok(()))
    } else {
        Some(Err(CalcError {
            parent: relationship.parent.clone(),
            parent_value,
            computed_sum: sum,
            difference,
            tolerance,
            context_id: context_id.to_string(),
            children: present,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::rstest;
    use xbrl_core::{Accuracy, DocumentFormat, FactType, XbrlContext, XbrlPeriod};

    fn instance(facts: &[(&str, f64, i32)]) -> XbrlInstance {
        let mut instance = XbrlInstance::new("test.xml", DocumentFormat::Xbrl);
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
        instance.add_context(XbrlContext::new("c1", "1", "cik", XbrlPeriod::Instant(date)));
        for (name, value, decimals) in facts {
            instance.facts.push(
                XbrlFact::new("http://fasb.org/us-gaap/2024", "us-gaap", *name, "c1")
                    .with_numeric(value.to_string(), *value)
                    .with_type(FactType::Monetary)
                    .with_decimals(Accuracy::Finite(*decimals)),
            );
        }
        instance
    }

    #[test]
    fn test_balanced_assets() {
        let result = CalculationValidator::new().validate(&instance(&[
            ("Assets", 300.0, 0),
            ("AssetsCurrent", 100.0, 0),
            ("AssetsNoncurrent", 200.0, 0),
        ]));
        assert_eq!(result.total_checks, 1);
        assert_eq!(result.valid_calculations, 1);
        assert!(result.is_valid());
    }

    #[test]
    fn test_unbalanced_assets() {
        let result = CalculationValidator::new().validate(&instance(&[
            ("Assets", 305.0, 0),
            ("AssetsCurrent", 100.0, 0),
            ("AssetsNoncurrent", 200.0, 0),
        ]));
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.parent, "Assets");
        assert_relative_eq!(error.difference, 5.0);
        assert_relative_eq!(error.tolerance, 0.5);
        assert_eq!(error.children, ["AssetsCurrent", "AssetsNoncurrent"]);
        assert_relative_eq!(result.error_rate(), 1.0);
    }

    #[rstest]
    // Exactly at the tolerance passes
    #[case(300.5, 0, true)]
    #[case(301.5, 0, false)]
    #[case(300_500_000.0, -6, true)]
    #[case(301_500_000.0, -6, false)]
    fn test_tolerance_boundary(#[case] parent: f64, #[case] decimals: i32, #[case] valid: bool) {
        let scale = if decimals < 0 { 1_000_000.0 } else { 1.0 };
        let result = CalculationValidator::new().validate(&instance(&[
            ("Assets", parent, decimals),
            ("AssetsCurrent", 100.0 * scale, decimals),
            ("AssetsNoncurrent", 200.0 * scale, decimals),
        ]));
        assert_eq!(result.is_valid(), valid);
    }

    #[test]
    fn test_skips_without_children() {
        let result = CalculationValidator::new().validate(&instance(&[("Assets", 300.0, 0)]));
        assert_eq!(result.total_checks, 0);
        assert_relative_eq!(result.error_rate(), 0.0);
    }

    #[test]
    fn test_weighted_children() {
        let result = CalculationValidator::new().validate(&instance(&[
            ("GrossProfit", 40.0, 0),
            ("Revenues", 100.0, 0),
            ("CostOfRevenue", 60.0, 0),
        ]));
        assert!(result.is_valid());
        assert_eq!(result.total_checks, 1);
    }

    #[test]
    fn test_custom_table() {
        let table = CalculationTable::empty().with(Relationship::new(
            "CustomTotal",
            &[("PartA", 1.0), ("PartB", 1.0)],
        ));
        let result = CalculationValidator::with_table(table).validate(&instance(&[
            ("CustomTotal", 10.0, 0),
            ("PartA", 4.0, 0),
            ("PartB", 5.0, 0),
            ("Assets", 1.0, 0),
            ("AssetsCurrent", 7.0, 0),
        ]));
        assert_eq!(result.total_checks, 1);
        assert_eq!(result.errors[0].parent, "CustomTotal");
    }

    #[test]
    fn test_potential_issues() {
        let validator = CalculationValidator::new();
        let balanced = instance(&[
            ("Assets", 1000.0, 0),
            ("Liabilities", 600.0, 0),
            ("StockholdersEquity", 400.5, 0),
        ]);
        assert!(validator.find_potential_issues(&balanced).is_empty());

        let imbalanced = instance(&[
            ("Assets", 1000.0, 0),
            ("LiabilitiesAndStockholdersEquity", 990.0, 0),
        ]);
        let issues = validator.find_potential_issues(&imbalanced);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BalanceSheetImbalance);
        assert_eq!(issues[0].difference, Some(10.0));
    }
}
