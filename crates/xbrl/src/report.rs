//! Fact lookups, exports and the combined analysis report.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use xbrl_analysis::{PotentialIssue, StandardizedData, ValidationResult};
use xbrl_core::{InstanceSummary, XbrlFact, XbrlInstance};
use xbrl_edgar::SecFilingMetadata;

/// Concepts reported by [`key_financials`], in display order.
pub const KEY_FINANCIALS: &[&str] = &[
    "Assets",
    "AssetsCurrent",
    "Liabilities",
    "LiabilitiesCurrent",
    "StockholdersEquity",
    "CashAndCashEquivalentsAtCarryingValue",
    "LongTermDebt",
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingIncomeLoss",
    "NetIncomeLoss",
    "EarningsPerShareBasic",
    "EarningsPerShareDiluted",
    "NetCashProvidedByUsedInOperatingActivities",
    "NetCashProvidedByUsedInInvestingActivities",
    "NetCashProvidedByUsedInFinancingActivities",
    "CommonStockSharesOutstanding",
    "WeightedAverageNumberOfSharesOutstandingBasic",
];

/// Values of the [`KEY_FINANCIALS`] concepts in the primary context.
///
/// Concepts without a numeric value there are left out.
#[must_use]
pub fn key_financials(instance: &XbrlInstance) -> BTreeMap<String, f64> {
    KEY_FINANCIALS
        .iter()
        .filter_map(|name| {
            let value = instance.primary_fact(name)?.normalized_value()?;
            Some(((*name).to_string(), value))
        })
        .collect()
}

/// Facts whose local name or prefix contains `query`, ignoring case.
///
/// An empty query matches every fact.
#[must_use]
pub fn search_facts<'a>(instance: &'a XbrlInstance, query: &str) -> Vec<&'a XbrlFact> {
    let query = query.trim().to_lowercase();
    instance
        .facts
        .iter()
        .filter(|f| {
            f.local_name.to_lowercase().contains(&query) || f.prefix.to_lowercase().contains(&query)
        })
        .collect()
}

/// One fact flattened for export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactRow {
    /// `prefix:localName`.
    pub concept: String,
    /// Value as text; numbers are normalized.
    pub value: String,
    /// Normalized numeric value.
    pub numeric_value: Option<f64>,
    /// Unit display form, e.g. `USD/shares`.
    pub unit: Option<String>,
    /// Context id.
    pub context_id: String,
    /// Start of a duration period.
    pub period_start: Option<NaiveDate>,
    /// Instant or end of a duration period.
    pub period_end: Option<NaiveDate>,
    /// `decimals` attribute, `INF` for exact values.
    pub decimals: Option<String>,
    /// Fact type name.
    pub fact_type: String,
    /// Whether the context carries dimensions.
    pub dimensional: bool,
}

/// Every fact of `instance` as a row, in document order.
#[must_use]
pub fn export_facts(instance: &XbrlInstance) -> Vec<FactRow> {
    instance
        .facts
        .iter()
        .map(|fact| {
            let context = instance.context(&fact.context_ref);
            let period = context.map(|c| c.period);
            FactRow {
                concept: fact.qualified_name(),
                value: fact.display_value(),
                numeric_value: fact.normalized_value(),
                unit: instance.unit_of(fact).map(ToString::to_string),
                context_id: fact.context_ref.clone(),
                period_start: period.and_then(|p| p.start_date()),
                period_end: period.and_then(|p| p.end_date()),
                decimals: fact.decimals.map(|d| d.to_string()),
                fact_type: fact.fact_type.to_string(),
                dimensional: context.is_some_and(|c| c.is_dimensional()),
            }
        })
        .collect()
}

/// [`export_facts`] as a `DataFrame` with date-typed period columns.
pub fn export_facts_frame(instance: &XbrlInstance) -> PolarsResult<DataFrame> {
    let rows = export_facts(instance);
    let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string());

    DataFrame::new(vec![
        Column::new("concept".into(), rows.iter().map(|r| r.concept.as_str()).collect::<Vec<_>>()),
        Column::new("value".into(), rows.iter().map(|r| r.value.as_str()).collect::<Vec<_>>()),
        Column::new(
            "numeric_value".into(),
            rows.iter().map(|r| r.numeric_value).collect::<Vec<_>>(),
        ),
        Column::new("unit".into(), rows.iter().map(|r| r.unit.clone()).collect::<Vec<_>>()),
        Column::new(
            "context_id".into(),
            rows.iter().map(|r| r.context_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "period_start".into(),
            rows.iter().map(|r| date(r.period_start)).collect::<Vec<_>>(),
        ),
        Column::new(
            "period_end".into(),
            rows.iter().map(|r| date(r.period_end)).collect::<Vec<_>>(),
        ),
        Column::new("decimals".into(), rows.iter().map(|r| r.decimals.clone()).collect::<Vec<_>>()),
        Column::new(
            "fact_type".into(),
            rows.iter().map(|r| r.fact_type.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "dimensional".into(),
            rows.iter().map(|r| r.dimensional).collect::<Vec<_>>(),
        ),
    ])?
    .lazy()
    .with_columns([
        col("period_start").cast(DataType::Date),
        col("period_end").cast(DataType::Date),
    ])
    .collect()
}

/// Everything known about one filing, ready to serialize.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComprehensiveAnalysis {
    /// Counts, format and primary period.
    pub summary: InstanceSummary,
    /// Cover page metadata.
    pub metadata: SecFilingMetadata,
    /// [`KEY_FINANCIALS`] values.
    pub key_financials: BTreeMap<String, f64>,
    /// Canonical values.
    pub standardized: StandardizedData,
    /// Calculation check outcome.
    pub validation: ValidationResult,
    /// Balance sheet and context problems.
    pub potential_issues: Vec<PotentialIssue>,
}
