#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Multi-period stitching, growth, anomalies and ratios.
pub mod multi_period;
/// Canonical concept mapping.
pub mod standardizer;
/// Financial statement reconstruction.
pub mod statements;
/// Calculation relationship checks.
pub mod validator;

pub use multi_period::{
    Anomaly, AnomalyKind, ConceptTimeSeries, GrowthAnalysis, MultiPeriodAnalyzer, PeriodRatios,
    StitchedTimeSeries, Trend, YearOverYear,
};
pub use standardizer::{
    BalanceSheetSide, CanonicalConcept, ComparisonResult, ConceptCategory, ConceptStandardizer,
    StandardizedData, StandardizedFact,
};
pub use statements::{
    BalanceSheet, CashFlowStatement, FinancialStatements, IncomeStatement, LineItem, Statement,
    StatementReconstructor,
};
pub use validator::{
    CalcError, CalculationTable, CalculationValidator, IssueKind, PotentialIssue, Relationship,
    ValidationResult,
};
