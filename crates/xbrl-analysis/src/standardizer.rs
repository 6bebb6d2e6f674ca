//! Canonical concepts for cross-company comparison.
//!
//! Filers tag the same economic item with different concepts: `Revenues`,
//! `RevenueFromContractWithCustomerExcludingAssessedTax`, or an extension such
//! as `abc:TotalNetRevenues`. Each canonical concept lists its standard
//! synonyms in order of preference; extension concepts match after common
//! affixes (`Total`, `Net`, `Amount`) are stripped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;
use xbrl_core::{XbrlFact, XbrlInstance, namespaces};

/// Side of the balance sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceSheetSide {
    /// Assets.
    Asset,
    /// Liabilities.
    Liability,
    /// Equity.
    Equity,
}

/// Where a canonical concept belongs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptCategory {
    /// Balance sheet item.
    BalanceSheet(BalanceSheetSide),
    /// Income statement item.
    Income,
    /// Cash flow statement item.
    CashFlow,
    /// Per share amount.
    PerShare,
    /// Share count.
    Shares,
}

/// A cross-filer concept and the filer concepts that map onto it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CanonicalConcept {
    /// Canonical name.
    pub name: &'static str,
    /// Category.
    pub category: ConceptCategory,
    /// Short description.
    pub description: &'static str,
    /// Local names in order of preference.
    pub synonyms: &'static [&'static str],
}

const fn concept(
    name: &'static str,
    category: ConceptCategory,
    description: &'static str,
    synonyms: &'static [&'static str],
) -> CanonicalConcept {
    CanonicalConcept {
        name,
        category,
        description,
        synonyms,
    }
}

use BalanceSheetSide::{Asset, Equity, Liability};
use ConceptCategory::{BalanceSheet, CashFlow, Income, PerShare, Shares};

/// The canonical concepts.
pub const CANONICAL_CONCEPTS: &[CanonicalConcept] = &[
    concept("TotalAssets", BalanceSheet(Asset), "Total assets", &["Assets"]),
    concept("CurrentAssets", BalanceSheet(Asset), "Total current assets", &["AssetsCurrent"]),
    concept(
        "CashAndEquivalents",
        BalanceSheet(Asset),
        "Cash and cash equivalents",
        &[
            "CashAndCashEquivalentsAtCarryingValue",
            "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
            "Cash",
        ],
    ),
    concept(
        "ShortTermInvestments",
        BalanceSheet(Asset),
        "Short-term investments and marketable securities",
        &[
            "ShortTermInvestments",
            "MarketableSecuritiesCurrent",
            "AvailableForSaleSecuritiesDebtSecuritiesCurrent",
        ],
    ),
    concept(
        "AccountsReceivable",
        BalanceSheet(Asset),
        "Trade receivables",
        &["AccountsReceivableNetCurrent", "ReceivablesNetCurrent"],
    ),
    concept("Inventory", BalanceSheet(Asset), "Inventories", &["InventoryNet"]),
    concept(
        "PropertyPlantEquipment",
        BalanceSheet(Asset),
        "Property, plant and equipment, net",
        &["PropertyPlantAndEquipmentNet"],
    ),
    concept("Goodwill", BalanceSheet(Asset), "Goodwill", &["Goodwill"]),
    concept(
        "IntangibleAssets",
        BalanceSheet(Asset),
        "Intangible assets excluding goodwill",
        &[
            "IntangibleAssetsNetExcludingGoodwill",
            "FiniteLivedIntangibleAssetsNet",
        ],
    ),
    concept("TotalLiabilities", BalanceSheet(Liability), "Total liabilities", &["Liabilities"]),
    concept(
        "CurrentLiabilities",
        BalanceSheet(Liability),
        "Total current liabilities",
        &["LiabilitiesCurrent"],
    ),
    concept(
        "AccountsPayable",
        BalanceSheet(Liability),
        "Trade payables",
        &[
            "AccountsPayableCurrent",
            "AccountsPayableAndAccruedLiabilitiesCurrent",
        ],
    ),
    concept(
        "ShortTermDebt",
        BalanceSheet(Liability),
        "Debt due within one year",
        &[
            "DebtCurrent",
            "ShortTermBorrowings",
            "LongTermDebtCurrent",
            "CommercialPaper",
        ],
    ),
    concept(
        "LongTermDebt",
        BalanceSheet(Liability),
        "Debt due after one year",
        &[
            "LongTermDebtNoncurrent",
            "LongTermDebt",
            "LongTermDebtAndCapitalLeaseObligations",
        ],
    ),
    concept(
        "StockholdersEquity",
        BalanceSheet(Equity),
        "Equity attributable to the parent",
        &[
            "StockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        ],
    ),
    concept(
        "RetainedEarnings",
        BalanceSheet(Equity),
        "Retained earnings or accumulated deficit",
        &["RetainedEarningsAccumulatedDeficit"],
    ),
    concept(
        "TotalLiabilitiesAndEquity",
        BalanceSheet(Equity),
        "Total liabilities and equity",
        &["LiabilitiesAndStockholdersEquity"],
    ),
    concept(
        "Revenue",
        Income,
        "Total revenue",
        &[
            "Revenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "RevenueFromContractWithCustomerIncludingAssessedTax",
            "SalesRevenueNet",
        ],
    ),
    concept(
        "CostOfRevenue",
        Income,
        "Cost of revenue",
        &["CostOfRevenue", "CostOfGoodsAndServicesSold", "CostOfGoodsSold"],
    ),
    concept("GrossProfit", Income, "Gross profit", &["GrossProfit"]),
    concept(
        "ResearchAndDevelopment",
        Income,
        "Research and development expense",
        &["ResearchAndDevelopmentExpense"],
    ),
    concept(
        "SellingGeneralAdministrative",
        Income,
        "Selling, general and administrative expense",
        &["SellingGeneralAndAdministrativeExpense"],
    ),
    concept(
        "OperatingExpenses",
        Income,
        "Total operating expenses",
        &["OperatingExpenses", "CostsAndExpenses"],
    ),
    concept("OperatingIncome", Income, "Operating income or loss", &["OperatingIncomeLoss"]),
    concept(
        "InterestExpense",
        Income,
        "Interest expense",
        &["InterestExpense", "InterestExpenseDebt"],
    ),
    concept(
        "PretaxIncome",
        Income,
        "Income before income taxes",
        &[
            "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
            "IncomeLossFromContinuingOperationsBeforeIncomeTaxesMinorityInterestAndIncomeLossFromEquityMethodInvestments",
        ],
    ),
    concept("IncomeTax", Income, "Income tax expense or benefit", &["IncomeTaxExpenseBenefit"]),
    concept(
        "NetIncome",
        Income,
        "Net income or loss",
        &[
            "NetIncomeLoss",
            "ProfitLoss",
            "NetIncomeLossAvailableToCommonStockholdersBasic",
        ],
    ),
    concept(
        "OperatingCashFlow",
        CashFlow,
        "Net cash from operating activities",
        &["NetCashProvidedByUsedInOperatingActivities"],
    ),
    concept(
        "InvestingCashFlow",
        CashFlow,
        "Net cash from investing activities",
        &["NetCashProvidedByUsedInInvestingActivities"],
    ),
    concept(
        "FinancingCashFlow",
        CashFlow,
        "Net cash from financing activities",
        &["NetCashProvidedByUsedInFinancingActivities"],
    ),
    concept(
        "CapitalExpenditures",
        CashFlow,
        "Purchases of property, plant and equipment",
        &[
            "PaymentsToAcquirePropertyPlantAndEquipment",
            "PaymentsToAcquireProductiveAssets",
        ],
    ),
    concept(
        "DepreciationAmortization",
        CashFlow,
        "Depreciation and amortization",
        &[
            "DepreciationDepletionAndAmortization",
            "DepreciationAndAmortization",
            "Depreciation",
        ],
    ),
    concept(
        "ShareBasedCompensation",
        CashFlow,
        "Share-based compensation",
        &["ShareBasedCompensation", "AllocatedShareBasedCompensationExpense"],
    ),
    concept(
        "DividendsPaid",
        CashFlow,
        "Dividends paid",
        &["PaymentsOfDividends", "PaymentsOfDividendsCommonStock"],
    ),
    concept(
        "ShareRepurchases",
        CashFlow,
        "Repurchases of common stock",
        &["PaymentsForRepurchaseOfCommonStock"],
    ),
    concept("EpsBasic", PerShare, "Basic earnings per share", &["EarningsPerShareBasic"]),
    concept(
        "EpsDiluted",
        PerShare,
        "Diluted earnings per share",
        &["EarningsPerShareDiluted", "EarningsPerShareBasicAndDiluted"],
    ),
    concept(
        "DividendsPerShare",
        PerShare,
        "Dividends declared per share",
        &[
            "CommonStockDividendsPerShareDeclared",
            "CommonStockDividendsPerShareCashPaid",
        ],
    ),
    concept(
        "SharesOutstanding",
        Shares,
        "Common shares outstanding",
        &[
            "CommonStockSharesOutstanding",
            "EntityCommonStockSharesOutstanding",
        ],
    ),
    concept(
        "WeightedAverageSharesBasic",
        Shares,
        "Weighted average basic shares",
        &["WeightedAverageNumberOfSharesOutstandingBasic"],
    ),
    concept(
        "WeightedAverageSharesDiluted",
        Shares,
        "Weighted average diluted shares",
        &["WeightedAverageNumberOfDilutedSharesOutstanding"],
    ),
];

/// Looks up a canonical concept by name.
#[must_use]
pub fn canonical(name: &str) -> Option<&'static CanonicalConcept> {
    CANONICAL_CONCEPTS.iter().find(|c| c.name == name)
}

/// A filer fact mapped onto a canonical concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardizedFact {
    /// Canonical concept name.
    pub canonical: String,
    /// Category of the canonical concept.
    pub category: ConceptCategory,
    /// Description of the canonical concept.
    pub description: String,
    /// Normalized value.
    pub value: f64,
    /// Qualified name of the source fact.
    pub source_concept: String,
    /// Context of the source fact.
    pub context_id: String,
    /// Period end of the source fact.
    pub period_end: Option<NaiveDate>,
    /// Unit of the source fact.
    pub unit: Option<String>,
}

/// Standardized view of one instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardizedData {
    /// Entity identifier of the instance.
    pub entity_identifier: Option<String>,
    /// Reporting period end of the instance.
    pub period_end: Option<NaiveDate>,
    /// Standardized facts by canonical name.
    pub facts: BTreeMap<String, StandardizedFact>,
    /// Qualified names of numeric concepts with no canonical mapping.
    pub unmapped: BTreeSet<String>,
}

impl StandardizedData {
    /// Value of a canonical concept.
    #[must_use]
    pub fn value(&self, canonical: &str) -> Option<f64> {
        self.facts.get(canonical).map(|f| f.value)
    }

    /// Standardized fact for a canonical concept.
    #[must_use]
    pub fn get(&self, canonical: &str) -> Option<&StandardizedFact> {
        self.facts.get(canonical)
    }
}

/// Canonical values of several companies side by side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Company identifiers, in input order.
    pub companies: Vec<String>,
    /// Values by canonical concept, aligned with `companies`.
    pub concepts: BTreeMap<String, Vec<Option<f64>>>,
}

impl ComparisonResult {
    /// Value of `concept` for the company at `index`.
    #[must_use]
    pub fn value(&self, concept: &str, index: usize) -> Option<f64> {
        self.concepts.get(concept)?.get(index).copied().flatten()
    }
}

#[derive(Clone, Copy, Debug)]
struct Match {
    concept: usize,
    rank: usize,
}

/// Maps filer concepts onto [`CANONICAL_CONCEPTS`].
#[derive(Clone, Debug)]
pub struct ConceptStandardizer {
    exact: HashMap<&'static str, Match>,
    relaxed: HashMap<String, Match>,
}

impl Default for ConceptStandardizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptStandardizer {
    /// Builds the synonym lookups.
    #[must_use]
    pub fn new() -> Self {
        let mut exact = HashMap::new();
        let mut relaxed = HashMap::new();
        for (index, concept) in CANONICAL_CONCEPTS.iter().enumerate() {
            let count = concept.synonyms.len();
            for (rank, synonym) in concept.synonyms.iter().enumerate() {
                exact.entry(*synonym).or_insert(Match { concept: index, rank });
                relaxed.entry(relax(synonym)).or_insert(Match {
                    concept: index,
                    rank: count + rank,
                });
            }
        }
        Self { exact, relaxed }
    }

    /// Canonical concept for a filer local name.
    #[must_use]
    pub fn canonical_for(&self, local_name: &str) -> Option<&'static CanonicalConcept> {
        self.lookup(local_name)
            .map(|m| &CANONICAL_CONCEPTS[m.concept])
    }

    fn lookup(&self, local_name: &str) -> Option<Match> {
        self.exact
            .get(local_name)
            .or_else(|| self.relaxed.get(&relax(local_name)))
            .copied()
    }

    /// Standardizes the numeric, non-dimensional facts of an instance.
    ///
    /// When several facts map to one canonical concept the latest period
    /// wins; ties prefer standard taxonomy concepts, then the preferred
    /// synonym, then the longest duration.
    #[must_use]
    pub fn standardize(&self, instance: &XbrlInstance) -> StandardizedData {
        type Key = (Option<NaiveDate>, bool, Reverse<usize>, i64);
        let mut best: HashMap<usize, (Key, &XbrlFact)> = HashMap::new();
        let mut unmapped = BTreeSet::new();

        for fact in &instance.facts {
            let Some(context) = instance.context(&fact.context_ref) else {
                continue;
            };
            if context.is_dimensional() || fact.normalized_value().is_none() {
                continue;
            }
            let Some(found) = self.lookup(&fact.local_name) else {
                unmapped.insert(fact.qualified_name());
                continue;
            };
            let key = (
                context.end_date(),
                is_standard(&fact.namespace),
                Reverse(found.rank),
                context.period.duration_days().unwrap_or(0),
            );
            match best.get(&found.concept) {
                Some((current, _)) if *current >= key => {}
                _ => {
                    best.insert(found.concept, (key, fact));
                }
            }
        }

        let facts: BTreeMap<String, StandardizedFact> = best
            .into_iter()
            .filter_map(|(index, ((period_end, ..), fact))| {
                let concept = &CANONICAL_CONCEPTS[index];
                Some((
                    concept.name.to_string(),
                    StandardizedFact {
                        canonical: concept.name.to_string(),
                        category: concept.category,
                        description: concept.description.to_string(),
                        value: fact.normalized_value()?,
                        source_concept: fact.qualified_name(),
                        context_id: fact.context_ref.clone(),
                        period_end,
                        unit: instance.unit_of(fact).map(ToString::to_string),
                    },
                ))
            })
            .collect();

        debug!(
            uri = %instance.document_uri,
            mapped = facts.len(),
            unmapped = unmapped.len(),
            "Standardized instance"
        );
        StandardizedData {
            entity_identifier: instance.entity_identifier.clone(),
            period_end: instance.reporting_period_end(),
            facts,
            unmapped,
        }
    }

    /// Lines up the canonical values of several companies.
    #[must_use]
    pub fn compare(&self, data: &[StandardizedData]) -> ComparisonResult {
        let companies = data
            .iter()
            .enumerate()
            .map(|(i, d)| {
                d.entity_identifier
                    .clone()
                    .unwrap_or_else(|| format!("company-{}", i + 1))
            })
            .collect();
        let names: BTreeSet<&String> = data.iter().flat_map(|d| d.facts.keys()).collect();
        let concepts = names
            .into_iter()
            .map(|name| (name.clone(), data.iter().map(|d| d.value(name)).collect()))
            .collect();
        ComparisonResult {
            companies,
            concepts,
        }
    }
}

fn is_standard(namespace: &str) -> bool {
    namespaces::is_us_gaap(namespace)
        || namespaces::is_dei(namespace)
        || namespace.starts_with("http://fasb.org/srt/")
        || namespace.contains("xbrl.ifrs.org")
}

/// Lower-cased local name with `Total`, `Net` and `Amount` affixes removed.
fn relax(local_name: &str) -> String {
    let mut name = local_name;
    for prefix in ["Total", "Net"] {
        name = name.strip_prefix(prefix).unwrap_or(name);
    }
    for suffix in ["Amount", "Total", "Net"] {
        name = name.strip_suffix(suffix).unwrap_or(name);
    }
    if name.is_empty() {
        name = local_name;
    }
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use xbrl_core::{DocumentFormat, FactType, XbrlContext, XbrlDimension, XbrlPeriod};

    const GAAP: &str = "http://fasb.org/us-gaap/2024";
    const EXT: &str = "http://example.com/20241231";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fact(ns: &str, name: &str, ctx: &str, value: f64) -> XbrlFact {
        let prefix = if ns == GAAP { "us-gaap" } else { "abc" };
        XbrlFact::new(ns, prefix, name, ctx)
            .with_numeric(value.to_string(), value)
            .with_type(FactType::Monetary)
    }

    fn instance() -> XbrlInstance {
        let mut instance = XbrlInstance::new("a.xml", DocumentFormat::Xbrl);
        instance.entity_identifier = Some("0000000001".to_string());
        instance.add_context(XbrlContext::new("cur", "1", "cik", XbrlPeriod::Instant(date(2024, 12, 31))));
        instance.add_context(XbrlContext::new("prev", "1", "cik", XbrlPeriod::Instant(date(2023, 12, 31))));
        instance.add_context(
            XbrlContext::new("seg", "1", "cik", XbrlPeriod::Instant(date(2024, 12, 31)))
                .with_dimension(XbrlDimension::explicit("us-gaap:SegmentAxis", "abc:RetailMember")),
        );
        instance
    }

    #[rstest]
    #[case("Assets", Some("TotalAssets"))]
    #[case("RevenueFromContractWithCustomerExcludingAssessedTax", Some("Revenue"))]
    #[case("TotalRevenues", Some("Revenue"))]
    #[case("NetIncomeLossAmount", Some("NetIncome"))]
    #[case("SomethingCompletelyCustom", None)]
    fn test_canonical_for(#[case] local: &str, #[case] expected: Option<&str>) {
        let standardizer = ConceptStandardizer::new();
        assert_eq!(standardizer.canonical_for(local).map(|c| c.name), expected);
    }

    #[test]
    fn test_latest_period_wins() {
        let mut instance = instance();
        instance.facts.push(fact(GAAP, "Assets", "prev", 90.0));
        instance.facts.push(fact(GAAP, "Assets", "cur", 100.0));
        instance.facts.push(fact(GAAP, "Assets", "seg", 40.0));
        let data = ConceptStandardizer::new().standardize(&instance);
        assert_eq!(data.value("TotalAssets"), Some(100.0));
        assert_eq!(data.get("TotalAssets").unwrap().context_id, "cur");
        assert_eq!(data.period_end, Some(date(2024, 12, 31)));
    }

    #[test]
    fn test_standard_concept_preferred_over_extension() {
        let mut instance = instance();
        instance.facts.push(fact(EXT, "TotalRevenues", "cur", 11.0));
        instance.facts.push(fact(GAAP, "Revenues", "cur", 10.0));
        let data = ConceptStandardizer::new().standardize(&instance);
        assert_eq!(data.value("Revenue"), Some(10.0));
        assert_eq!(data.get("Revenue").unwrap().source_concept, "us-gaap:Revenues");
    }

    #[test]
    fn test_unmapped_retained() {
        let mut instance = instance();
        instance.facts.push(fact(EXT, "WidgetBacklog", "cur", 5.0));
        let data = ConceptStandardizer::new().standardize(&instance);
        assert!(data.facts.is_empty());
        assert!(data.unmapped.contains("abc:WidgetBacklog"));
    }

    #[test]
    fn test_compare_aligns_companies() {
        let standardizer = ConceptStandardizer::new();
        let mut a = instance();
        a.facts.push(fact(GAAP, "Assets", "cur", 100.0));
        let mut b = instance();
        b.entity_identifier = None;
        b.facts.push(fact(GAAP, "Liabilities", "cur", 50.0));

        let result = standardizer.compare(&[standardizer.standardize(&a), standardizer.standardize(&b)]);
        assert_eq!(result.companies, ["0000000001", "company-2"]);
        assert_eq!(result.value("TotalAssets", 0), Some(100.0));
        assert_eq!(result.value("TotalAssets", 1), None);
        assert_eq!(result.value("TotalLiabilities", 1), Some(50.0));
    }
}
