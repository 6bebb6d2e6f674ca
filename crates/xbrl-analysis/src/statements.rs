//! Financial statements rebuilt from the primary reporting period.
//!
//! Line items come from fixed concept catalogs, one per statement section,
//! and appear in catalog order. A concept without a reported fact is left
//! out rather than filled with zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use xbrl_core::{FactType, XbrlInstance};
use xbrl_taxonomy::TaxonomyResolver;

/// Language used for line item labels.
pub const LABEL_LANGUAGE: &str = "en-US";

const CURRENT_ASSETS: &[&str] = &[
    "CashAndCashEquivalentsAtCarryingValue",
    "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
    "ShortTermInvestments",
    "MarketableSecuritiesCurrent",
    "AccountsReceivableNetCurrent",
    "NontradeReceivablesCurrent",
    "InventoryNet",
    "PrepaidExpenseAndOtherAssetsCurrent",
    "OtherAssetsCurrent",
    "AssetsCurrent",
];

const NONCURRENT_ASSETS: &[&str] = &[
    "MarketableSecuritiesNoncurrent",
    "PropertyPlantAndEquipmentNet",
    "OperatingLeaseRightOfUseAsset",
    "Goodwill",
    "IntangibleAssetsNetExcludingGoodwill",
    "DeferredIncomeTaxAssetsNet",
    "OtherAssetsNoncurrent",
    "AssetsNoncurrent",
    "Assets",
];

const CURRENT_LIABILITIES: &[&str] = &[
    "AccountsPayableCurrent",
    "AccruedLiabilitiesCurrent",
    "EmployeeRelatedLiabilitiesCurrent",
    "ContractWithCustomerLiabilityCurrent",
    "CommercialPaper",
    "ShortTermBorrowings",
    "LongTermDebtCurrent",
    "OperatingLeaseLiabilityCurrent",
    "OtherLiabilitiesCurrent",
    "LiabilitiesCurrent",
];

const NONCURRENT_LIABILITIES: &[&str] = &[
    "LongTermDebtNoncurrent",
    "OperatingLeaseLiabilityNoncurrent",
    "DeferredIncomeTaxLiabilitiesNet",
    "ContractWithCustomerLiabilityNoncurrent",
    "OtherLiabilitiesNoncurrent",
    "LiabilitiesNoncurrent",
    "Liabilities",
];

const EQUITY: &[&str] = &[
    "PreferredStockValue",
    "CommonStockValue",
    "AdditionalPaidInCapital",
    "CommonStocksIncludingAdditionalPaidInCapital",
    "RetainedEarningsAccumulatedDeficit",
    "AccumulatedOtherComprehensiveIncomeLossNetOfTax",
    "TreasuryStockValue",
    "StockholdersEquity",
    "MinorityInterest",
    "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
    "LiabilitiesAndStockholdersEquity",
];

const REVENUE: &[&str] = &[
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "SalesRevenueNet",
    "CostOfRevenue",
    "CostOfGoodsAndServicesSold",
    "GrossProfit",
];

const EXPENSES: &[&str] = &[
    "ResearchAndDevelopmentExpense",
    "SellingGeneralAndAdministrativeExpense",
    "SellingAndMarketingExpense",
    "GeneralAndAdministrativeExpense",
    "RestructuringCharges",
    "OperatingExpenses",
    "CostsAndExpenses",
];

const OPERATING: &[&str] = &["OperatingIncomeLoss"];

const NON_OPERATING: &[&str] = &[
    "InterestExpense",
    "InvestmentIncomeInterest",
    "OtherNonoperatingIncomeExpense",
    "NonoperatingIncomeExpense",
    "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
    "IncomeTaxExpenseBenefit",
];

const NET_INCOME: &[&str] = &[
    "ProfitLoss",
    "NetIncomeLossAttributableToNoncontrollingInterest",
    "NetIncomeLoss",
    "OtherComprehensiveIncomeLossNetOfTax",
    "ComprehensiveIncomeNetOfTax",
];

const PER_SHARE: &[&str] = &[
    "EarningsPerShareBasic",
    "EarningsPerShareDiluted",
    "WeightedAverageNumberOfSharesOutstandingBasic",
    "WeightedAverageNumberOfDilutedSharesOutstanding",
    "CommonStockDividendsPerShareDeclared",
];

const OPERATING_CASH: &[&str] = &[
    "DepreciationDepletionAndAmortization",
    "DepreciationAndAmortization",
    "ShareBasedCompensation",
    "DeferredIncomeTaxExpenseBenefit",
    "IncreaseDecreaseInAccountsReceivable",
    "IncreaseDecreaseInInventories",
    "IncreaseDecreaseInAccountsPayable",
    "IncreaseDecreaseInContractWithCustomerLiability",
    "NetCashProvidedByUsedInOperatingActivities",
];

const INVESTING_CASH: &[&str] = &[
    "PaymentsToAcquirePropertyPlantAndEquipment",
    "PaymentsToAcquireBusinessesNetOfCashAcquired",
    "PaymentsToAcquireAvailableForSaleSecuritiesDebt",
    "ProceedsFromMaturitiesPrepaymentsAndCallsOfAvailableForSaleSecurities",
    "ProceedsFromSaleOfAvailableForSaleSecuritiesDebt",
    "NetCashProvidedByUsedInInvestingActivities",
];

const FINANCING_CASH: &[&str] = &[
    "ProceedsFromIssuanceOfLongTermDebt",
    "RepaymentsOfLongTermDebt",
    "ProceedsFromIssuanceOfCommonStock",
    "PaymentsForRepurchaseOfCommonStock",
    "PaymentsOfDividends",
    "NetCashProvidedByUsedInFinancingActivities",
];

const NET_CHANGE: &[&str] = &[
    "EffectOfExchangeRateOnCashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
    "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
    "CashAndCashEquivalentsPeriodIncreaseDecrease",
];

/// One reported value on a statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Concept local name.
    pub concept: String,
    /// Human readable label.
    pub label: String,
    /// Normalized value.
    pub value: f64,
    /// Fact type of the underlying fact.
    pub fact_type: FactType,
    /// Unit, e.g. `USD` or `USD/shares`.
    pub unit: Option<String>,
}

/// Common behaviour of the three statements.
pub trait Statement {
    /// Named sections in presentation order.
    fn sections(&self) -> Vec<(&'static str, &[LineItem])>;

    /// Value of `concept` if it appears on the statement.
    fn total(&self, concept: &str) -> Option<f64> {
        self.sections()
            .into_iter()
            .flat_map(|(_, items)| items.iter())
            .find(|item| item.concept == concept)
            .map(|item| item.value)
    }

    /// Number of line items.
    fn len(&self) -> usize {
        self.sections().iter().map(|(_, items)| items.len()).sum()
    }

    /// Returns true when nothing was reported.
    fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, items)| items.is_empty())
    }
}

/// Statement of financial position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Current assets.
    pub current_assets: Vec<LineItem>,
    /// Noncurrent assets and total assets.
    pub noncurrent_assets: Vec<LineItem>,
    /// Current liabilities.
    pub current_liabilities: Vec<LineItem>,
    /// Noncurrent liabilities and total liabilities.
    pub noncurrent_liabilities: Vec<LineItem>,
    /// Equity components and totals.
    pub equity: Vec<LineItem>,
}

impl Statement for BalanceSheet {
    fn sections(&self) -> Vec<(&'static str, &[LineItem])> {
        vec![
            ("Current assets", self.current_assets.as_slice()),
            ("Noncurrent assets", self.noncurrent_assets.as_slice()),
            ("Current liabilities", self.current_liabilities.as_slice()),
            ("Noncurrent liabilities", self.noncurrent_liabilities.as_slice()),
            ("Equity", self.equity.as_slice()),
        ]
    }
}

/// Statement of operations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// Revenue, cost of revenue and gross profit.
    pub revenue: Vec<LineItem>,
    /// Operating expenses.
    pub expenses: Vec<LineItem>,
    /// Operating income.
    pub operating: Vec<LineItem>,
    /// Non-operating items and taxes.
    pub non_operating: Vec<LineItem>,
    /// Net and comprehensive income.
    pub net_income: Vec<LineItem>,
    /// Earnings per share and share counts.
    pub per_share: Vec<LineItem>,
}

impl Statement for IncomeStatement {
    fn sections(&self) -> Vec<(&'static str, &[LineItem])> {
        vec![
            ("Revenue", self.revenue.as_slice()),
            ("Operating expenses", self.expenses.as_slice()),
            ("Operating income", self.operating.as_slice()),
            ("Non-operating", self.non_operating.as_slice()),
            ("Net income", self.net_income.as_slice()),
            ("Per share", self.per_share.as_slice()),
        ]
    }
}

/// Statement of cash flows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    /// Operating activities.
    pub operating: Vec<LineItem>,
    /// Investing activities.
    pub investing: Vec<LineItem>,
    /// Financing activities.
    pub financing: Vec<LineItem>,
    /// Exchange rate effect and net change in cash.
    pub net_change: Vec<LineItem>,
}

impl Statement for CashFlowStatement {
    fn sections(&self) -> Vec<(&'static str, &[LineItem])> {
        vec![
            ("Operating activities", self.operating.as_slice()),
            ("Investing activities", self.investing.as_slice()),
            ("Financing activities", self.financing.as_slice()),
            ("Net change in cash", self.net_change.as_slice()),
        ]
    }
}

/// The three primary statements for one reporting period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    /// End of the reporting period.
    pub period_end: Option<NaiveDate>,
    /// Balance sheet.
    pub balance_sheet: BalanceSheet,
    /// Income statement.
    pub income_statement: IncomeStatement,
    /// Cash flow statement.
    pub cash_flow_statement: CashFlowStatement,
}

impl FinancialStatements {
    /// Returns true when no statement has a line item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance_sheet.is_empty()
            && self.income_statement.is_empty()
            && self.cash_flow_statement.is_empty()
    }
}

/// Builds [`FinancialStatements`] from an instance.
#[derive(Clone, Debug)]
pub struct StatementReconstructor {
    resolver: Arc<TaxonomyResolver>,
}

impl Default for StatementReconstructor {
    fn default() -> Self {
        Self::new(Arc::new(TaxonomyResolver::new()))
    }
}

impl StatementReconstructor {
    /// Creates a reconstructor using `resolver` for labels.
    #[must_use]
    pub const fn new(resolver: Arc<TaxonomyResolver>) -> Self {
        Self { resolver }
    }

    /// Rebuilds the statements for the instance's reporting period.
    #[must_use]
    pub fn reconstruct(&self, instance: &XbrlInstance) -> FinancialStatements {
        let items = |catalog: &[&str]| self.line_items(instance, catalog);
        let statements = FinancialStatements {
            period_end: instance.reporting_period_end(),
            balance_sheet: BalanceSheet {
                current_assets: items(CURRENT_ASSETS),
                noncurrent_assets: items(NONCURRENT_ASSETS),
                current_liabilities: items(CURRENT_LIABILITIES),
                noncurrent_liabilities: items(NONCURRENT_LIABILITIES),
                equity: items(EQUITY),
            },
            income_statement: IncomeStatement {
                revenue: items(REVENUE),
                expenses: items(EXPENSES),
                operating: items(OPERATING),
                non_operating: items(NON_OPERATING),
                net_income: items(NET_INCOME),
                per_share: items(PER_SHARE),
            },
            cash_flow_statement: CashFlowStatement {
                operating: items(OPERATING_CASH),
                investing: items(INVESTING_CASH),
                financing: items(FINANCING_CASH),
                net_change: items(NET_CHANGE),
            },
        };
        debug!(
            uri = %instance.document_uri,
            balance_sheet = statements.balance_sheet.len(),
            income_statement = statements.income_statement.len(),
            cash_flow = statements.cash_flow_statement.len(),
            "Reconstructed statements"
        );
        statements
    }

    fn line_items(&self, instance: &XbrlInstance, catalog: &[&str]) -> Vec<LineItem> {
        catalog
            .iter()
            .filter_map(|concept| {
                let fact = instance.primary_fact(concept)?;
                let value = fact.normalized_value()?;
                Some(LineItem {
                    concept: fact.local_name.clone(),
                    label: self.resolver.get_label(
                        &fact.namespace,
                        &fact.local_name,
                        LABEL_LANGUAGE,
                    ),
                    value,
                    fact_type: fact.fact_type,
                    unit: instance.unit_of(fact).map(ToString::to_string),
                })
            })
            .collect()
    }
}
