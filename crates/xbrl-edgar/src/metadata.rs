//! Filing metadata from document and entity information facts.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use xbrl_core::{XbrlError, XbrlFact, XbrlInstance, namespaces};

use crate::forms::{FilingCategory, FormTypeInfo, form_type_info, is_amended_form};

/// Width of a zero-padded CIK.
pub const CIK_WIDTH: usize = 10;

/// Fiscal period focus of a filing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// Full fiscal year.
    FY,
    /// First quarter.
    Q1,
    /// Second quarter.
    Q2,
    /// Third quarter.
    Q3,
    /// Fourth quarter.
    Q4,
    /// First half.
    H1,
    /// Second half.
    H2,
}

impl FiscalPeriod {
    /// Quarter number for `Q1`..`Q4`.
    #[must_use]
    pub const fn quarter(&self) -> Option<u8> {
        match self {
            Self::Q1 => Some(1),
            Self::Q2 => Some(2),
            Self::Q3 => Some(3),
            Self::Q4 => Some(4),
            _ => None,
        }
    }

    /// Returns true for the full fiscal year.
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        matches!(self, Self::FY)
    }
}

impl FromStr for FiscalPeriod {
    type Err = XbrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FY" => Ok(Self::FY),
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            "H1" => Ok(Self::H1),
            "H2" => Ok(Self::H2),
            other => Err(XbrlError::InvalidParameter(format!(
                "unknown fiscal period: {other}"
            ))),
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Entity and document information of one filing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SecFilingMetadata {
    /// Registrant name.
    pub entity_name: Option<String>,
    /// Zero-padded ten digit CIK.
    pub cik: Option<String>,
    /// Trading symbol.
    pub trading_symbol: Option<String>,
    /// Exchange the security trades on.
    pub security_exchange: Option<String>,
    /// Form type as reported (`DocumentType`).
    pub form_type: Option<String>,
    /// Classification of the form type.
    pub form_info: Option<FormTypeInfo>,
    /// Amendment flag.
    pub is_amendment: bool,
    /// End of the reporting period.
    pub document_period_end: Option<NaiveDate>,
    /// Fiscal year focus.
    pub fiscal_year: Option<i32>,
    /// Fiscal period focus.
    pub fiscal_period: Option<FiscalPeriod>,
    /// Fiscal year end as reported, e.g. `--12-31`.
    pub fiscal_year_end: Option<String>,
    /// Common shares outstanding from the cover page.
    pub shares_outstanding: Option<f64>,
    /// Filing category by form type.
    pub filing_category: FilingCategory,
    /// Every `dei` fact by local name.
    pub dei_facts: BTreeMap<String, String>,
}

impl SecFilingMetadata {
    /// Returns true when the form type carries financial statements.
    #[must_use]
    pub fn is_financial_report(&self) -> bool {
        self.form_info
            .is_some_and(|info| info.has_financial_statements)
    }
}

/// Extracts [`SecFilingMetadata`] from an instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecFilingExtractor;

impl SecFilingExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reads the `dei` facts of `instance`.
    ///
    /// Facts in non-dimensional contexts take precedence. Share counts
    /// reported only per share class are summed.
    #[must_use]
    pub fn extract(&self, instance: &XbrlInstance) -> SecFilingMetadata {
        let dei: Vec<(&XbrlFact, bool)> = instance
            .facts
            .iter()
            .filter(|f| namespaces::is_dei(&f.namespace) && !f.is_nil)
            .map(|f| {
                let dimensional = instance
                    .context(&f.context_ref)
                    .is_some_and(|c| c.is_dimensional());
                (f, dimensional)
            })
            .collect();

        let mut dei_facts = BTreeMap::new();
        for pass in [false, true] {
            for (fact, dimensional) in &dei {
                let value = fact.display_value();
                if *dimensional == pass && !value.is_empty() {
                    dei_facts.entry(fact.local_name.clone()).or_insert(value);
                }
            }
        }

        let text = |name: &str| dei_facts.get(name).cloned();
        let form_type = text("DocumentType");
        let form_info = form_type.as_deref().and_then(form_type_info);
        let is_amendment = match text("AmendmentFlag") {
            Some(flag) => parse_flag(&flag),
            None => form_type.as_deref().is_some_and(is_amended_form),
        };

        let cik = text("EntityCentralIndexKey")
            .as_deref()
            .and_then(normalize_cik)
            .or_else(|| instance.entity_identifier.as_deref().and_then(normalize_cik));

        let metadata = SecFilingMetadata {
            entity_name: text("EntityRegistrantName"),
            cik,
            trading_symbol: text("TradingSymbol"),
            security_exchange: text("SecurityExchangeName"),
            filing_category: form_type
                .as_deref()
                .map(FilingCategory::from_form_type)
                .unwrap_or_default(),
            form_info,
            form_type,
            is_amendment,
            document_period_end: text("DocumentPeriodEndDate")
                .as_deref()
                .and_then(parse_date),
            fiscal_year: text("DocumentFiscalYearFocus").and_then(|y| y.trim().parse().ok()),
            fiscal_period: text("DocumentFiscalPeriodFocus").and_then(|p| p.parse().ok()),
            fiscal_year_end: text("CurrentFiscalYearEndDate"),
            shares_outstanding: shares_outstanding(&dei),
            dei_facts,
        };
        debug!(
            uri = %instance.document_uri,
            cik = ?metadata.cik,
            form_type = ?metadata.form_type,
            "Extracted filing metadata"
        );
        metadata
    }
}

fn shares_outstanding(dei: &[(&XbrlFact, bool)]) -> Option<f64> {
    let values = |dimensional: bool| {
        dei.iter()
            .filter(move |(f, d)| *d == dimensional && f.local_name == "EntityCommonStockSharesOutstanding")
            .filter_map(|(f, _)| f.normalized_value())
    };
    values(false).next().or_else(|| {
        let classes: Vec<f64> = values(true).collect();
        (!classes.is_empty()).then(|| classes.iter().sum())
    })
}

/// `true` or `yes`, ignoring case.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

/// Zero-pads the digits of `value` to a ten digit CIK.
///
/// Non-digits are dropped, so `"CIK0000320193"` and `"320193"` both give
/// `"0000320193"`. Returns `None` when no digits remain or more than ten do.
///
/// ```
/// assert_eq!(xbrl_edgar::normalize_cik("320193").as_deref(), Some("0000320193"));
/// ```
#[must_use]
pub fn normalize_cik(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.len() > CIK_WIDTH {
        return None;
    }
    Some(format!("{digits:0>width$}", width = CIK_WIDTH))
}

/// Parses a DEI date: ISO-8601, then `MM/dd/yyyy`, then ISO with a time.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .map(|dt| dt.date())
                .ok()
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-12-31", Some((2024, 12, 31)))]
    #[case("12/31/2024", Some((2024, 12, 31)))]
    #[case("2024-12-31T00:00:00", Some((2024, 12, 31)))]
    #[case("2024-12-31T10:00:00Z", Some((2024, 12, 31)))]
    #[case("Dec 31, 2024", None)]
    fn test_parse_date(#[case] value: &str, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_date(value), expected);
    }

    #[rstest]
    #[case("320193", Some("0000320193"))]
    #[case("0000320193", Some("0000320193"))]
    #[case("CIK-320193", Some("0000320193"))]
    #[case("no digits", None)]
    #[case("12345678901", None)]
    fn test_normalize_cik(#[case] value: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_cik(value).as_deref(), expected);
    }

    #[rstest]
    #[case("fy", FiscalPeriod::FY)]
    #[case("Q3", FiscalPeriod::Q3)]
    #[case(" h2 ", FiscalPeriod::H2)]
    fn test_fiscal_period(#[case] value: &str, #[case] expected: FiscalPeriod) {
        assert_eq!(value.parse::<FiscalPeriod>().unwrap(), expected);
    }

    #[test]
    fn test_fiscal_period_rejects_unknown() {
        assert!("Q5".parse::<FiscalPeriod>().is_err());
        assert_eq!(FiscalPeriod::Q2.quarter(), Some(2));
        assert_eq!(FiscalPeriod::FY.to_string(), "FY");
    }

    #[rstest]
    #[case("true", true)]
    #[case("YES", true)]
    #[case("false", false)]
    #[case("no", false)]
    fn test_parse_flag(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(parse_flag(value), expected);
    }
}
