//! SEC form types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting period covered by a form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    /// Fiscal year.
    Annual,
    /// Fiscal quarter.
    Quarterly,
    /// Semi-annual period (investment companies).
    SemiAnnual,
    /// Triggered by an event rather than a period.
    Event,
    /// Transition period after a fiscal year change.
    Transition,
    /// Not tied to a reporting period.
    None,
}

/// Broad class of a filing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingCategory {
    /// 10-K, 20-F, 40-F and their variants.
    Annual,
    /// 10-Q and its amendment.
    Quarterly,
    /// 8-K.
    CurrentReport,
    /// S- and F- registration statements.
    Registration,
    /// 424 prospectuses.
    Prospectus,
    /// DEF and PRE proxy statements.
    Proxy,
    /// Anything else.
    #[default]
    Other,
}

impl FilingCategory {
    /// Category by form type prefix.
    #[must_use]
    pub fn from_form_type(form_type: &str) -> Self {
        let form = normalize(form_type);
        if ["10-K", "20-F", "40-F"].iter().any(|p| form.starts_with(p)) {
            Self::Annual
        } else if form.starts_with("10-Q") {
            Self::Quarterly
        } else if form.starts_with("8-K") {
            Self::CurrentReport
        } else if form.starts_with("S-") || form.starts_with("F-") {
            Self::Registration
        } else if form.starts_with("424") {
            Self::Prospectus
        } else if form.contains("DEF") || form.contains("PRE") {
            Self::Proxy
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for FilingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Annual => "ANNUAL",
            Self::Quarterly => "QUARTERLY",
            Self::CurrentReport => "CURRENT_REPORT",
            Self::Registration => "REGISTRATION",
            Self::Prospectus => "PROSPECTUS",
            Self::Proxy => "PROXY",
            Self::Other => "OTHER",
        })
    }
}

/// What a form type is and whether it carries financial statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FormTypeInfo {
    /// Canonical form type.
    pub form_type: &'static str,
    /// Description.
    pub description: &'static str,
    /// Reporting period.
    pub period_type: PeriodType,
    /// Whether full financial statements are expected.
    pub has_financial_statements: bool,
}

const fn form(
    form_type: &'static str,
    description: &'static str,
    period_type: PeriodType,
    has_financial_statements: bool,
) -> FormTypeInfo {
    FormTypeInfo {
        form_type,
        description,
        period_type,
        has_financial_statements,
    }
}

/// Known form types. `424B` matches every `424B*` variant.
pub const FORM_TYPES: &[FormTypeInfo] = &[
    form("10-K", "Annual report", PeriodType::Annual, true),
    form("10-K/A", "Amended annual report", PeriodType::Annual, true),
    form("10-KT", "Transition report", PeriodType::Transition, true),
    form("10-Q", "Quarterly report", PeriodType::Quarterly, true),
    form("10-Q/A", "Amended quarterly report", PeriodType::Quarterly, true),
    form("8-K", "Current report", PeriodType::Event, false),
    form("20-F", "Annual report of a foreign private issuer", PeriodType::Annual, true),
    form("40-F", "Annual report of a Canadian issuer", PeriodType::Annual, true),
    form("6-K", "Current report of a foreign private issuer", PeriodType::Event, false),
    form("S-1", "Registration statement", PeriodType::None, true),
    form("S-3", "Short-form registration statement", PeriodType::None, false),
    form("S-4", "Registration statement for business combinations", PeriodType::None, true),
    form("F-1", "Registration statement of a foreign issuer", PeriodType::None, true),
    form("424B", "Prospectus", PeriodType::None, false),
    form("DEF 14A", "Definitive proxy statement", PeriodType::None, false),
    form("PRE 14A", "Preliminary proxy statement", PeriodType::None, false),
    form("N-CSR", "Certified shareholder report of a registered investment company", PeriodType::SemiAnnual, true),
];

/// Looks up a form type, ignoring case and surrounding whitespace.
#[must_use]
pub fn form_type_info(form_type: &str) -> Option<FormTypeInfo> {
    let form = normalize(form_type);
    FORM_TYPES
        .iter()
        .find(|info| info.form_type == form)
        .or_else(|| {
            form.starts_with("424B")
                .then(|| FORM_TYPES.iter().find(|info| info.form_type == "424B"))
                .flatten()
        })
        .copied()
}

/// Returns true for amended form types (`10-K/A`).
#[must_use]
pub fn is_amended_form(form_type: &str) -> bool {
    normalize(form_type).ends_with("/A")
}

fn normalize(form_type: &str) -> String {
    form_type.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10-K", FilingCategory::Annual)]
    #[case("10-K/A", FilingCategory::Annual)]
    #[case("10-KT", FilingCategory::Annual)]
    #[case("20-F", FilingCategory::Annual)]
    #[case("40-F", FilingCategory::Annual)]
    #[case("10-q", FilingCategory::Quarterly)]
    #[case("8-K", FilingCategory::CurrentReport)]
    #[case("S-1", FilingCategory::Registration)]
    #[case("F-1", FilingCategory::Registration)]
    #[case("424B4", FilingCategory::Prospectus)]
    #[case("DEF 14A", FilingCategory::Proxy)]
    #[case("PRE 14A", FilingCategory::Proxy)]
    #[case("6-K", FilingCategory::Other)]
    #[case("N-CSR", FilingCategory::Other)]
    fn test_category(#[case] form: &str, #[case] expected: FilingCategory) {
        assert_eq!(FilingCategory::from_form_type(form), expected);
    }

    #[rstest]
    #[case(" 10-k ", Some("10-K"), true)]
    #[case("10-Q/A", Some("10-Q/A"), true)]
    #[case("8-K", Some("8-K"), false)]
    #[case("424B3", Some("424B"), false)]
    #[case("N-CSR", Some("N-CSR"), true)]
    #[case("SC 13G", None, false)]
    fn test_form_type_info(
        #[case] form: &str,
        #[case] canonical: Option<&str>,
        #[case] financials: bool,
    ) {
        let info = form_type_info(form);
        assert_eq!(info.map(|i| i.form_type), canonical);
        assert_eq!(info.is_some_and(|i| i.has_financial_statements), financials);
    }

    #[test]
    fn test_amended() {
        assert!(is_amended_form("10-k/a"));
        assert!(!is_amended_form("10-K"));
    }
}
