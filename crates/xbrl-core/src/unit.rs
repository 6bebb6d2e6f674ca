//! Units of measure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 namespace used for currency measures.
pub const ISO4217_NAMESPACE: &str = "http://www.xbrl.org/2003/iso4217";

/// XBRL instance namespace, home of `shares` and `pure`.
pub const XBRLI_NAMESPACE: &str = "http://www.xbrl.org/2003/instance";

/// Currency codes recognized without an ISO 4217 namespace binding.
const KNOWN_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "CAD", "AUD", "CHF", "HKD", "INR", "KRW", "BRL", "MXN",
    "SEK", "NOK", "DKK", "SGD", "TWD", "ZAR", "RUB", "ILS", "NZD", "PLN", "CLP", "COP", "ARS",
    "TRY", "IDR", "THB", "MYR", "PHP",
];

/// A single measure, e.g. `iso4217:USD` or `xbrli:shares`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measure {
    /// Namespace URI the measure prefix resolved to (empty when unbound).
    pub namespace: String,
    /// Local part of the measure QName.
    pub local_name: String,
}

impl Measure {
    /// Creates a measure.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Returns true for ISO 4217 currencies.
    #[must_use]
    pub fn is_currency(&self) -> bool {
        self.namespace == ISO4217_NAMESPACE
            || (self.local_name.len() == 3
                && KNOWN_CURRENCIES.contains(&self.local_name.to_ascii_uppercase().as_str()))
    }

    /// Returns true for `shares`.
    #[must_use]
    pub fn is_shares(&self) -> bool {
        self.local_name.eq_ignore_ascii_case("shares")
    }

    /// Returns true for `pure`.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.local_name.eq_ignore_ascii_case("pure")
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.local_name)
    }
}

/// Structure of a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// One measure.
    Simple(Measure),
    /// Numerator measures divided by denominator measures.
    Divide {
        /// Numerator measures.
        numerator: Vec<Measure>,
        /// Denominator measures.
        denominator: Vec<Measure>,
    },
    /// Product of several measures.
    Multiply(Vec<Measure>),
}

/// A unit declared in an instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlUnit {
    /// Unit id referenced by `unitRef`.
    pub id: String,
    /// Unit structure.
    pub kind: UnitKind,
}

impl XbrlUnit {
    /// Creates a simple unit.
    #[must_use]
    pub fn simple(id: impl Into<String>, measure: Measure) -> Self {
        Self {
            id: id.into(),
            kind: UnitKind::Simple(measure),
        }
    }

    /// Creates a divide unit.
    #[must_use]
    pub fn divide(id: impl Into<String>, numerator: Vec<Measure>, denominator: Vec<Measure>) -> Self {
        Self {
            id: id.into(),
            kind: UnitKind::Divide {
                numerator,
                denominator,
            },
        }
    }

    /// Returns true for a simple currency unit.
    #[must_use]
    pub fn is_monetary(&self) -> bool {
        matches!(&self.kind, UnitKind::Simple(m) if m.is_currency())
    }

    /// Returns true for a simple `shares` unit.
    #[must_use]
    pub fn is_shares(&self) -> bool {
        matches!(&self.kind, UnitKind::Simple(m) if m.is_shares())
    }

    /// Returns true for a simple `pure` unit.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        matches!(&self.kind, UnitKind::Simple(m) if m.is_pure())
    }

    /// Returns true for currency divided by shares.
    #[must_use]
    pub fn is_per_share(&self) -> bool {
        match &self.kind {
            UnitKind::Divide {
                numerator,
                denominator,
            } => {
                numerator.iter().any(Measure::is_currency)
                    && denominator.iter().any(Measure::is_shares)
            }
            _ => false,
        }
    }

    /// Currency code of a monetary unit.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Simple(m) if m.is_currency() => Some(&m.local_name),
            _ => None,
        }
    }
}

impl fmt::Display for XbrlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |measures: &[Measure], sep: &str| {
            measures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep)
        };
        match &self.kind {
            UnitKind::Simple(m) => write!(f, "{m}"),
            UnitKind::Divide {
                numerator,
                denominator,
            } => write!(f, "{}/{}", join(numerator, "*"), join(denominator, "*")),
            UnitKind::Multiply(measures) => f.write_str(&join(measures, "*")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Measure {
        Measure::new(ISO4217_NAMESPACE, "USD")
    }

    fn shares() -> Measure {
        Measure::new(XBRLI_NAMESPACE, "shares")
    }

    #[test]
    fn test_monetary_detection() {
        assert!(XbrlUnit::simple("usd", usd()).is_monetary());
        // Known currency code without the ISO namespace
        assert!(XbrlUnit::simple("eur", Measure::new("", "EUR")).is_monetary());
        assert!(!XbrlUnit::simple("shares", shares()).is_monetary());
        assert!(!XbrlUnit::simple("x", Measure::new("urn:custom", "Barrels")).is_monetary());
    }

    #[test]
    fn test_per_share() {
        let unit = XbrlUnit::divide("usdPerShare", vec![usd()], vec![shares()]);
        assert!(unit.is_per_share());
        assert!(!unit.is_monetary());
        assert_eq!(unit.to_string(), "USD/shares");
        assert_eq!(unit.currency(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(XbrlUnit::simple("usd", usd()).to_string(), "USD");
        let unit = XbrlUnit {
            id: "m".to_string(),
            kind: UnitKind::Multiply(vec![usd(), shares()]),
        };
        assert_eq!(unit.to_string(), "USD*shares");
    }
}
