//! XBRL facts.
//!
//! An [`XbrlFact`] is one reported data point. Facts are created once while
//! parsing and never modified afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::fact_type::FactType;

/// Reported accuracy of a numeric fact (`decimals` or `precision` attribute).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accuracy {
    /// A finite number of digits; negative values round to powers of ten.
    Finite(i32),
    /// `INF`: the value is exact.
    Infinite,
}

impl Accuracy {
    /// Half a unit at the reported accuracy: `0.5 × 10^(-decimals)`.
    ///
    /// `Infinite` accuracy has no tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        match self {
            Self::Finite(d) => 0.5 * 10f64.powi(-clamp_digits(*d)),
            Self::Infinite => 0.0,
        }
    }
}

impl FromStr for Accuracy {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("INF") {
            Ok(Self::Infinite)
        } else {
            s.parse().map(Self::Finite)
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(d) => write!(f, "{d}"),
            Self::Infinite => f.write_str("INF"),
        }
    }
}

/// Rounds `value` half-up (away from zero) to `decimals` digits.
///
/// Negative `decimals` round to a power of ten: `decimals = -3` rounds to the
/// nearest thousand.
#[must_use]
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let decimals = clamp_digits(decimals);
    if decimals >= 0 {
        let factor = 10f64.powi(decimals);
        let scaled = value * factor;
        if !scaled.is_finite() {
            return value;
        }
        scaled.round() / factor
    } else {
        let factor = 10f64.powi(-decimals);
        (value / factor).round() * factor
    }
}

/// Keeps powers of ten within the finite `f64` range.
fn clamp_digits(digits: i32) -> i32 {
    digits.clamp(-308, 308)
}

/// A single XBRL fact.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XbrlFact {
    /// Namespace URI of the concept.
    pub namespace: String,
    /// Local name of the concept (e.g. "Assets").
    pub local_name: String,
    /// Prefix bound to the namespace in the source document (e.g. "us-gaap").
    pub prefix: String,
    /// Optional `id` attribute.
    pub id: Option<String>,
    /// Reference to the fact's context.
    pub context_ref: String,
    /// Reference to the fact's unit (numeric facts only).
    pub unit_ref: Option<String>,
    /// Value exactly as found in the document (after continuation joining).
    pub raw_value: String,
    /// Parsed number, before scale and sign are applied.
    pub numeric_value: Option<f64>,
    /// Text value for non-numeric facts.
    pub string_value: Option<String>,
    /// Data type of the fact.
    pub fact_type: FactType,
    /// `decimals` attribute.
    pub decimals: Option<Accuracy>,
    /// `precision` attribute.
    pub precision: Option<Accuracy>,
    /// Inline XBRL `scale` attribute (power of ten).
    pub scale: Option<i32>,
    /// Inline XBRL `format` attribute.
    pub format: Option<String>,
    /// Inline XBRL `sign` attribute ("-" negates the value).
    pub sign: Option<String>,
    /// `xsi:nil="true"`.
    pub is_nil: bool,
    /// The fact was found nested inside another inline fact.
    pub is_nested: bool,
    /// `xml:lang` of the fact, if any.
    pub language: Option<String>,
    /// 1-based source line number.
    pub line: Option<usize>,
    /// Ids of footnotes attached to this fact.
    pub footnote_refs: Vec<String>,
}

impl XbrlFact {
    /// Creates a new fact with the required identity fields.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        local_name: impl Into<String>,
        context_ref: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into(),
            local_name: local_name.into(),
            context_ref: context_ref.into(),
            ..Default::default()
        }
    }

    /// Sets a numeric value, keeping its textual form as the raw value.
    #[must_use]
    pub fn with_numeric(mut self, raw: impl Into<String>, value: f64) -> Self {
        self.raw_value = raw.into();
        self.numeric_value = Some(value);
        self.string_value = None;
        self
    }

    /// Sets a text value.
    #[must_use]
    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.raw_value = value.clone();
        self.string_value = Some(value);
        self.numeric_value = None;
        self
    }

    /// Sets the fact type.
    #[must_use]
    pub const fn with_type(mut self, fact_type: FactType) -> Self {
        self.fact_type = fact_type;
        self
    }

    /// Sets the unit reference.
    #[must_use]
    pub fn with_unit(mut self, unit_ref: impl Into<String>) -> Self {
        self.unit_ref = Some(unit_ref.into());
        self
    }

    /// Sets the `decimals` attribute.
    #[must_use]
    pub const fn with_decimals(mut self, decimals: Accuracy) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Sets the inline `scale` attribute.
    #[must_use]
    pub const fn with_scale(mut self, scale: i32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the inline `sign` attribute.
    #[must_use]
    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    /// Returns true if this fact's type is numeric.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.fact_type.is_numeric()
    }

    /// Returns true if the inline `sign` attribute negates the value.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.sign.as_deref() == Some("-")
    }

    /// Returns `prefix:localName`, or the local name when there is no prefix.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.local_name.clone()
        } else {
            format!("{}:{}", self.prefix, self.local_name)
        }
    }

    /// Value with scale and sign applied: `value × 10^scale`, negated for `sign="-"`.
    #[must_use]
    pub fn normalized_value(&self) -> Option<f64> {
        let value = self.numeric_value?;
        let scaled = match self.scale {
            Some(scale) if scale != 0 => value * 10f64.powi(scale),
            _ => value,
        };
        Some(if self.is_negated() { -scaled } else { scaled })
    }

    /// Normalized value rounded half-up to the reported `decimals`.
    #[must_use]
    pub fn rounded_value(&self) -> Option<f64> {
        let value = self.normalized_value()?;
        Some(match self.decimals {
            Some(Accuracy::Finite(d)) => round_half_up(value, d),
            _ => value,
        })
    }

    /// Half a unit at the reported `decimals`; facts without `decimals` use 0.5.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.decimals.unwrap_or(Accuracy::Finite(0)).tolerance()
    }

    /// Returns the value for display: the normalized number or the text.
    #[must_use]
    pub fn display_value(&self) -> String {
        if self.is_nil {
            return String::new();
        }
        match self.normalized_value() {
            Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
            Some(v) => v.to_string(),
            None => self
                .string_value
                .clone()
                .unwrap_or_else(|| self.raw_value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn monetary(value: f64) -> XbrlFact {
        XbrlFact::new("http://fasb.org/us-gaap/2024", "us-gaap", "Assets", "c1")
            .with_numeric(value.to_string(), value)
            .with_type(FactType::Monetary)
            .with_unit("usd")
    }

    #[test]
    fn test_normalize_scale_and_sign() {
        let fact = monetary(5.0).with_scale(3).with_sign("-");
        assert_relative_eq!(fact.normalized_value().unwrap(), -5000.0);
    }

    #[test]
    fn test_normalize_without_inline_attributes() {
        let fact = monetary(1234.5);
        assert_relative_eq!(fact.normalized_value().unwrap(), 1234.5);
    }

    #[test]
    fn test_negative_scale() {
        let fact = monetary(250.0).with_scale(-2);
        assert_relative_eq!(fact.normalized_value().unwrap(), 2.5);
    }

    #[rstest]
    #[case(123.456, 2, 123.46)]
    #[case(123_456.0, -3, 123_000.0)]
    #[case(123_500.0, -3, 124_000.0)]
    #[case(0.125, 2, 0.13)]
    #[case(-2.5, 0, -3.0)]
    fn test_round_half_up(#[case] value: f64, #[case] decimals: i32, #[case] expected: f64) {
        assert_relative_eq!(round_half_up(value, decimals), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_extreme_decimals_stay_finite() {
        let accuracy: Accuracy = "-2147483648".parse().unwrap();
        assert_eq!(accuracy, Accuracy::Finite(i32::MIN));
        assert!(accuracy.tolerance().is_finite());
        assert_eq!(round_half_up(123.0, i32::MIN), 0.0);
        assert_eq!(round_half_up(123.0, i32::MAX), 123.0);
    }

    #[test]
    fn test_rounded_value_uses_decimals() {
        let fact = monetary(123.456).with_decimals(Accuracy::Finite(2));
        assert_relative_eq!(fact.rounded_value().unwrap(), 123.46, epsilon = 1e-9);

        let exact = monetary(123.456).with_decimals(Accuracy::Infinite);
        assert_relative_eq!(exact.rounded_value().unwrap(), 123.456);
    }

    #[rstest]
    #[case(Accuracy::Finite(0), 0.5)]
    #[case(Accuracy::Finite(-6), 500_000.0)]
    #[case(Accuracy::Finite(2), 0.005)]
    #[case(Accuracy::Infinite, 0.0)]
    fn test_tolerance(#[case] accuracy: Accuracy, #[case] expected: f64) {
        assert_relative_eq!(accuracy.tolerance(), expected);
    }

    #[test]
    fn test_accuracy_parse() {
        assert_eq!("INF".parse::<Accuracy>().unwrap(), Accuracy::Infinite);
        assert_eq!("-6".parse::<Accuracy>().unwrap(), Accuracy::Finite(-6));
        assert!("abc".parse::<Accuracy>().is_err());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(monetary(1.0).qualified_name(), "us-gaap:Assets");
        let bare = XbrlFact::new("urn:x", "", "Thing", "c1");
        assert_eq!(bare.qualified_name(), "Thing");
    }

    #[test]
    fn test_text_fact_has_no_number() {
        let fact = XbrlFact::new("urn:dei", "dei", "EntityRegistrantName", "c1")
            .with_text("Apple Inc.")
            .with_type(FactType::String);
        assert!(fact.normalized_value().is_none());
        assert_eq!(fact.display_value(), "Apple Inc.");
    }
}
