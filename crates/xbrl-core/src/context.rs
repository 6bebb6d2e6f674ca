//! Reporting contexts: entity, period and dimensional qualifiers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reporting period of a context. Exactly one form is populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XbrlPeriod {
    /// Point in time (balance sheet items).
    Instant(NaiveDate),
    /// Span of time (income and cash flow items).
    Duration {
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },
    /// Timeless facts.
    Forever,
}

impl XbrlPeriod {
    /// The instant or the duration end date; `None` for forever.
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Instant(date) => Some(*date),
            Self::Duration { end, .. } => Some(*end),
            Self::Forever => None,
        }
    }

    /// Start date of a duration.
    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Duration { start, .. } => Some(*start),
            _ => None,
        }
    }

    /// Returns true for an instant period.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }

    /// Returns true for a duration period.
    #[must_use]
    pub const fn is_duration(&self) -> bool {
        matches!(self, Self::Duration { .. })
    }

    /// Length of a duration in days.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        match self {
            Self::Duration { start, end } => Some(end.signed_duration_since(*start).num_days()),
            _ => None,
        }
    }
}

/// A dimension member value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionMember {
    /// `xbrldi:explicitMember` holding a member QName.
    Explicit(String),
    /// `xbrldi:typedMember` holding arbitrary content.
    Typed(String),
}

impl DimensionMember {
    /// The member QName or typed content.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Explicit(v) | Self::Typed(v) => v,
        }
    }
}

/// One axis/member pair qualifying a context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XbrlDimension {
    /// Axis QName (e.g. "us-gaap:StatementBusinessSegmentsAxis").
    pub axis: String,
    /// Member of the axis.
    pub member: DimensionMember,
}

impl XbrlDimension {
    /// Creates an explicit dimension.
    #[must_use]
    pub fn explicit(axis: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            member: DimensionMember::Explicit(member.into()),
        }
    }

    /// Creates a typed dimension.
    #[must_use]
    pub fn typed(axis: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            member: DimensionMember::Typed(value.into()),
        }
    }
}

/// The entity, period and dimensions that scope a set of facts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XbrlContext {
    /// Context id referenced by `contextRef`.
    pub id: String,
    /// Entity identifier (usually the CIK).
    pub entity_identifier: String,
    /// Identifier scheme (e.g. "http://www.sec.gov/CIK").
    pub entity_scheme: String,
    /// Reporting period.
    pub period: XbrlPeriod,
    /// Segment and scenario dimensions.
    pub dimensions: Vec<XbrlDimension>,
}

impl XbrlContext {
    /// Creates a context without dimensions.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        entity_identifier: impl Into<String>,
        entity_scheme: impl Into<String>,
        period: XbrlPeriod,
    ) -> Self {
        Self {
            id: id.into(),
            entity_identifier: entity_identifier.into(),
            entity_scheme: entity_scheme.into(),
            period,
            dimensions: Vec::new(),
        }
    }

    /// Adds a dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: XbrlDimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Returns true if the context carries any dimension.
    #[must_use]
    pub fn is_dimensional(&self) -> bool {
        !self.dimensions.is_empty()
    }

    /// Period end date (instant or duration end).
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.period.end_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_forms() {
        let instant = XbrlPeriod::Instant(date(2023, 12, 31));
        assert!(instant.is_instant());
        assert_eq!(instant.end_date(), Some(date(2023, 12, 31)));
        assert_eq!(instant.duration_days(), None);

        let duration = XbrlPeriod::Duration {
            start: date(2023, 1, 1),
            end: date(2023, 12, 31),
        };
        assert!(duration.is_duration());
        assert_eq!(duration.start_date(), Some(date(2023, 1, 1)));
        assert_eq!(duration.duration_days(), Some(364));

        assert_eq!(XbrlPeriod::Forever.end_date(), None);
    }

    #[test]
    fn test_dimensional_context() {
        let ctx = XbrlContext::new(
            "c2",
            "0000320193",
            "http://www.sec.gov/CIK",
            XbrlPeriod::Instant(date(2023, 9, 30)),
        );
        assert!(!ctx.is_dimensional());

        let ctx = ctx.with_dimension(XbrlDimension::explicit(
            "us-gaap:StatementBusinessSegmentsAxis",
            "aapl:AmericasSegmentMember",
        ));
        assert!(ctx.is_dimensional());
        assert_eq!(ctx.dimensions[0].member.value(), "aapl:AmericasSegmentMember");
    }
}
