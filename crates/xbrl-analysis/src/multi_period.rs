//! Time series across several filings of one company.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use xbrl_core::XbrlInstance;

use crate::standardizer::ConceptStandardizer;

/// Points at least this many standard deviations from the mean are anomalies.
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;

/// Minimum points before z-scores are computed.
pub const MIN_ANOMALY_POINTS: usize = 3;

/// Values of one canonical concept by period end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConceptTimeSeries {
    /// Canonical concept name.
    pub concept: String,
    /// Value per period end; `None` when the filing did not report it.
    pub values: BTreeMap<NaiveDate, Option<f64>>,
    /// Smallest reported value.
    pub min: Option<f64>,
    /// Largest reported value.
    pub max: Option<f64>,
    /// Mean of the reported values.
    pub average: Option<f64>,
    /// Value at the latest period with a report.
    pub latest: Option<f64>,
}

impl ConceptTimeSeries {
    /// Builds a series and its summary statistics.
    pub fn from_points(
        concept: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
    ) -> Self {
        let mut series = Self {
            concept: concept.into(),
            values: points.into_iter().collect(),
            min: None,
            max: None,
            average: None,
            latest: None,
        };
        series.refresh();
        series
    }

    fn refresh(&mut self) {
        let reported: Vec<f64> = self.values.values().flatten().copied().collect();
        self.min = reported.iter().copied().reduce(f64::min);
        self.max = reported.iter().copied().reduce(f64::max);
        self.average = mean(&reported);
        self.latest = reported.last().copied();
    }

    /// Reported values in period order.
    #[must_use]
    pub fn points(&self) -> Vec<(NaiveDate, f64)> {
        self.values
            .iter()
            .filter_map(|(date, value)| value.map(|v| (*date, v)))
            .collect()
    }

    /// Value at a period end.
    #[must_use]
    pub fn value_at(&self, period: NaiveDate) -> Option<f64> {
        self.values.get(&period).copied().flatten()
    }
}

/// Standardized values of several filings, aligned by period end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StitchedTimeSeries {
    /// Entity identifier of the filings.
    pub entity_identifier: Option<String>,
    /// Period ends in ascending order.
    pub periods: Vec<NaiveDate>,
    /// Series by canonical concept.
    pub series: BTreeMap<String, ConceptTimeSeries>,
}

impl StitchedTimeSeries {
    /// Assembles stitched series; periods are the union of the series' dates.
    pub fn new(
        entity_identifier: Option<String>,
        series: impl IntoIterator<Item = ConceptTimeSeries>,
    ) -> Self {
        let series: BTreeMap<String, ConceptTimeSeries> =
            series.into_iter().map(|s| (s.concept.clone(), s)).collect();
        let periods = series
            .values()
            .flat_map(|s| s.values.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            entity_identifier,
            periods,
            series,
        }
    }

    /// Series of a canonical concept.
    #[must_use]
    pub fn concept(&self, name: &str) -> Option<&ConceptTimeSeries> {
        self.series.get(name)
    }

    /// Value of a canonical concept at a period end.
    #[must_use]
    pub fn value(&self, name: &str, period: NaiveDate) -> Option<f64> {
        self.concept(name)?.value_at(period)
    }

    /// One row per period: a `period_end` date column and one `f64` column per concept.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.series.len() + 1);
        let dates: Vec<String> = self
            .periods
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        columns.push(Column::new("period_end".into(), dates));
        for (name, series) in &self.series {
            let values: Vec<Option<f64>> =
                self.periods.iter().map(|p| series.value_at(*p)).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        DataFrame::new(columns)?
            .lazy()
            .with_column(col("period_end").cast(DataType::Date))
            .collect()
    }
}

/// Direction of a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Increases outnumber decreases more than two to one.
    StrongUp,
    /// More increases than decreases.
    Up,
    /// Balanced or unchanged.
    Flat,
    /// More decreases than increases.
    Down,
    /// Decreases outnumber increases more than two to one.
    StrongDown,
    /// Fewer than two data points.
    InsufficientData,
}

impl Trend {
    fn classify(increases: usize, decreases: usize) -> Self {
        if increases > 2 * decreases {
            Self::StrongUp
        } else if decreases > 2 * increases {
            Self::StrongDown
        } else if increases > decreases {
            Self::Up
        } else if decreases > increases {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

/// Growth between two adjacent periods.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearOverYear {
    /// Earlier period end.
    pub from: NaiveDate,
    /// Later period end.
    pub to: NaiveDate,
    /// Earlier value.
    pub previous: f64,
    /// Later value.
    pub current: f64,
    /// `(current - previous) / |previous| × 100`.
    pub growth_pct: f64,
}

/// Growth statistics of one concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthAnalysis {
    /// Canonical concept name.
    pub concept: String,
    /// Number of reported values.
    pub data_points: usize,
    /// Growth per adjacent pair of reported values.
    pub yoy: Vec<YearOverYear>,
    /// Mean of the year-over-year growth rates, in percent.
    pub average_growth: Option<f64>,
    /// Compound annual growth rate in percent; only when both ends are positive.
    pub cagr: Option<f64>,
    /// Overall direction.
    pub trend: Trend,
    /// Population standard deviation of the growth rates.
    pub volatility: Option<f64>,
}

/// Kind of anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Far above the series mean.
    UnusuallyHigh,
    /// Far below the series mean.
    UnusuallyLow,
    /// Opposite sign to the previous reported value.
    SignChange,
}

/// An unusual value in a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Canonical concept name.
    pub concept: String,
    /// Period end of the flagged value.
    pub period: NaiveDate,
    /// Flagged value.
    pub value: f64,
    /// Anomaly kind.
    pub kind: AnomalyKind,
    /// Z-score for high/low anomalies.
    pub z_score: Option<f64>,
}

/// Ratios for one period, as fractions. A ratio whose denominator is zero
/// or missing is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodRatios {
    /// Period end.
    pub period: NaiveDate,
    /// Gross profit over revenue.
    pub gross_margin: Option<f64>,
    /// Operating income over revenue.
    pub operating_margin: Option<f64>,
    /// Net income over revenue.
    pub net_margin: Option<f64>,
    /// Net income over total assets.
    pub roa: Option<f64>,
    /// Net income over equity.
    pub roe: Option<f64>,
    /// Short and long term debt over equity.
    pub debt_to_equity: Option<f64>,
    /// Current assets over current liabilities.
    pub current_ratio: Option<f64>,
}

/// Stitches filings and analyses the resulting series.
#[derive(Clone, Debug, Default)]
pub struct MultiPeriodAnalyzer {
    standardizer: ConceptStandardizer,
}

impl MultiPeriodAnalyzer {
    /// Creates an analyzer with the default standardizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer using `standardizer`.
    #[must_use]
    pub const fn with_standardizer(standardizer: ConceptStandardizer) -> Self {
        Self { standardizer }
    }

    /// Standardizes each instance and aligns the values by period end.
    ///
    /// Instances without a reporting period are skipped. Only values reported
    /// for an instance's own reporting period end are taken from it. When two
    /// instances end on the same date the later one in `instances` wins for
    /// the concepts it reports.
    pub fn stitch<'a>(
        &self,
        instances: impl IntoIterator<Item = &'a XbrlInstance>,
    ) -> StitchedTimeSeries {
        let mut dated: Vec<(NaiveDate, &XbrlInstance)> = Vec::new();
        for instance in instances {
            match instance.reporting_period_end() {
                Some(end) => dated.push((end, instance)),
                None => warn!(uri = %instance.document_uri, "Skipping instance without a reporting period"),
            }
        }
        dated.sort_by_key(|(end, _)| *end);

        let mut entity_identifier = None;
        let mut values: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
        let periods: BTreeSet<NaiveDate> = dated.iter().map(|(end, _)| *end).collect();
        for (end, instance) in &dated {
            let data = self.standardizer.standardize(instance);
            if entity_identifier.is_none() {
                entity_identifier = data.entity_identifier.clone();
            }
            for (name, fact) in data.facts {
                // Comparative-period values belong to the filing for that period.
                if fact.period_end != Some(*end) {
                    continue;
                }
                values.entry(name).or_default().insert(*end, Some(fact.value));
            }
        }

        let series: BTreeMap<String, ConceptTimeSeries> = values
            .into_iter()
            .map(|(name, mut by_period)| {
                for period in &periods {
                    by_period.entry(*period).or_insert(None);
                }
                (name.clone(), ConceptTimeSeries::from_points(name, by_period))
            })
            .collect();
        let stitched = StitchedTimeSeries {
            entity_identifier,
            periods: periods.into_iter().collect(),
            series,
        };
        debug!(
            periods = stitched.periods.len(),
            concepts = stitched.series.len(),
            "Stitched filings"
        );
        stitched
    }

    /// Growth statistics of `concept`; `None` when the concept never appears.
    #[must_use]
    pub fn analyze_growth(&self, series: &StitchedTimeSeries, concept: &str) -> Option<GrowthAnalysis> {
        let series = series.concept(concept)?;
        let points = series.points();

        if points.len() < 2 {
            return Some(GrowthAnalysis {
                concept: concept.to_string(),
                data_points: points.len(),
                yoy: Vec::new(),
                average_growth: None,
                cagr: None,
                trend: Trend::InsufficientData,
                volatility: None,
            });
        }

        let mut yoy = Vec::new();
        let (mut increases, mut decreases) = (0, 0);
        let ordered: Vec<(&NaiveDate, &Option<f64>)> = series.values.iter().collect();
        for pair in ordered.windows(2) {
            let ((from, previous), (to, current)) = (pair[0], pair[1]);
            let (Some(previous), Some(current)) = (*previous, *current) else {
                continue;
            };
            if current > previous {
                increases += 1;
            } else if current < previous {
                decreases += 1;
            }
            if previous != 0.0 {
                yoy.push(YearOverYear {
                    from: *from,
                    to: *to,
                    previous,
                    current,
                    growth_pct: (current - previous) / previous.abs() * 100.0,
                });
            }
        }

        let rates: Vec<f64> = yoy.iter().map(|y| y.growth_pct).collect();
        let (first, last) = (points[0].1, points[points.len() - 1].1);
        let years = (points.len() - 1) as f64;
        let cagr = (first > 0.0 && last > 0.0)
            .then(|| ((last / first).powf(1.0 / years) - 1.0) * 100.0);

        Some(GrowthAnalysis {
            concept: concept.to_string(),
            data_points: points.len(),
            average_growth: mean(&rates),
            volatility: if rates.len() >= 2 { std_dev(&rates) } else { None },
            yoy,
            cagr,
            trend: Trend::classify(increases, decreases),
        })
    }

    /// Z-score outliers and sign changes in every series.
    #[must_use]
    pub fn detect_anomalies(&self, series: &StitchedTimeSeries) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        for (name, concept) in &series.series {
            let points = concept.points();

            if points.len() >= MIN_ANOMALY_POINTS {
                let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
                let mean = mean(&values).unwrap_or_default();
                let sd = std_dev(&values).unwrap_or_default();
                if sd > 0.0 {
                    for (period, value) in &points {
                        let z = (value - mean) / sd;
                        if z.abs() >= ANOMALY_Z_THRESHOLD {
                            anomalies.push(Anomaly {
                                concept: name.clone(),
                                period: *period,
                                value: *value,
                                kind: if z > 0.0 {
                                    AnomalyKind::UnusuallyHigh
                                } else {
                                    AnomalyKind::UnusuallyLow
                                },
                                z_score: Some(z),
                            });
                        }
                    }
                }
            }

            for pair in points.windows(2) {
                let (previous, (period, value)) = (pair[0].1, pair[1]);
                if previous * value < 0.0 {
                    anomalies.push(Anomaly {
                        concept: name.clone(),
                        period,
                        value,
                        kind: AnomalyKind::SignChange,
                        z_score: None,
                    });
                }
            }
        }
        anomalies
    }

    /// Profitability, return and leverage ratios per period.
    #[must_use]
    pub fn calculate_ratios(&self, series: &StitchedTimeSeries) -> Vec<PeriodRatios> {
        series
            .periods
            .iter()
            .map(|period| {
                let v = |name: &str| series.value(name, *period);
                let revenue = v("Revenue");
                let gross_profit = v("GrossProfit").or_else(|| Some(revenue? - v("CostOfRevenue")?));
                let net_income = v("NetIncome");
                let equity = v("StockholdersEquity");
                let debt = match (v("ShortTermDebt"), v("LongTermDebt")) {
                    (None, None) => None,
                    (short, long) => Some(short.unwrap_or(0.0) + long.unwrap_or(0.0)),
                };
                PeriodRatios {
                    period: *period,
                    gross_margin: ratio(gross_profit, revenue),
                    operating_margin: ratio(v("OperatingIncome"), revenue),
                    net_margin: ratio(net_income, revenue),
                    roa: ratio(net_income, v("TotalAssets")),
                    roe: ratio(net_income, equity),
                    debt_to_equity: ratio(debt, equity),
                    current_ratio: ratio(v("CurrentAssets"), v("CurrentLiabilities")),
                }
            })
            .collect()
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let denominator = denominator?;
    (denominator != 0.0).then_some(numerator? / denominator)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
