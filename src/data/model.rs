use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Indicator – the three provider series every country needs
// ---------------------------------------------------------------------------

/// A source indicator fetched from the statistics provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Indicator {
    Military,
    Education,
    Health,
}

impl Indicator {
    pub const ALL: [Indicator; 3] = [Indicator::Military, Indicator::Education, Indicator::Health];

    /// World Bank indicator code (all expressed as % of GDP).
    pub fn code(self) -> &'static str {
        match self {
            Indicator::Military => "MS.MIL.XPND.GD.ZS",
            Indicator::Education => "SE.XPD.TOTL.GD.ZS",
            Indicator::Health => "SH.XPD.CHEX.GD.ZS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.code() == code)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Military => write!(f, "Military"),
            Indicator::Education => write!(f, "Education"),
            Indicator::Health => write!(f, "Health"),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric – what the long-form dataset can carry
// ---------------------------------------------------------------------------

/// A displayable metric of the terminal dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Military,
    Butter,
    #[serde(rename = "G/B Ratio", alias = "Ratio")]
    Ratio,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Military, Metric::Butter, Metric::Ratio];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Military => "Military",
            Metric::Butter => "Butter",
            Metric::Ratio => "G/B Ratio",
        }
    }

    /// Case-insensitive parse accepting both `ratio` and `G/B Ratio`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "military" | "guns" => Some(Metric::Military),
            "butter" => Some(Metric::Butter),
            "ratio" | "g/b ratio" | "gb" => Some(Metric::Ratio),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Whether a value came from the provider or was filled in by interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provenance {
    Observed,
    Synthesized,
}

impl Provenance {
    /// Provenance of a value computed from several inputs: synthesized as soon
    /// as any input is.
    pub fn combine(self, other: Provenance) -> Provenance {
        if self == Provenance::Synthesized || other == Provenance::Synthesized {
            Provenance::Synthesized
        } else {
            Provenance::Observed
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Observed => write!(f, "Observed"),
            Provenance::Synthesized => write!(f, "Synthesized"),
        }
    }
}

// ---------------------------------------------------------------------------
// RawSeries – one sparse annual series as fetched
// ---------------------------------------------------------------------------

/// Sparse year → value mapping for one (country, indicator).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    points: BTreeMap<i32, f64>,
}

impl RawSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `year`, or [`PipelineError::MissingValue`] when there is no
    /// observation.
    pub fn get(&self, year: i32) -> Result<f64, PipelineError> {
        self.points
            .get(&year)
            .copied()
            .ok_or(PipelineError::MissingValue { year })
    }

    /// Observed years, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Non-finite values are not observations and are dropped on the way in.
impl FromIterator<(i32, f64)> for RawSeries {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        RawSeries {
            points: iter.into_iter().filter(|(_, v)| v.is_finite()).collect(),
        }
    }
}

impl<const N: usize> From<[(i32, f64); N]> for RawSeries {
    fn from(points: [(i32, f64); N]) -> Self {
        points.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// CountryInputs – the three raw series of one country
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryInputs {
    pub military: RawSeries,
    pub education: RawSeries,
    pub health: RawSeries,
}

impl CountryInputs {
    pub fn series(&self, indicator: Indicator) -> &RawSeries {
        match indicator {
            Indicator::Military => &self.military,
            Indicator::Education => &self.education,
            Indicator::Health => &self.health,
        }
    }

    pub fn series_mut(&mut self, indicator: Indicator) -> &mut RawSeries {
        match indicator {
            Indicator::Military => &mut self.military,
            Indicator::Education => &mut self.education,
            Indicator::Health => &mut self.health,
        }
    }

    /// Indicators without a single observation.
    pub fn uncovered(&self) -> Vec<Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(|i| self.series(*i).is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CountryFrame – one wide, year-indexed table per country
// ---------------------------------------------------------------------------

/// A single cell of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub provenance: Provenance,
}

impl Sample {
    pub fn observed(value: f64) -> Self {
        Sample {
            value,
            provenance: Provenance::Observed,
        }
    }

    pub fn synthesized(value: f64) -> Self {
        Sample {
            value,
            provenance: Provenance::Synthesized,
        }
    }
}

/// One year of a [`CountryFrame`]. `None` cells are absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRow {
    pub year: i32,
    pub military: Option<Sample>,
    pub education: Option<Sample>,
    pub health: Option<Sample>,
    pub butter: Option<Sample>,
    pub ratio: Option<Sample>,
}

impl FrameRow {
    /// Build a row from its source cells; `butter` and `ratio` are derived.
    pub fn from_sources(
        year: i32,
        military: Option<Sample>,
        education: Option<Sample>,
        health: Option<Sample>,
    ) -> Self {
        let butter = match (education, health) {
            (Some(e), Some(h)) => Some(Sample {
                value: e.value + h.value,
                provenance: e.provenance.combine(h.provenance),
            }),
            _ => None,
        };
        let ratio = match (military, butter) {
            (Some(m), Some(b)) if b.value != 0.0 => {
                let value = m.value / b.value;
                value.is_finite().then_some(Sample {
                    value,
                    provenance: m.provenance.combine(b.provenance),
                })
            }
            _ => None,
        };
        FrameRow {
            year,
            military,
            education,
            health,
            butter,
            ratio,
        }
    }

    pub fn source(&self, indicator: Indicator) -> Option<Sample> {
        match indicator {
            Indicator::Military => self.military,
            Indicator::Education => self.education,
            Indicator::Health => self.health,
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<Sample> {
        match metric {
            Metric::Military => self.military,
            Metric::Butter => self.butter,
            Metric::Ratio => self.ratio,
        }
    }

    /// Row-level provenance.
    ///
    /// * any synthesized source cell → `Synthesized`
    /// * all three source cells observed → `Observed`
    /// * otherwise (partial row, nothing filled) → `None`
    pub fn provenance(&self) -> Option<Provenance> {
        let cells = [self.military, self.education, self.health];
        if cells
            .iter()
            .flatten()
            .any(|s| s.provenance == Provenance::Synthesized)
        {
            Some(Provenance::Synthesized)
        } else if cells.iter().all(Option::is_some) {
            Some(Provenance::Observed)
        } else {
            None
        }
    }
}

/// Per-country wide table. Rows are sorted by year with no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryFrame {
    pub country: String,
    rows: Vec<FrameRow>,
}

impl CountryFrame {
    /// Build a frame, sorting and deduplicating by year (last row wins).
    pub fn new(country: impl Into<String>, rows: Vec<FrameRow>) -> Self {
        let by_year: BTreeMap<i32, FrameRow> = rows.into_iter().map(|r| (r.year, r)).collect();
        CountryFrame {
            country: country.into(),
            rows: by_year.into_values().collect(),
        }
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.iter().map(|r| r.year)
    }

    /// Present cells of one source column, in year order.
    pub fn column(&self, indicator: Indicator) -> Vec<(i32, Sample)> {
        self.rows
            .iter()
            .filter_map(|r| r.source(indicator).map(|s| (r.year, s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LongRecord – one row of the tidy terminal dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Metric")]
    pub metric: Metric,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Source")]
    pub source: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_series_get_and_years() {
        let s = RawSeries::from([(2002, 3.0), (2000, 2.0)]);
        assert_eq!(s.get(2000).unwrap(), 2.0);
        assert_eq!(s.get(2001), Err(PipelineError::MissingValue { year: 2001 }));
        assert_eq!(s.years().collect::<Vec<_>>(), vec![2000, 2002]);
        assert!(!s.is_empty());
        assert!(RawSeries::new().is_empty());
    }

    #[test]
    fn raw_series_drops_non_finite() {
        let s: RawSeries = vec![(2000, f64::NAN), (2001, 1.0)].into_iter().collect();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn derived_columns() {
        let row = FrameRow::from_sources(
            2000,
            Some(Sample::observed(2.0)),
            Some(Sample::observed(4.0)),
            Some(Sample::synthesized(1.0)),
        );
        assert_eq!(row.butter.unwrap().value, 5.0);
        assert_eq!(row.butter.unwrap().provenance, Provenance::Synthesized);
        assert_eq!(row.ratio.unwrap().value, 0.4);
        assert_eq!(row.ratio.unwrap().provenance, Provenance::Synthesized);
        assert_eq!(row.provenance(), Some(Provenance::Synthesized));
    }

    #[test]
    fn zero_butter_leaves_ratio_absent() {
        let row = FrameRow::from_sources(
            2000,
            Some(Sample::observed(2.0)),
            Some(Sample::observed(0.0)),
            Some(Sample::observed(0.0)),
        );
        assert_eq!(row.butter.unwrap().value, 0.0);
        assert!(row.ratio.is_none());
    }

    #[test]
    fn partial_row_has_no_row_provenance() {
        let row = FrameRow::from_sources(2000, Some(Sample::observed(2.0)), None, None);
        assert_eq!(row.provenance(), None);
        assert!(row.butter.is_none());
    }

    #[test]
    fn frame_sorts_and_dedups() {
        let r = |y| FrameRow::from_sources(y, None, None, None);
        let frame = CountryFrame::new("XX", vec![r(2002), r(2000), r(2002)]);
        assert_eq!(frame.years().collect::<Vec<_>>(), vec![2000, 2002]);
    }

    #[test]
    fn metric_parse() {
        assert_eq!(Metric::parse("G/B Ratio"), Some(Metric::Ratio));
        assert_eq!(Metric::parse(" butter "), Some(Metric::Butter));
        assert_eq!(Metric::parse("nope"), None);
        assert_eq!(Indicator::from_code("SE.XPD.TOTL.GD.ZS"), Some(Indicator::Education));
    }
}
