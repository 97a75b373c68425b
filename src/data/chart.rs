use std::collections::BTreeMap;

use super::model::{LongRecord, Metric, Provenance};

/// One chart line: a (country, metric) pair across years.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub country: String,
    pub metric: Metric,
    /// `(year, value, provenance)`, ascending by year.
    pub points: Vec<(i32, f64, Provenance)>,
}

impl ChartSeries {
    pub fn label(&self) -> String {
        format!("{} – {}", self.country, self.metric)
    }
}

/// Group the tidy dataset into one series per (country, metric).
///
/// Series come out ordered by country then metric; record order in the input
/// does not matter.
pub fn chart_series(records: &[LongRecord]) -> Vec<ChartSeries> {
    let mut groups: BTreeMap<(&str, Metric), Vec<(i32, f64, Provenance)>> = BTreeMap::new();
    for rec in records {
        groups
            .entry((rec.country.as_str(), rec.metric))
            .or_default()
            .push((rec.year, rec.value, rec.source));
    }

    groups
        .into_iter()
        .map(|((country, metric), mut points)| {
            points.sort_by_key(|(year, _, _)| *year);
            ChartSeries {
                country: country.to_string(),
                metric,
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: i32, country: &str, metric: Metric) -> LongRecord {
        LongRecord {
            year,
            country: country.into(),
            metric,
            value: year as f64,
            source: Provenance::Observed,
        }
    }

    #[test]
    fn groups_and_sorts() {
        let records = vec![
            rec(2002, "B", Metric::Ratio),
            rec(2000, "A", Metric::Ratio),
            rec(2001, "B", Metric::Ratio),
            rec(2000, "B", Metric::Butter),
        ];
        let series = chart_series(&records);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].country, "A");
        assert_eq!((series[1].country.as_str(), series[1].metric), ("B", Metric::Butter));
        let years: Vec<i32> = series[2].points.iter().map(|p| p.0).collect();
        assert_eq!(years, vec![2001, 2002]);
        assert_eq!(series[2].label(), "B – G/B Ratio");
    }
}
