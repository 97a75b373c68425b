use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Indicator, RawSeries};
use crate::directory::{is_aggregate, CountryInfo};
use crate::error::{SourceError, SourceResult};
use crate::source::worldbank::{parse_page, Observation};
use crate::source::IndicatorSource;

// ---------------------------------------------------------------------------
// Snapshot – an offline indicator source
// ---------------------------------------------------------------------------

/// Indicator observations loaded from a local file.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    series: HashMap<(String, Indicator), RawSeries>,
    countries: BTreeMap<String, CountryInfo>,
}

/// One line of a snapshot CSV.
///
/// ```text
/// country,name,region,indicator,year,value
/// USA,United States,North America,MS.MIL.XPND.GD.ZS,2020,3.7
/// ```
///
/// `name` and `region` are optional columns. `indicator` is either the
/// provider code or one of `military` / `education` / `health`. An empty
/// `value` is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub country: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub indicator: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Load a snapshot from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – rows as described on [`SnapshotRow`]
/// * `.json` – World Bank observations, either a bare array or a full
///   `[meta, data]` API response
pub fn load_file(path: &Path) -> SourceResult<Snapshot> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let snapshot = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        other => return Err(SourceError::UnsupportedFormat(other.to_string())),
    };
    log::info!(
        "loaded snapshot {} ({} series, {} countries)",
        path.display(),
        snapshot.series.len(),
        snapshot.countries.len()
    );
    Ok(snapshot)
}

fn parse_indicator(s: &str) -> Option<Indicator> {
    Indicator::from_code(s.trim()).or_else(|| match s.trim().to_ascii_lowercase().as_str() {
        "military" => Some(Indicator::Military),
        "education" => Some(Indicator::Education),
        "health" => Some(Indicator::Health),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Builder shared by both formats
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SnapshotBuilder {
    points: HashMap<(String, Indicator), BTreeMap<i32, f64>>,
    countries: BTreeMap<String, CountryInfo>,
}

impl SnapshotBuilder {
    fn country(&mut self, code: &str, name: Option<&str>, region: Option<&str>) {
        let entry = self
            .countries
            .entry(code.to_string())
            .or_insert_with(|| CountryInfo {
                code: code.to_string(),
                name: code.to_string(),
                region: String::new(),
            });
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            entry.name = name.to_string();
        }
        if let Some(region) = region.map(str::trim).filter(|r| !r.is_empty()) {
            entry.region = region.to_string();
        }
    }

    fn point(&mut self, code: &str, indicator: Indicator, year: i32, value: f64) {
        self.points
            .entry((code.to_string(), indicator))
            .or_default()
            .insert(year, value);
    }

    fn build(self) -> Snapshot {
        Snapshot {
            series: self
                .points
                .into_iter()
                .map(|(key, points)| (key, points.into_iter().collect()))
                .collect(),
            countries: self.countries,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> SourceResult<Snapshot> {
    let reader = csv::Reader::from_path(path)?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> SourceResult<Snapshot> {
    let mut builder = SnapshotBuilder::default();

    for (row_no, result) in reader.deserialize::<SnapshotRow>().enumerate() {
        let row = result?;
        builder.country(&row.country, row.name.as_deref(), row.region.as_deref());

        let Some(indicator) = parse_indicator(&row.indicator) else {
            log::debug!("row {row_no}: unknown indicator {:?}", row.indicator);
            continue;
        };
        if let Some(value) = row.value {
            builder.point(&row.country, indicator, row.year, value);
        }
    }

    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> SourceResult<Snapshot> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;
    read_json(&path.display().to_string(), &root)
}

fn read_json(origin: &str, root: &JsonValue) -> SourceResult<Snapshot> {
    // A bare observation array starts with an object carrying an indicator.
    let is_bare = root
        .as_array()
        .and_then(|a| a.first())
        .is_some_and(|first| first.get("indicator").is_some());

    let records = if is_bare {
        root.as_array().cloned().unwrap_or_default()
    } else {
        parse_page(origin, root)?.records
    };

    let mut builder = SnapshotBuilder::default();
    for record in &records {
        let obs = Observation::deserialize(record)?;
        let code = obs.country_code().to_string();
        builder.country(&code, Some(&obs.country.value), None);

        let Some(indicator) = parse_indicator(&obs.indicator.id) else {
            continue;
        };
        if let Some((year, value)) = obs.point() {
            builder.point(&code, indicator, year, value);
        }
    }
    Ok(builder.build())
}

impl IndicatorSource for Snapshot {
    fn fetch(&self, country: &str, indicator: Indicator) -> SourceResult<RawSeries> {
        Ok(self
            .series
            .get(&(country.to_string(), indicator))
            .cloned()
            .unwrap_or_default())
    }

    fn list_countries(&self) -> SourceResult<Vec<CountryInfo>> {
        Ok(self
            .countries
            .values()
            .filter(|c| !is_aggregate(&c.region))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_with_optional_columns() {
        let data = "\
country,name,region,indicator,year,value
USA,United States,North America,MS.MIL.XPND.GD.ZS,2000,2.9
USA,,,military,2001,
USA,,,education,2000,5.1
WLD,World,Aggregates,health,2000,9.0
USA,,,unknown,2000,1.0
";
        let snapshot = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();

        let mil = snapshot.fetch("USA", Indicator::Military).unwrap();
        assert_eq!(mil.years().collect::<Vec<_>>(), vec![2000]);
        assert_eq!(snapshot.fetch("USA", Indicator::Education).unwrap().get(2000).unwrap(), 5.1);
        assert!(snapshot.fetch("USA", Indicator::Health).unwrap().is_empty());

        let countries = snapshot.list_countries().unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].name, "United States");
        assert_eq!(countries[0].region, "North America");
    }

    #[test]
    fn csv_without_name_columns() {
        let data = "country,indicator,year,value\nFRA,health,2010,11.2\n";
        let snapshot = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();
        let countries = snapshot.list_countries().unwrap();
        assert_eq!(countries[0].name, "FRA");
        assert_eq!(snapshot.fetch("FRA", Indicator::Health).unwrap().len(), 1);
    }

    #[test]
    fn json_full_response_and_bare_array() {
        let obs = serde_json::json!({
            "indicator": {"id": "SH.XPD.CHEX.GD.ZS", "value": "Current health expenditure (% of GDP)"},
            "country": {"id": "FR", "value": "France"}, "countryiso3code": "FRA",
            "date": "2019", "value": 11.1
        });
        let full = serde_json::json!([{"page": 1, "pages": 1}, [obs.clone()]]);
        let bare = serde_json::json!([obs]);

        for root in [full, bare] {
            let snapshot = read_json("test", &root).unwrap();
            let health = snapshot.fetch("FRA", Indicator::Health).unwrap();
            assert_eq!(health.get(2019).unwrap(), 11.1);
            assert_eq!(snapshot.list_countries().unwrap()[0].name, "France");
        }
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "country,indicator,year,value\nDEU,military,2020,1.4").unwrap();
        drop(f);
        let snapshot = load_file(&path).unwrap();
        assert_eq!(snapshot.fetch("DEU", Indicator::Military).unwrap().len(), 1);

        let bad = dir.path().join("snap.xlsx");
        std::fs::write(&bad, b"").unwrap();
        assert!(matches!(load_file(&bad), Err(SourceError::UnsupportedFormat(_))));
    }
}
