use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::IndicatorSource;
use crate::config::ApiConfig;
use crate::data::model::{Indicator, RawSeries};
use crate::directory::{is_aggregate, CountryInfo};
use crate::error::{SourceError, SourceResult};

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct IdValue {
    pub id: String,
    pub value: String,
}

/// One element of an indicator response's data array.
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub country: IdValue,
    #[serde(default, rename = "countryiso3code")]
    pub iso3: String,
    pub indicator: IdValue,
    pub date: String,
    pub value: Option<f64>,
}

impl Observation {
    /// Country code as used by the country list (ISO3 when present).
    pub fn country_code(&self) -> &str {
        if self.iso3.is_empty() {
            &self.country.id
        } else {
            &self.iso3
        }
    }

    /// `(year, value)` when the observation carries a number for a
    /// parseable year.
    pub fn point(&self) -> Option<(i32, f64)> {
        let value = self.value?;
        match self.date.trim().parse::<i32>() {
            Ok(year) => Some((year, value)),
            Err(_) => {
                log::debug!("skipping observation with date {:?}", self.date);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    id: String,
    name: String,
    region: IdValue,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// One decoded page: total page count plus the raw data records.
#[derive(Debug, Default)]
pub struct Page {
    pub pages: u32,
    pub records: Vec<JsonValue>,
}

/// Split a `[meta, data]` response.
///
/// Anything shorter than two elements is the API's error envelope and counts
/// as "no data"; so does a `null` data element.
pub fn parse_page(url: &str, body: &JsonValue) -> SourceResult<Page> {
    let parts = body.as_array().ok_or_else(|| SourceError::Decode {
        url: url.to_string(),
        reason: "expected a top-level JSON array".into(),
    })?;

    if parts.len() < 2 {
        log::debug!("{url}: no data ({body})");
        return Ok(Page::default());
    }

    let pages = parts[0].get("pages").and_then(as_u32).unwrap_or(1);
    let records = match &parts[1] {
        JsonValue::Array(items) => items.clone(),
        JsonValue::Null => Vec::new(),
        other => {
            return Err(SourceError::Decode {
                url: url.to_string(),
                reason: format!("expected data array, got {other}"),
            })
        }
    };
    Ok(Page { pages, records })
}

// Page counts come back as numbers or numeric strings depending on endpoint.
fn as_u32(v: &JsonValue) -> Option<u32> {
    match v {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Turn indicator records into a series, skipping null values.
pub fn series_from_records(records: &[JsonValue]) -> SourceResult<RawSeries> {
    let observations: Vec<Observation> = records
        .iter()
        .map(|r| Observation::deserialize(r))
        .collect::<Result<_, _>>()?;
    Ok(observations.iter().filter_map(Observation::point).collect())
}

/// Turn country records into directory entries, dropping aggregates.
pub fn countries_from_records(records: &[JsonValue]) -> SourceResult<Vec<CountryInfo>> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let c = CountryRecord::deserialize(record)?;
        let region = c.region.value.trim().to_string();
        if is_aggregate(&region) {
            continue;
        }
        out.push(CountryInfo {
            code: c.id,
            name: c.name.trim().to_string(),
            region,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking client for the World Bank Indicators API v2.
pub struct WorldBankClient {
    client: Client,
    config: ApiConfig,
}

impl WorldBankClient {
    pub fn new(config: ApiConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("guns-butter/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// GET every page of `path` and concatenate the data records.
    fn get_all(&self, path: &str, per_page: u32) -> SourceResult<Vec<JsonValue>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/{path}?format=json&per_page={per_page}&page={page}",
                self.base()
            );
            log::debug!("GET {url}");
            let body: JsonValue = self.client.get(&url).send()?.error_for_status()?.json()?;
            let parsed = parse_page(&url, &body)?;
            records.extend(parsed.records);
            if page >= parsed.pages {
                break;
            }
            page += 1;
        }
        Ok(records)
    }
}

impl IndicatorSource for WorldBankClient {
    fn fetch(&self, country: &str, indicator: Indicator) -> SourceResult<RawSeries> {
        let path = format!("country/{country}/indicator/{}", indicator.code());
        let records = self.get_all(&path, self.config.indicator_page_size)?;
        let series = series_from_records(&records)?;
        log::debug!("{country} {indicator}: {} observations", series.len());
        Ok(series)
    }

    fn list_countries(&self) -> SourceResult<Vec<CountryInfo>> {
        let records = self.get_all("country", self.config.country_page_size)?;
        let countries = countries_from_records(&records)?;
        log::info!("loaded {} countries", countries.len());
        Ok(countries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_indicator_page() {
        let body = json!([
            {"page": 1, "pages": 1, "per_page": 1000, "total": 3},
            [
                {"indicator": {"id": "MS.MIL.XPND.GD.ZS", "value": "Military expenditure (% of GDP)"},
                 "country": {"id": "US", "value": "United States"}, "countryiso3code": "USA",
                 "date": "2022", "value": 3.45, "unit": "", "obs_status": "", "decimal": 1},
                {"indicator": {"id": "MS.MIL.XPND.GD.ZS", "value": "Military expenditure (% of GDP)"},
                 "country": {"id": "US", "value": "United States"}, "countryiso3code": "USA",
                 "date": "2021", "value": null, "unit": "", "obs_status": "", "decimal": 1},
                {"indicator": {"id": "MS.MIL.XPND.GD.ZS", "value": "Military expenditure (% of GDP)"},
                 "country": {"id": "US", "value": "United States"}, "countryiso3code": "USA",
                 "date": "2020", "value": 3.7, "unit": "", "obs_status": "", "decimal": 1}
            ]
        ]);
        let page = parse_page("test", &body).unwrap();
        assert_eq!(page.pages, 1);
        let series = series_from_records(&page.records).unwrap();
        assert_eq!(series.years().collect::<Vec<_>>(), vec![2020, 2022]);
        assert_eq!(series.get(2022).unwrap(), 3.45);
    }

    #[test]
    fn error_envelope_is_empty() {
        let body = json!([{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]);
        let page = parse_page("test", &body).unwrap();
        assert!(page.records.is_empty());
        assert!(series_from_records(&page.records).unwrap().is_empty());

        let null_data = json!([{"page": 1, "pages": 0, "per_page": "50", "total": 0}, null]);
        assert!(parse_page("test", &null_data).unwrap().records.is_empty());
    }

    #[test]
    fn non_array_is_decode_error() {
        assert!(matches!(
            parse_page("test", &json!({"oops": true})),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn countries_skip_aggregates() {
        let records = vec![
            json!({"id": "ABW", "iso2Code": "AW", "name": "Aruba",
                   "region": {"id": "LCN", "iso2code": "ZJ", "value": "Latin America & Caribbean "}}),
            json!({"id": "AFE", "iso2Code": "ZH", "name": "Africa Eastern and Southern",
                   "region": {"id": "NA", "iso2code": "NA", "value": "Aggregates"}}),
        ];
        let countries = countries_from_records(&records).unwrap();
        assert_eq!(
            countries,
            vec![CountryInfo {
                code: "ABW".into(),
                name: "Aruba".into(),
                region: "Latin America & Caribbean".into(),
            }]
        );
    }

    #[test]
    fn page_count_as_string() {
        let body = json!([{"page": "1", "pages": "3"}, []]);
        assert_eq!(parse_page("test", &body).unwrap().pages, 3);
    }
}
