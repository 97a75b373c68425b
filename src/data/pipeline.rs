use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::align::align;
use super::filter::{filter_frame, YearWindow};
use super::interpolate::interpolate;
use super::model::{CountryFrame, CountryInputs, Indicator, LongRecord, Metric, Provenance};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Request / output
// ---------------------------------------------------------------------------

/// Everything the merger needs besides the fetched series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub countries: Vec<String>,
    pub metrics: Vec<Metric>,
    pub window: YearWindow,
    pub interpolate: bool,
    /// Drop rows with any synthesized source value before reshaping.
    pub exclude_synthesized: bool,
}

/// Why a selected country contributed no records.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingReason {
    InsufficientCoverage(Vec<Indicator>),
    NoDataInWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingCountry {
    pub code: String,
    pub reason: MissingReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<LongRecord>,
    pub missing: Vec<MissingCountry>,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Per-country stages
// ---------------------------------------------------------------------------

/// align → interpolate → window → (optionally) drop synthesized rows.
pub fn build_country_frame(
    code: &str,
    inputs: &CountryInputs,
    request: &PipelineRequest,
) -> Result<CountryFrame, PipelineError> {
    let frame = align(code, inputs)?;
    let frame = interpolate(&frame, request.interpolate);
    let frame = filter_frame(&frame, request.window);
    Ok(if request.exclude_synthesized {
        drop_synthesized(&frame)
    } else {
        frame
    })
}

/// Remove every row that carries a synthesized source value.
pub fn drop_synthesized(frame: &CountryFrame) -> CountryFrame {
    let rows = frame
        .rows()
        .iter()
        .filter(|r| r.provenance() != Some(Provenance::Synthesized))
        .copied()
        .collect();
    CountryFrame::new(frame.country.clone(), rows)
}

/// Fan a wide frame out into one record per (metric, year) with a defined value.
///
/// Every record of a row carries the row's tag, the same one
/// [`drop_synthesized`] filters on. Partial rows with nothing filled count as
/// observed.
pub fn reshape(frame: &CountryFrame, metrics: &[Metric], display_name: &str) -> Vec<LongRecord> {
    metrics
        .iter()
        .flat_map(|&metric| {
            frame.rows().iter().filter_map(move |row| {
                let source = row.provenance().unwrap_or(Provenance::Observed);
                row.metric(metric).map(|sample| LongRecord {
                    year: row.year,
                    country: display_name.to_string(),
                    metric,
                    value: sample.value,
                    source,
                })
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Multi-country merge
// ---------------------------------------------------------------------------

/// Run the whole pipeline over every selected country.
///
/// Countries are processed independently; a country with no entry in `inputs`
/// is treated like one whose fetch returned nothing. Failures never abort the
/// batch, they end up in [`PipelineOutput::missing`].
pub fn run<F>(
    request: &PipelineRequest,
    inputs: &HashMap<String, CountryInputs>,
    resolve_name: F,
) -> Result<PipelineOutput, PipelineError>
where
    F: Fn(&str) -> String,
{
    let metrics = dedup(&request.metrics);
    let countries = dedup(&request.countries);
    if countries.is_empty() || metrics.is_empty() {
        return Err(PipelineError::EmptySelection);
    }

    let empty = CountryInputs::default();
    let mut output = PipelineOutput::default();

    for code in countries {
        let country_inputs = inputs.get(&code).unwrap_or(&empty);
        match build_country_frame(&code, country_inputs, request) {
            Ok(frame) => {
                let records = reshape(&frame, &metrics, &resolve_name(&code));
                if records.is_empty() {
                    log::debug!("{code}: no data in {:?}", request.window);
                    output.missing.push(MissingCountry {
                        code,
                        reason: MissingReason::NoDataInWindow,
                    });
                } else {
                    output.records.extend(records);
                }
            }
            Err(PipelineError::InsufficientCoverage { missing, .. }) => {
                log::info!("{code}: insufficient coverage ({missing:?})");
                output.missing.push(MissingCountry {
                    code,
                    reason: MissingReason::InsufficientCoverage(missing),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(output)
}

/// First occurrence wins, order preserved.
fn dedup<T: Clone + Ord>(items: &[T]) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|i| seen.insert((*i).clone()))
        .cloned()
        .collect()
}
