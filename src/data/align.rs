use std::collections::BTreeSet;

use super::model::{CountryFrame, CountryInputs, FrameRow, Indicator, RawSeries, Sample};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Indicator aligner
// ---------------------------------------------------------------------------

/// Align the three raw series of one country onto a shared year axis.
///
/// The axis is the *union* of the observed years, so a year where only some
/// indicators were reported becomes a partial row instead of being dropped.
/// `Butter` and `Ratio` are derived per row (see [`FrameRow::from_sources`]).
///
/// Coverage is all-or-nothing: if any of the three series has no observation
/// at all the country fails with [`PipelineError::InsufficientCoverage`].
pub fn align(country: &str, inputs: &CountryInputs) -> Result<CountryFrame, PipelineError> {
    let missing = inputs.uncovered();
    if !missing.is_empty() {
        return Err(PipelineError::InsufficientCoverage {
            country: country.to_string(),
            missing,
        });
    }

    let years: BTreeSet<i32> = Indicator::ALL
        .iter()
        .flat_map(|i| inputs.series(*i).years())
        .collect();

    let rows = years
        .into_iter()
        .map(|year| {
            FrameRow::from_sources(
                year,
                observed(&inputs.military, year),
                observed(&inputs.education, year),
                observed(&inputs.health, year),
            )
        })
        .collect();

    Ok(CountryFrame::new(country, rows))
}

fn observed(series: &RawSeries, year: i32) -> Option<Sample> {
    // MissingValue is an absent cell here, not a failure.
    series.get(year).ok().map(Sample::observed)
}
