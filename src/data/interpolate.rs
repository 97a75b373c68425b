use std::collections::BTreeMap;

use super::model::{CountryFrame, FrameRow, Indicator, Sample};

// ---------------------------------------------------------------------------
// Gap interpolation + provenance tagging
// ---------------------------------------------------------------------------

/// Return a copy of `frame` with interior gaps of each source column filled.
///
/// Filling is linear in the year value and only happens strictly between two
/// observations of the same column: years before the first or after the last
/// observation stay absent. Filled cells are tagged `Synthesized`; cells that
/// were present keep their `Observed` tag. `Butter` and `Ratio` are recomputed
/// from the filled source columns.
///
/// With `allow == false` the frame is returned unchanged.
pub fn interpolate(frame: &CountryFrame, allow: bool) -> CountryFrame {
    if !allow {
        return frame.clone();
    }

    let filled: BTreeMap<Indicator, BTreeMap<i32, Sample>> = Indicator::ALL
        .into_iter()
        .map(|i| (i, fill_column(&frame.column(i), frame.years())))
        .collect();

    let cell = |i: Indicator, year: i32| filled.get(&i).and_then(|c| c.get(&year)).copied();

    let rows = frame
        .years()
        .map(|year| {
            FrameRow::from_sources(
                year,
                cell(Indicator::Military, year),
                cell(Indicator::Education, year),
                cell(Indicator::Health, year),
            )
        })
        .collect();

    CountryFrame::new(frame.country.clone(), rows)
}

/// Fill one column at every year of `axis` lying between two known points.
fn fill_column(
    known: &[(i32, Sample)],
    axis: impl Iterator<Item = i32>,
) -> BTreeMap<i32, Sample> {
    let mut out: BTreeMap<i32, Sample> = known.iter().copied().collect();

    for year in axis {
        if out.contains_key(&year) {
            continue;
        }
        // First known point after `year`; its predecessor is the one before.
        let idx = known.partition_point(|(y, _)| *y < year);
        if idx == 0 || idx == known.len() {
            continue; // outside the observed range
        }
        let (y0, s0) = known[idx - 1];
        let (y1, s1) = known[idx];
        let frac = f64::from(year - y0) / f64::from(y1 - y0);
        out.insert(year, Sample::synthesized(s0.value + (s1.value - s0.value) * frac));
    }

    out
}
