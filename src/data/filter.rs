use serde::{Deserialize, Serialize};

use super::model::{CountryFrame, LongRecord};

// ---------------------------------------------------------------------------
// Year window
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` year range.
///
/// `min <= max` is the caller's responsibility; an inverted window simply
/// matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub min: i32,
    pub max: i32,
}

impl YearWindow {
    pub fn new(min: i32, max: i32) -> Self {
        debug_assert!(min <= max, "inverted year window {min}..={max}");
        YearWindow { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// Keep only the rows of `frame` whose year lies in `window`.
pub fn filter_frame(frame: &CountryFrame, window: YearWindow) -> CountryFrame {
    let rows = frame
        .rows()
        .iter()
        .filter(|r| window.contains(r.year))
        .copied()
        .collect();
    CountryFrame::new(frame.country.clone(), rows)
}

/// Keep only the records whose year lies in `window`.
pub fn filter_records(records: &[LongRecord], window: YearWindow) -> Vec<LongRecord> {
    records
        .iter()
        .filter(|r| window.contains(r.year))
        .cloned()
        .collect()
}
