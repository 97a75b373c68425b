/// Indicator sources: where raw series and the country list come from.
///
/// * [`worldbank::WorldBankClient`] – World Bank Indicators API v2 over HTTP
/// * [`crate::data::loader::Snapshot`] – an offline CSV / JSON file
pub mod worldbank;

use std::collections::HashMap;
use std::thread;

use crate::data::model::{CountryInputs, Indicator, RawSeries};
use crate::directory::CountryInfo;
use crate::error::SourceResult;

/// Anything that can answer `fetch(country, indicator)` and `list_countries()`.
pub trait IndicatorSource: Send + Sync {
    /// Sparse annual series for one (country, indicator). An empty series is a
    /// valid answer meaning "no observations".
    fn fetch(&self, country: &str, indicator: Indicator) -> SourceResult<RawSeries>;

    /// Every real country known to the source (aggregates excluded).
    fn list_countries(&self) -> SourceResult<Vec<CountryInfo>>;
}

/// Countries fetched at the same time, three requests each.
pub const FETCH_BATCH: usize = 8;

/// Fetch all three indicators of every country in parallel.
///
/// Countries go in batches of [`FETCH_BATCH`], one scoped thread per
/// (country, indicator) within a batch. A failed fetch is logged and stored
/// as an empty series, which the pipeline then reports as insufficient
/// coverage for that country.
pub fn fetch_countries<S>(source: &S, codes: &[String]) -> HashMap<String, CountryInputs>
where
    S: IndicatorSource + ?Sized,
{
    let mut out: HashMap<String, CountryInputs> = HashMap::new();
    for batch in codes.chunks(FETCH_BATCH) {
        for (code, indicator, series) in fetch_batch(source, batch) {
            *out.entry(code).or_default().series_mut(indicator) = series;
        }
    }
    out
}

fn fetch_batch<S>(source: &S, codes: &[String]) -> Vec<(String, Indicator, RawSeries)>
where
    S: IndicatorSource + ?Sized,
{
    thread::scope(|scope| {
        let handles: Vec<_> = codes
            .iter()
            .flat_map(|code| Indicator::ALL.into_iter().map(move |ind| (code, ind)))
            .map(|(code, indicator)| {
                let handle = scope.spawn(move || source.fetch(code, indicator));
                (code, indicator, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(code, indicator, handle)| {
                let series = match handle.join() {
                    Ok(Ok(series)) => series,
                    Ok(Err(e)) => {
                        log::warn!("fetching {indicator} for {code} failed: {e}");
                        RawSeries::new()
                    }
                    Err(_) => {
                        log::error!("fetch thread for {code}/{indicator} panicked");
                        RawSeries::new()
                    }
                };
                (code.clone(), indicator, series)
            })
            .collect()
    })
}
