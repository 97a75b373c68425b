use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use eframe::egui;

use guns_butter::config::Config;
use guns_butter::data::chart::{chart_series, ChartSeries};
use guns_butter::data::export::{write_csv, CsvLayout};
use guns_butter::data::filter::YearWindow;
use guns_butter::data::loader;
use guns_butter::data::model::{CountryInputs, Metric};
use guns_butter::data::pipeline::{run, MissingReason, PipelineOutput, PipelineRequest};
use guns_butter::directory::{CountryDirectory, DirectoryCache};
use guns_butter::error::PipelineError;
use guns_butter::source::{fetch_countries, IndicatorSource};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Warning(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,

    /// Where series come from, and a label for the top bar.
    source: Arc<dyn IndicatorSource>,
    pub source_label: String,

    /// Snapshot of the shared country directory.
    pub directory: Arc<CountryDirectory>,

    /// Selected country codes, in selection order.
    pub selected: Vec<String>,
    pub search: String,
    pub region: Option<String>,

    pub window: YearWindow,
    /// Slider bounds.
    pub year_bounds: (i32, i32),
    pub metrics: BTreeSet<Metric>,
    pub interpolate: bool,
    pub observed_only: bool,
    pub export_source_column: bool,
    pub show_table: bool,

    /// Raw series fetched so far this session, by country code.
    inputs: HashMap<String, CountryInputs>,
    pending: Option<Receiver<HashMap<String, CountryInputs>>>,

    /// Latest pipeline result and its chart projection.
    pub output: PipelineOutput,
    pub chart: Vec<ChartSeries>,
    pub color_map: ColorMap,

    pub status: Option<Status>,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn IndicatorSource>, source_label: String) -> Self {
        let defaults = config.defaults.clone();
        let mut state = Self {
            source,
            source_label,
            directory: Arc::new(CountryDirectory::default()),
            selected: Vec::new(),
            search: String::new(),
            region: None,
            window: defaults.window,
            year_bounds: (defaults.earliest_year, last_full_year().max(defaults.window.max)),
            metrics: defaults.metrics.iter().copied().collect(),
            interpolate: defaults.interpolate,
            observed_only: defaults.observed_only,
            export_source_column: true,
            show_table: false,
            inputs: HashMap::new(),
            pending: None,
            output: PipelineOutput::default(),
            chart: Vec::new(),
            color_map: ColorMap::default(),
            status: None,
            config,
        };

        let source = Arc::clone(&state.source);
        match DirectoryCache::global().get_or_init(|| source.list_countries()) {
            Ok(dir) => state.directory = dir,
            Err(e) => {
                log::error!("Failed to load country list: {e}");
                state.status = Some(Status::Error(format!("Country list unavailable: {e}")));
            }
        }

        // Keep only default countries the directory knows, unless it is empty.
        state.selected = defaults
            .countries
            .into_iter()
            .filter(|c| state.directory.is_empty() || state.directory.contains(c))
            .collect();
        state
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    // -- source / directory --

    /// Reload the country list from the current source and forget the
    /// series fetched so far, so failed fetches get another try.
    pub fn reload_directory(&mut self) {
        self.inputs.clear();
        self.pending = None;
        let source = Arc::clone(&self.source);
        match DirectoryCache::global().refresh(|| source.list_countries()) {
            Ok(dir) => {
                self.directory = dir;
                self.status = None;
            }
            Err(e) => {
                log::error!("Failed to reload country list: {e}");
                self.status = Some(Status::Error(format!("Reload failed: {e}")));
            }
        }
    }

    /// Switch to an offline snapshot file.
    pub fn open_snapshot(&mut self, ctx: &egui::Context, path: &Path) {
        match loader::load_file(path) {
            Ok(snapshot) => {
                self.source = Arc::new(snapshot);
                self.source_label = path.display().to_string();
                self.reload_directory();
                self.selected.retain(|c| self.directory.contains(c));
                self.selection_changed(ctx);
            }
            Err(e) => {
                log::error!("Failed to load snapshot: {e}");
                self.status = Some(Status::Error(format!("Error: {e}")));
            }
        }
    }

    // -- selection --

    pub fn toggle_country(&mut self, code: &str) {
        if let Some(pos) = self.selected.iter().position(|c| c == code) {
            self.selected.remove(pos);
        } else {
            self.selected.push(code.to_string());
        }
    }

    /// Add every country of the chosen region to the selection.
    pub fn add_region(&mut self) {
        let Some(region) = &self.region else {
            return;
        };
        for code in self.directory.codes_in_region(region) {
            if !self.selected.contains(&code) {
                self.selected.push(code);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn toggle_metric(&mut self, metric: Metric) {
        if !self.metrics.remove(&metric) {
            self.metrics.insert(metric);
        }
    }

    /// Fetch whatever the selection still lacks, otherwise recompute.
    pub fn selection_changed(&mut self, ctx: &egui::Context) {
        if self.window.min > self.window.max {
            std::mem::swap(&mut self.window.min, &mut self.window.max);
        }

        let missing: Vec<String> = self
            .selected
            .iter()
            .filter(|c| !self.inputs.contains_key(*c))
            .cloned()
            .collect();

        if !missing.is_empty() && self.pending.is_none() {
            log::info!("Fetching {} countries: {missing:?}", missing.len());
            let (tx, rx) = mpsc::channel();
            let source = Arc::clone(&self.source);
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                let fetched = fetch_countries(source.as_ref(), &missing);
                let _ = tx.send(fetched);
                ctx.request_repaint();
            });
            self.pending = Some(rx);
        }
        self.recompute();
    }

    /// Merge a finished background fetch, if any.
    pub fn poll(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.pending else {
            return;
        };
        match rx.try_recv() {
            Ok(fetched) => {
                self.pending = None;
                self.inputs.extend(fetched);
                // The selection may have grown while we were fetching.
                self.selection_changed(ctx);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::error!("fetch worker exited without a result");
                self.pending = None;
                self.status = Some(Status::Error("Fetch failed".into()));
            }
        }
    }

    // -- pipeline --

    pub fn request(&self) -> PipelineRequest {
        PipelineRequest {
            countries: self.selected.clone(),
            metrics: self.metrics.iter().copied().collect(),
            window: self.window,
            interpolate: self.interpolate,
            exclude_synthesized: self.observed_only,
        }
    }

    /// Re-run the pipeline over the series fetched so far.
    pub fn recompute(&mut self) {
        let request = self.request();
        let ready: Vec<String> = request
            .countries
            .iter()
            .filter(|c| self.inputs.contains_key(*c))
            .cloned()
            .collect();
        let request = PipelineRequest {
            countries: ready,
            ..request
        };

        let directory = Arc::clone(&self.directory);
        match run(&request, &self.inputs, |code| directory.display_name(code)) {
            Ok(output) => {
                self.status = missing_status(&output, &directory);
                self.output = output;
            }
            Err(PipelineError::EmptySelection) => {
                self.output = PipelineOutput::default();
                self.status = Some(Status::Info(if self.selected.is_empty() {
                    "Please select one or more countries to display data.".into()
                } else if self.metrics.is_empty() {
                    "Please select at least one metric.".into()
                } else {
                    "Loading…".into()
                }));
            }
            Err(e) => {
                self.output = PipelineOutput::default();
                self.status = Some(Status::Error(e.to_string()));
            }
        }

        self.chart = chart_series(&self.output.records);
        self.color_map = ColorMap::new(self.chart.iter().map(|s| s.country.as_str()));
    }

    // -- export --

    pub fn export_csv(&mut self) {
        if self.output.is_empty() {
            self.status = Some(Status::Info("No data available for export with current selection.".into()));
            return;
        }
        let file = rfd::FileDialog::new()
            .set_title("Export data")
            .set_file_name("guns_butter_data.csv")
            .add_filter("CSV", &["csv"])
            .save_file();

        if let Some(path) = file {
            match self.write_export(&path) {
                Ok(()) => {
                    log::info!("Exported {} records to {}", self.output.records.len(), path.display());
                    self.status = Some(Status::Info(format!("Saved {}", path.display())));
                }
                Err(e) => {
                    log::error!("Export failed: {e:#}");
                    self.status = Some(Status::Error(format!("Error: {e:#}")));
                }
            }
        }
    }

    fn write_export(&self, path: &Path) -> Result<()> {
        let layout = if self.export_source_column {
            CsvLayout::WithSource
        } else {
            CsvLayout::WithoutSource
        };
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_csv(&self.output.records, layout, file)
    }
}

/// Warning listing the countries that produced nothing.
fn missing_status(output: &PipelineOutput, directory: &CountryDirectory) -> Option<Status> {
    if output.missing.is_empty() {
        return None;
    }
    let names: Vec<String> = output
        .missing
        .iter()
        .map(|m| match &m.reason {
            MissingReason::InsufficientCoverage(indicators) => format!(
                "{} (no {})",
                directory.display_name(&m.code),
                indicators
                    .iter()
                    .map(|i| i.to_string().to_lowercase())
                    .collect::<Vec<_>>()
                    .join("/")
            ),
            MissingReason::NoDataInWindow => {
                format!("{} (nothing in range)", directory.display_name(&m.code))
            }
        })
        .collect();

    Some(if output.is_empty() {
        Status::Warning(format!("No data available for the selected options: {}", names.join(", ")))
    } else {
        Status::Warning(format!("No data for {}", names.join(", ")))
    })
}

/// Latest year the provider plausibly has complete data for.
fn last_full_year() -> i32 {
    year_before(&Local::now())
}

fn year_before(today: &impl Datelike) -> i32 {
    today.year() - 1
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use guns_butter::data::model::{Indicator, RawSeries};
    use guns_butter::directory::CountryInfo;
    use guns_butter::error::SourceResult;

    use super::*;

    struct OneCountry;

    impl IndicatorSource for OneCountry {
        fn fetch(&self, _country: &str, _indicator: Indicator) -> SourceResult<RawSeries> {
            Ok(RawSeries::from([(2000, 1.0)]))
        }

        fn list_countries(&self) -> SourceResult<Vec<CountryInfo>> {
            Ok(vec![CountryInfo {
                code: "AAA".into(),
                name: "Aland".into(),
                region: "North".into(),
            }])
        }
    }

    #[test]
    fn slider_ends_the_year_before_today() {
        let new_years_eve = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(year_before(&new_years_eve), 2024);
        let new_year = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(year_before(&new_year), 2025);
    }

    #[test]
    fn reloading_forgets_fetched_series() {
        let mut state = AppState::new(Config::default(), Arc::new(OneCountry), "test".into());
        // A failed fetch is cached as an empty series.
        state.inputs.insert("AAA".into(), CountryInputs::default());

        state.reload_directory();
        assert!(state.inputs.is_empty());
        assert!(!state.is_loading());
    }
}
