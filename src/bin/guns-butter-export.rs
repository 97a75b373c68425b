use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use guns_butter::config::Config;
use guns_butter::data::export::{write_csv, CsvLayout};
use guns_butter::data::loader;
use guns_butter::directory::DirectoryCache;
use guns_butter::source::worldbank::WorldBankClient;
use guns_butter::source::{fetch_countries, IndicatorSource};
use guns_butter::{run, Metric, MissingReason, PipelineError, PipelineRequest, YearWindow};

/// Export the guns vs. butter dataset as CSV without opening the viewer.
#[derive(Parser, Debug)]
#[command(name = "guns-butter-export", version, about)]
struct Cli {
    /// Country codes, comma separated (defaults from config)
    #[arg(short, long, value_delimiter = ',')]
    countries: Vec<String>,

    /// Add every country of this region (repeatable)
    #[arg(long)]
    region: Vec<String>,

    /// Metrics: military, butter, ratio (defaults from config)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_metric)]
    metrics: Vec<Metric>,

    /// First year, inclusive
    #[arg(long)]
    from: Option<i32>,

    /// Last year, inclusive
    #[arg(long)]
    to: Option<i32>,

    /// Fill interior gaps by interpolation (overrides the config)
    #[arg(long, overrides_with = "no_interpolation")]
    interpolate: bool,

    /// Disable interpolation of interior gaps
    #[arg(long, overrides_with = "interpolate")]
    no_interpolation: bool,

    /// Drop rows containing interpolated values
    #[arg(long, overrides_with = "include_synthesized")]
    observed_only: bool,

    /// Keep rows containing interpolated values (overrides the config)
    #[arg(long, overrides_with = "observed_only")]
    include_synthesized: bool,

    /// Omit the Source column
    #[arg(long)]
    no_source: bool,

    /// Read series from a snapshot file (.csv / .json) instead of the API
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Config file (defaults to the per-user config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn interpolate_or(&self, default: bool) -> bool {
        flag_pair(self.interpolate, self.no_interpolation, default)
    }

    fn exclude_synthesized_or(&self, default: bool) -> bool {
        flag_pair(self.observed_only, self.include_synthesized, default)
    }
}

/// `--x` / `--no-x` style pair; the config default applies when neither is given.
fn flag_pair(on: bool, off: bool, default: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => default,
    }
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    Metric::parse(s).ok_or_else(|| format!("unknown metric '{s}' (military, butter, ratio)"))
}

fn main() -> ExitCode {
    env_logger::init();
    match try_main(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let defaults = &config.defaults;

    let source: Box<dyn IndicatorSource> = match &cli.snapshot {
        Some(path) => Box::new(
            loader::load_file(path).with_context(|| format!("loading {}", path.display()))?,
        ),
        None => Box::new(WorldBankClient::new(config.api.clone())?),
    };

    let directory = DirectoryCache::global()
        .get_or_init(|| source.list_countries())
        .context("loading country list")?;

    let mut countries = if cli.countries.is_empty() && cli.region.is_empty() {
        defaults.countries.clone()
    } else {
        cli.countries.clone()
    };
    for region in &cli.region {
        let codes = directory.codes_in_region(region);
        if codes.is_empty() {
            bail!("unknown or empty region '{region}'");
        }
        countries.extend(codes);
    }

    let window = YearWindow {
        min: cli.from.unwrap_or(defaults.window.min),
        max: cli.to.unwrap_or(defaults.window.max),
    };
    if window.min > window.max {
        bail!("--from {} is after --to {}", window.min, window.max);
    }

    let request = PipelineRequest {
        countries,
        metrics: if cli.metrics.is_empty() {
            defaults.metrics.clone()
        } else {
            cli.metrics.clone()
        },
        window,
        interpolate: cli.interpolate_or(defaults.interpolate),
        exclude_synthesized: cli.exclude_synthesized_or(defaults.observed_only),
    };

    let inputs: HashMap<_, _> = fetch_countries(source.as_ref(), &request.countries);
    let output = match run(&request, &inputs, |code| directory.display_name(code)) {
        Ok(output) => output,
        Err(PipelineError::EmptySelection) => {
            eprintln!("Nothing selected: pass --countries/--region and --metrics.");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    for missing in &output.missing {
        match &missing.reason {
            MissingReason::InsufficientCoverage(indicators) => {
                eprintln!("no data for {}: missing {indicators:?}", missing.code)
            }
            MissingReason::NoDataInWindow => {
                eprintln!("no data for {} in {}..={}", missing.code, window.min, window.max)
            }
        }
    }

    let layout = if cli.no_source {
        CsvLayout::WithoutSource
    } else {
        CsvLayout::WithSource
    };
    match &cli.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_csv(&output.records, layout, file)?;
            log::info!("wrote {} records to {}", output.records.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_csv(&output.records, layout, &mut lock)?;
            lock.flush()?;
        }
    }

    Ok(if output.is_empty() {
        ExitCode::from(3)
    } else {
        ExitCode::SUCCESS
    })
}
