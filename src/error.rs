use thiserror::Error;

use crate::data::model::Indicator;

/// Outcomes of the pipeline that are not successful values.
///
/// None of these abort a multi-country run: `MissingValue` is recovered as an
/// absent cell, `InsufficientCoverage` becomes an entry in the missing-country
/// report and `EmptySelection` is an informational state for the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("no observation for year {year}")]
    MissingValue { year: i32 },

    #[error("{country}: no observations for {}", join(.missing))]
    InsufficientCoverage {
        country: String,
        missing: Vec<Indicator>,
    },

    #[error("select at least one country and one metric")]
    EmptySelection,
}

fn join(indicators: &[Indicator]) -> String {
    indicators
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of an indicator source (HTTP API or local snapshot).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot extension: .{0}")]
    UnsupportedFormat(String),
}

pub type SourceResult<T> = Result<T, SourceError>;
