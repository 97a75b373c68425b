//! Guns vs. butter: military spending against health + education spending
//! (all % of GDP) per country over time, from the World Bank Indicators API.
//!
//! The core is [`data::pipeline::run`]: it aligns each country's three raw
//! series, derives Butter and the G/B ratio, optionally interpolates interior
//! gaps, windows by year and folds everything into one tidy record set.

pub mod config;
pub mod data;
pub mod directory;
pub mod error;
pub mod source;

pub use data::filter::YearWindow;
pub use data::model::{CountryInputs, Indicator, LongRecord, Metric, Provenance, RawSeries};
pub use data::pipeline::{run, MissingCountry, MissingReason, PipelineOutput, PipelineRequest};
pub use error::{PipelineError, SourceError};
