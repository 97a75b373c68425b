/// Data layer: core types and the guns-vs-butter pipeline.
///
/// Architecture:
/// ```text
///  fetched RawSeries ×3 per country
///        │
///        ▼
///   ┌──────────┐
///   │  align    │  union year axis → CountryFrame (+ Butter, Ratio)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ interpolate │  interior gaps only, Observed / Synthesized tags
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  inclusive year window
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  per-country runs, reshape → Vec<LongRecord> + missing report
///   └──────────┘
///        │
///        ├──► chart   (one line per country × metric)
///        └──► export  (CSV)
/// ```

pub mod align;
pub mod chart;
pub mod export;
pub mod filter;
pub mod interpolate;
pub mod loader;
pub mod model;
pub mod pipeline;
