use std::path::PathBuf;

use anyhow::{Context, Result};

use guns_butter::data::loader::SnapshotRow;
use guns_butter::data::model::Indicator;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (code, name, region, [military, education, health] base levels in % of GDP)
const COUNTRIES: &[(&str, &str, &str, [f64; 3])] = &[
    ("ALP", "Alpinia", "Europe & Central Asia", [1.2, 5.4, 10.5]),
    ("BOR", "Borealis", "Europe & Central Asia", [2.1, 4.8, 8.9]),
    ("COR", "Coralia", "East Asia & Pacific", [1.7, 3.9, 5.2]),
    ("DUN", "Dunmere", "Middle East & North Africa", [5.8, 3.1, 4.4]),
    ("EQU", "Equatoria", "Sub-Saharan Africa", [1.4, 4.2, 3.6]),
    // Never reports education: shows up as insufficient coverage.
    ("FJL", "Fjordland", "Europe & Central Asia", [1.0, 0.0, 9.8]),
];

const FIRST_YEAR: i32 = 1990;
const LAST_YEAR: i32 = 2022;

fn main() -> Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_indicators.csv"));

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    let mut rows = 0usize;

    for &(code, name, region, base) in COUNTRIES {
        for (indicator, &level) in Indicator::ALL.iter().zip(base.iter()) {
            if level == 0.0 {
                continue;
            }
            // Each series starts and stops at its own year, with random holes.
            let start = FIRST_YEAR + (rng.next_f64() * 8.0) as i32;
            let end = LAST_YEAR - (rng.next_f64() * 4.0) as i32;
            let trend = rng.gauss(0.0, 0.02);
            let mut value = level;

            for year in start..=end {
                value = (value * (1.0 + trend) + rng.gauss(0.0, level * 0.03)).max(0.05);
                let reported = year == start || year == end || rng.next_f64() > 0.2;
                writer.serialize(SnapshotRow {
                    country: code.to_string(),
                    name: Some(name.to_string()),
                    region: Some(region.to_string()),
                    indicator: indicator.code().to_string(),
                    year,
                    value: reported.then_some((value * 1000.0).round() / 1000.0),
                })?;
                rows += 1;
            }
        }
    }
    writer.flush()?;

    println!(
        "Wrote {rows} rows for {} countries to {}",
        COUNTRIES.len(),
        output_path.display()
    );
    Ok(())
}
