use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::YearWindow;
use crate::data::model::Metric;
use crate::source::worldbank::DEFAULT_BASE_URL;

// ---------------------------------------------------------------------------
// Config file: <config_dir>/guns-butter/config.toml
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub defaults: SelectionDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub indicator_page_size: u32,
    pub country_page_size: u32,
    pub timeout_secs: u64,
}

/// Initial state of the viewer's controls and of the export CLI's flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionDefaults {
    pub countries: Vec<String>,
    /// Lower bound of the year sliders.
    pub earliest_year: i32,
    pub metrics: Vec<Metric>,
    pub interpolate: bool,
    pub observed_only: bool,
    pub window: YearWindow,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            defaults: SelectionDefaults::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            indicator_page_size: 1000,
            country_page_size: 500,
            timeout_secs: 30,
        }
    }
}

impl Default for SelectionDefaults {
    fn default() -> Self {
        Self {
            countries: vec!["USA".into(), "CHN".into(), "RUS".into()],
            earliest_year: 1990,
            metrics: vec![Metric::Ratio],
            interpolate: true,
            observed_only: false,
            window: YearWindow::new(2000, 2022),
        }
    }
}

impl Config {
    /// Load from the default location; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url cannot be empty");
        }
        if self.api.indicator_page_size == 0 || self.api.country_page_size == 0 {
            bail!("page sizes must be positive");
        }
        let w = self.defaults.window;
        if w.min > w.max {
            bail!("defaults.window is inverted: {} > {}", w.min, w.max);
        }
        if self.defaults.earliest_year > w.min {
            bail!(
                "defaults.window starts at {} before earliest_year {}",
                w.min,
                self.defaults.earliest_year
            );
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("guns-butter")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.defaults.metrics = vec![Metric::Military, Metric::Ratio];
        config.api.timeout_secs = 5;
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[defaults]\ncountries = [\"FRA\"]\nmetrics = [\"Butter\", \"Ratio\"]\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.defaults.countries, vec!["FRA"]);
        assert_eq!(config.defaults.metrics, vec![Metric::Butter, Metric::Ratio]);
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn inverted_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults.window]\nmin = 2020\nmax = 2000\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
