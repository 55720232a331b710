//! Configuration for the covid tools.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::metrics::MetricsConfig;

/// Which case-count table feeds the join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSource {
    Kaggle,
    Owid,
}

/// Input files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_cases_path")]
    pub cases_path: PathBuf,
    #[serde(default = "default_population_path")]
    pub population_path: PathBuf,
    #[serde(default = "default_owid_path")]
    pub owid_path: PathBuf,
    #[serde(default = "default_source")]
    pub source: CaseSource,
    /// Population rows are filtered to this year
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

fn default_cases_path() -> PathBuf {
    PathBuf::from("data/covid_19_data.csv")
}

fn default_population_path() -> PathBuf {
    PathBuf::from("data/population.csv")
}

fn default_owid_path() -> PathBuf {
    PathBuf::from("data/owid-covid-data.csv")
}

fn default_source() -> CaseSource {
    CaseSource::Kaggle
}

fn default_reference_year() -> i32 {
    2018
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cases_path: default_cases_path(),
            population_path: default_population_path(),
            owid_path: default_owid_path(),
            source: default_source(),
            reference_year: default_reference_year(),
        }
    }
}

/// Chart output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    900
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl ChartConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// HTTP query server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub analysis: MetricsConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Defaults, then `covid.toml` (or `file` when given), then `COVID_*`
    /// environment variables, e.g. `COVID_ANALYSIS__WINDOW=5`.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("covid").required(false),
        };

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix("COVID")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.data.reference_year, 2018);
        assert_eq!(cfg.data.source, CaseSource::Kaggle);
        assert_eq!(cfg.analysis.window, 7);
        assert_eq!(cfg.analysis.rate_factor, 100.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            f,
            "[data]\nsource = \"owid\"\nreference_year = 2019\n\n[analysis]\nwindow = 5\n"
        )
        .unwrap();
        let cfg = AppConfig::load(Some(f.path())).unwrap();
        assert_eq!(cfg.data.source, CaseSource::Owid);
        assert_eq!(cfg.data.reference_year, 2019);
        assert_eq!(cfg.analysis.window, 5);
        assert_eq!(cfg.analysis.rate_factor, 100.0);
        assert_eq!(cfg.data.population_path, PathBuf::from("data/population.csv"));
    }

    #[test]
    fn test_env_overrides_use_double_underscore_between_section_and_key() {
        // only chart keys, so tests loading other sections are unaffected
        std::env::set_var("COVID_CHART__WIDTH", "640");
        std::env::set_var("COVID_CHART__OUTPUT_DIR", "env-charts");
        let cfg = AppConfig::load(None);
        std::env::remove_var("COVID_CHART__WIDTH");
        std::env::remove_var("COVID_CHART__OUTPUT_DIR");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.chart.width, 640);
        assert_eq!(cfg.chart.output_dir, PathBuf::from("env-charts"));
        assert_eq!(cfg.chart.height, 900);
    }
}
