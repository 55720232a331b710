use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CovidError, Result};
use crate::math::series::{daily_deltas, ratio, running_average, scale};
use crate::model::dataset::{Column, CountryDay, Dataset};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Running average window, in days
    #[serde(default = "default_window")]
    pub window: usize,
    /// Multiplier applied to outcome rates (100 = percent)
    #[serde(default = "default_rate_factor")]
    pub rate_factor: f64,
}

fn default_window() -> usize {
    7
}

fn default_rate_factor() -> f64 {
    100.0
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            rate_factor: default_rate_factor(),
        }
    }
}

impl MetricsConfig {
    pub fn check(&self) -> Result<()> {
        if self.window == 0 {
            return Err(CovidError::InvalidWindowSize {
                window: self.window,
                len: 0,
            });
        }
        Ok(())
    }
}

/// Everything that can be asked for per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cases,
    Deaths,
    Recovered,
    Open,
    Closed,
    Population,
    DailyNewCases,
    RunningAverage,
    RecoveryRate,
    DeathRate,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Cases,
        Metric::Deaths,
        Metric::Recovered,
        Metric::Open,
        Metric::Closed,
        Metric::Population,
        Metric::DailyNewCases,
        Metric::RunningAverage,
        Metric::RecoveryRate,
        Metric::DeathRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::DailyNewCases => "daily_new_cases",
            Metric::RunningAverage => "running_average",
            Metric::RecoveryRate => "recovery_rate",
            Metric::DeathRate => "death_rate",
            other => other.as_column().map(Column::name).unwrap_or_default(),
        }
    }

    /// Human readable label for chart titles and legends.
    pub fn title(self) -> &'static str {
        match self {
            Metric::Cases => "Total Cases",
            Metric::Deaths => "Deaths",
            Metric::Recovered => "Recoveries",
            Metric::Open => "Open Cases",
            Metric::Closed => "Closed Cases",
            Metric::Population => "Population",
            Metric::DailyNewCases => "Daily New Cases",
            Metric::RunningAverage => "Avg Daily New Cases",
            Metric::RecoveryRate => "Recovery Rate",
            Metric::DeathRate => "Death Rate",
        }
    }

    pub fn as_column(self) -> Option<Column> {
        match self {
            Metric::Cases => Some(Column::Cases),
            Metric::Deaths => Some(Column::Deaths),
            Metric::Recovered => Some(Column::Recovered),
            Metric::Open => Some(Column::Open),
            Metric::Closed => Some(Column::Closed),
            Metric::Population => Some(Column::Population),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = CovidError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase().replace('-', "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or(CovidError::UnknownMetric(s))
    }
}

/// Optional per-column normalization, e.g. cases per million:
/// `ScaleOptions { scale_by: Some(Column::Population), factor: 1e6 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOptions {
    #[serde(default)]
    pub scale_by: Option<Column>,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            scale_by: None,
            factor: default_factor(),
        }
    }
}

/// A derived series placed on a country's day axis: `values[k]` belongs to
/// day `offset + k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub offset: usize,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, offset: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            offset,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for `day`, if the series covers it.
    pub fn at(&self, day: usize) -> Option<f64> {
        day.checked_sub(self.offset).and_then(|k| self.values.get(k).copied())
    }

    /// (day, value) pairs.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().enumerate().map(move |(k, v)| (self.offset + k, *v))
    }
}

/// All series needed for the per-country figure and summary.
#[derive(Debug, Clone, Serialize)]
pub struct CountryStatus {
    pub country: String,
    pub population: f64,
    pub window: usize,
    pub dates: Vec<NaiveDate>,
    pub cases: Vec<f64>,
    pub deaths: Vec<f64>,
    pub recovered: Vec<f64>,
    pub open: Vec<f64>,
    pub closed: Vec<f64>,
    pub daily_new_cases: Vec<f64>,
    pub running_average: Series,
    /// (total cases, average daily new cases)
    pub growth: Vec<(f64, f64)>,
    pub recovery_rate: Vec<f64>,
    pub death_rate: Vec<f64>,
}

/// Per-country derived metrics over a loaded dataset. Nothing is cached;
/// every query recomputes from the country's rows.
pub struct MetricsEngine {
    pub cfg: MetricsConfig,
    dataset: Dataset,
}

impl MetricsEngine {
    pub fn new(dataset: Dataset, cfg: MetricsConfig) -> Result<Self> {
        cfg.check()?;
        Ok(Self { cfg, dataset })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn all_countries(&self) -> &[String] {
        self.dataset.all_countries()
    }

    pub fn find_country(&self, term: &str) -> Vec<&str> {
        self.dataset.find_country(term)
    }

    pub fn by_country(&self, country: &str) -> Result<Vec<&CountryDay>> {
        self.dataset.by_country(country)
    }

    pub fn daily_new_cases(&self, country: &str) -> Result<Vec<f64>> {
        Ok(daily_deltas(&self.dataset.column(country, Column::Cases)?))
    }

    /// Trailing average of daily new cases over `cfg.window` days.
    pub fn running_average(&self, country: &str) -> Result<Series> {
        let daily = self.daily_new_cases(country)?;
        let avg = running_average(&daily, self.cfg.window)?;
        Ok(Series::new(Metric::RunningAverage.name(), self.cfg.window - 1, avg))
    }

    /// `numerator / denominator * factor` per day, NaN where the denominator is 0.
    pub fn rate(&self, country: &str, numerator: Column, denominator: Column, factor: f64) -> Result<Vec<f64>> {
        let rows = self.dataset.by_country(country)?;
        let num: Vec<f64> = rows.iter().map(|r| r.get(numerator)).collect();
        let den: Vec<f64> = rows.iter().map(|r| r.get(denominator)).collect();
        Ok(ratio(&num, &den, factor))
    }

    pub fn recovery_rate(&self, country: &str) -> Result<Vec<f64>> {
        self.rate(country, Column::Recovered, Column::Closed, self.cfg.rate_factor)
    }

    pub fn death_rate(&self, country: &str) -> Result<Vec<f64>> {
        self.rate(country, Column::Deaths, Column::Closed, self.cfg.rate_factor)
    }

    /// Average daily new cases against total cases on the same day.
    pub fn growth_curve(&self, country: &str) -> Result<Vec<(f64, f64)>> {
        let cases = self.dataset.column(country, Column::Cases)?;
        let avg = self.running_average(country)?;
        Ok(cases[avg.offset..].iter().copied().zip(avg.values).collect())
    }

    /// Any column or derived metric for `country`, optionally scaled.
    pub fn series(&self, country: &str, metric: Metric, opts: &ScaleOptions) -> Result<Series> {
        let raw = match metric {
            Metric::DailyNewCases => Series::new(metric.name(), 0, self.daily_new_cases(country)?),
            Metric::RunningAverage => self.running_average(country)?,
            Metric::RecoveryRate => Series::new(metric.name(), 0, self.recovery_rate(country)?),
            Metric::DeathRate => Series::new(metric.name(), 0, self.death_rate(country)?),
            column => {
                let col = column.as_column().ok_or(CovidError::UnknownMetric(column.name().to_string()))?;
                Series::new(metric.name(), 0, self.dataset.column(country, col)?)
            }
        };

        if opts.scale_by.is_none() && opts.factor == 1.0 {
            return Ok(raw);
        }

        let by = match opts.scale_by {
            Some(col) => {
                let full = self.dataset.column(country, col)?;
                Some(full[raw.offset..raw.offset + raw.len()].to_vec())
            }
            None => None,
        };
        let values = scale(&raw.values, by.as_deref(), opts.factor);
        Ok(Series::new(raw.name, raw.offset, values))
    }

    /// Every series of the per-country figure. A country with fewer days than
    /// the window gets an empty running average and growth curve.
    pub fn country_status(&self, country: &str) -> Result<CountryStatus> {
        let rows = self.dataset.by_country(country)?;
        let col = |c: Column| -> Vec<f64> { rows.iter().map(|r| r.get(c)).collect() };

        let cases = col(Column::Cases);
        let daily_new_cases = daily_deltas(&cases);
        let (running_avg, growth) = match running_average(&daily_new_cases, self.cfg.window) {
            Ok(avg) => {
                let offset = self.cfg.window - 1;
                let growth = cases[offset..].iter().copied().zip(avg.iter().copied()).collect();
                (Series::new(Metric::RunningAverage.name(), offset, avg), growth)
            }
            Err(CovidError::InvalidWindowSize { window, len }) => {
                tracing::debug!(country, window, len, "too few days for running average");
                (Series::new(Metric::RunningAverage.name(), 0, Vec::new()), Vec::new())
            }
            Err(e) => return Err(e),
        };

        let deaths = col(Column::Deaths);
        let recovered = col(Column::Recovered);
        let closed = col(Column::Closed);
        let factor = self.cfg.rate_factor;

        Ok(CountryStatus {
            country: country.to_string(),
            population: rows[0].population,
            window: self.cfg.window,
            dates: rows.iter().map(|r| r.date).collect(),
            recovery_rate: ratio(&recovered, &closed, factor),
            death_rate: ratio(&deaths, &closed, factor),
            open: col(Column::Open),
            cases,
            deaths,
            recovered,
            closed,
            daily_new_cases,
            running_average: running_avg,
            growth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dataset::{CaseRecord, PopulationRecord};

    fn engine(window: usize) -> MetricsEngine {
        let mut cases = Vec::new();
        // (cases, deaths, recovered)
        let rows = [
            (10.0, 0.0, 0.0),
            (15.0, 1.0, 0.0),
            (15.0, 1.0, 3.0),
            (20.0, 2.0, 6.0),
            (30.0, 2.0, 8.0),
        ];
        for (i, (c, d, r)) in rows.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2020, 4, 1 + i as u32).unwrap();
            cases.push(CaseRecord::new("Testland", date, *c, *d, *r));
        }
        let population = vec![PopulationRecord {
            country: "Testland".to_string(),
            population: 1_000_000.0,
        }];
        let ds = Dataset::join(cases, &population).unwrap();
        MetricsEngine::new(ds, MetricsConfig { window, rate_factor: 100.0 }).unwrap()
    }

    #[test]
    fn test_config_rejects_zero_window() {
        let cfg = MetricsConfig { window: 0, rate_factor: 100.0 };
        assert!(matches!(
            MetricsEngine::new(Dataset::default(), cfg),
            Err(CovidError::InvalidWindowSize { window: 0, .. })
        ));
    }

    #[test]
    fn test_daily_new_cases() {
        let e = engine(3);
        assert_eq!(e.daily_new_cases("Testland").unwrap(), vec![10.0, 5.0, 0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_running_average_aligned_to_day_axis() {
        let e = engine(3);
        let avg = e.running_average("Testland").unwrap();
        assert_eq!(avg.offset, 2);
        assert_eq!(avg.values, vec![5.0, 10.0 / 3.0, 5.0]);
        assert_eq!(avg.at(2), Some(5.0));
        assert_eq!(avg.at(1), None);
        assert_eq!(avg.points().last(), Some((4, 5.0)));
    }

    #[test]
    fn test_running_average_window_longer_than_series() {
        let e = engine(6);
        assert!(matches!(
            e.running_average("Testland"),
            Err(CovidError::InvalidWindowSize { window: 6, len: 5 })
        ));
        let status = e.country_status("Testland").unwrap();
        assert!(status.running_average.is_empty());
        assert!(status.growth.is_empty());
    }

    #[test]
    fn test_rates_undefined_before_first_outcome() {
        let e = engine(3);
        let rec = e.recovery_rate("Testland").unwrap();
        let dead = e.death_rate("Testland").unwrap();
        assert!(rec[0].is_nan() && dead[0].is_nan());
        assert_eq!(rec[1], 0.0);
        assert_eq!(dead[1], 100.0);
        assert_eq!(rec[2], 75.0);
        assert_eq!(dead[3], 25.0);
    }

    #[test]
    fn test_growth_curve_pairs_totals_with_average() {
        let e = engine(3);
        let g = e.growth_curve("Testland").unwrap();
        assert_eq!(g, vec![(15.0, 5.0), (20.0, 10.0 / 3.0), (30.0, 5.0)]);
    }

    #[test]
    fn test_series_scaled_per_million() {
        let e = engine(3);
        let opts = ScaleOptions {
            scale_by: Some(Column::Population),
            factor: 1e6,
        };
        let s = e.series("Testland", Metric::Cases, &opts).unwrap();
        let expected = [10.0, 15.0, 15.0, 20.0, 30.0];
        assert_eq!(s.len(), expected.len());
        for (got, want) in s.values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }

        let s = e.series("Testland", Metric::RunningAverage, &opts).unwrap();
        assert_eq!(s.offset, 2);
        assert_eq!(s.len(), 3);

        let s = e
            .series("Testland", Metric::DailyNewCases, &ScaleOptions { scale_by: None, factor: 2.0 })
            .unwrap();
        assert_eq!(s.values, vec![20.0, 10.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_series_unknown_country() {
        let e = engine(3);
        assert!(matches!(
            e.series("Atlantis", Metric::Cases, &ScaleOptions::default()),
            Err(CovidError::UnknownCountry(_))
        ));
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("daily-new-cases".parse::<Metric>().unwrap(), Metric::DailyNewCases);
        assert_eq!("Death_Rate".parse::<Metric>().unwrap(), Metric::DeathRate);
        assert!(matches!("r0".parse::<Metric>(), Err(CovidError::UnknownMetric(_))));
        for m in Metric::ALL {
            assert_eq!(m.name().parse::<Metric>().unwrap(), m);
        }
    }

    #[test]
    fn test_country_status_open_closed_invariant() {
        let e = engine(3);
        let s = e.country_status("Testland").unwrap();
        for i in 0..s.cases.len() {
            assert_eq!(s.open[i] + s.closed[i], s.cases[i]);
        }
        assert_eq!(s.dates.len(), 5);
        assert_eq!(s.population, 1_000_000.0);
    }
}
