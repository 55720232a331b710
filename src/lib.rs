pub mod chart;
pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod model;

pub use error::{CovidError, Result};
pub use model::dataset::{CaseRecord, Column, CountryDay, Dataset, PopulationRecord};
pub use model::metrics::{CountryStatus, Metric, MetricsConfig, MetricsEngine, ScaleOptions, Series};
