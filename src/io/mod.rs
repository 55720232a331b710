pub mod cases;
pub mod owid;
pub mod population;
pub mod summary;

use std::fs::File;
use std::path::Path;

use crate::config::{CaseSource, DataConfig};
use crate::error::{CovidError, Result};
use crate::model::dataset::Dataset;

/// Load the configured case source and population table and join them.
pub fn load_dataset(cfg: &DataConfig) -> Result<Dataset> {
    let cases = match cfg.source {
        CaseSource::Kaggle => cases::load_kaggle_csv(&cfg.cases_path)?,
        CaseSource::Owid => owid::load_owid_csv(&cfg.owid_path)?,
    };
    let population = population::load_population_csv(&cfg.population_path, cfg.reference_year)?;
    let dataset = Dataset::join(cases, &population)?;

    tracing::info!(
        source = ?cfg.source,
        rows = dataset.rows().len(),
        countries = dataset.all_countries().len(),
        dropped = dataset.unmatched_countries().len(),
        year = cfg.reference_year,
        "dataset loaded"
    );
    Ok(dataset)
}

pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    if !path.is_file() {
        return Err(CovidError::DataFileNotFound(path.to_path_buf()));
    }
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?)
}

pub(crate) fn require_columns(path: &Path, headers: &csv::StringRecord, columns: &[&str]) -> Result<()> {
    for column in columns {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(CovidError::MissingColumn {
                file: file_label(path),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

pub(crate) fn file_label(path: &Path) -> String {
    path.display().to_string()
}
