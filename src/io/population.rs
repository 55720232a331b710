use std::path::Path;

use serde::Deserialize;

use crate::error::{CovidError, Result};
use crate::io::{file_label, open_csv, require_columns};
use crate::model::dataset::PopulationRecord;

#[derive(Debug, Deserialize)]
struct PopRow {
    #[serde(rename = "Country Name")]
    country: String,
    #[serde(rename = "Year")]
    year: i32,
    // parsed only for rows of the requested year
    #[serde(rename = "Value")]
    value: String,
}

/// Load population by country from a CSV with columns
/// `Country Name,Country Code,Year,Value`, keeping only rows for `year`.
/// Rows are returned in file order; duplicates are left for the join to resolve.
pub fn load_population_csv(path: &Path, year: i32) -> Result<Vec<PopulationRecord>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(path, &headers, &["Country Name", "Year", "Value"])?;

    let mut out = Vec::new();
    let mut total = 0usize;
    for result in rdr.records() {
        let record = result?;
        total += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |message: String| CovidError::InvalidRecord {
            file: file_label(path),
            line,
            message,
        };

        let row: PopRow = record.deserialize(Some(&headers)).map_err(|e| invalid(e.to_string()))?;
        if row.year != year {
            continue;
        }
        let value = row.value.trim();
        if value.is_empty() {
            return Err(invalid(format!("missing Value for {} in {}", row.country, year)));
        }
        let population: f64 = value
            .parse()
            .map_err(|e| invalid(format!("bad Value '{}': {}", value, e)))?;
        out.push(PopulationRecord {
            country: row.country,
            population: population.max(0.0),
        });
    }

    if out.is_empty() {
        return Err(CovidError::NoPopulationForYear(year));
    }
    tracing::debug!(path = %path.display(), total, kept = out.len(), year, "population loaded");
    Ok(out)
}
