use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{CovidError, Result};
use crate::io::{file_label, open_csv, require_columns};
use crate::model::dataset::CaseRecord;

#[derive(Debug, Deserialize)]
struct OwidRow {
    #[serde(default)]
    iso_code: String,
    location: String,
    date: NaiveDate,
    total_cases: Option<f64>,
    total_deaths: Option<f64>,
    // OWID stopped publishing recoveries; older exports may still carry them
    #[serde(default)]
    total_recovered: Option<f64>,
}

/// Load an "Our World In Data" export (`owid-covid-data.csv`).
///
/// Already one row per country and day. Aggregate rows (`OWID_WRL`,
/// `OWID_EUR`, ...) are skipped so only countries remain. Empty totals read
/// as 0 while unparsable ones are an error. Without recoveries every
/// non-fatal case stays open.
pub fn load_owid_csv(path: &Path) -> Result<Vec<CaseRecord>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(path, &headers, &["location", "date", "total_cases", "total_deaths"])?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let row: OwidRow = record.deserialize(Some(&headers)).map_err(|e| CovidError::InvalidRecord {
            file: file_label(path),
            line: record.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        if row.iso_code.starts_with("OWID_") {
            skipped += 1;
            continue;
        }
        out.push(CaseRecord::new(
            row.location,
            row.date,
            row.total_cases.unwrap_or(0.0),
            row.total_deaths.unwrap_or(0.0),
            row.total_recovered.unwrap_or(0.0),
        ));
    }

    tracing::debug!(path = %path.display(), rows = out.len(), skipped, "owid cases loaded");
    Ok(out)
}
