use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{CovidError, Result};
use crate::io::{file_label, open_csv, require_columns};
use crate::model::dataset::CaseRecord;

const DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Deserialize)]
struct KaggleRow {
    #[serde(rename = "ObservationDate")]
    date: String,
    #[serde(rename = "Country/Region")]
    country: String,
    #[serde(rename = "Confirmed")]
    confirmed: Option<f64>,
    #[serde(rename = "Deaths")]
    deaths: Option<f64>,
    #[serde(rename = "Recovered")]
    recovered: Option<f64>,
}

/// Load the Kaggle daily time series (`covid_19_data.csv`).
///
/// `Province/State` is discarded: rows sharing (country, date) are summed into
/// one country-level row. Output order is the order in which each
/// (country, date) first appears in the file. Empty counts read as 0; any other
/// non-numeric count is an [`CovidError::InvalidRecord`].
pub fn load_kaggle_csv(path: &Path) -> Result<Vec<CaseRecord>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    require_columns(
        path,
        &headers,
        &["ObservationDate", "Country/Region", "Confirmed", "Deaths", "Recovered"],
    )?;

    // (country, date, cases, deaths, recovered)
    let mut sums: Vec<(String, NaiveDate, f64, f64, f64)> = Vec::new();
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::new();
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

        let row: KaggleRow = record.deserialize(Some(&headers)).map_err(|e| invalid(e.to_string()))?;
        let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT)
            .map_err(|e| invalid(format!("bad ObservationDate '{}': {}", row.date, e)))?;
        let country = row.country.trim().to_string();
        let cases = row.confirmed.unwrap_or(0.0);
        let deaths = row.deaths.unwrap_or(0.0);
        let recovered = row.recovered.unwrap_or(0.0);

        match index.get(&(country.clone(), date)) {
            Some(&i) => {
                let s = &mut sums[i];
                s.2 += cases;
                s.3 += deaths;
                s.4 += recovered;
            }
            None => {
                index.insert((country.clone(), date), sums.len());
                sums.push((country, date, cases, deaths, recovered));
            }
        }
    }

    tracing::debug!(path = %path.display(), total, country_days = sums.len(), "kaggle cases loaded");
    Ok(sums
        .into_iter()
        .map(|(country, date, c, d, r)| CaseRecord::new(country, date, c, d, r))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "SNo,ObservationDate,Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered\n";

    fn write_tmp(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(HEADER.as_bytes()).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_renames_and_derives_open_closed() {
        let f = write_tmp(
            "1,03/01/2020,,Italy,2020-03-01T23:23:02,1694.0,34.0,83.0\n\
             2,03/02/2020,,Italy,2020-03-02T20:23:16,2036.0,52.0,149.0\n",
        );
        let rows = load_kaggle_csv(f.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "Italy");
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(rows[1].cases, 2036.0);
        assert_eq!(rows[1].closed, 201.0);
        assert_eq!(rows[1].open, 1835.0);
    }

    #[test]
    fn test_provinces_summed_per_country_day() {
        let f = write_tmp(
            "1,01/22/2020,Anhui,Mainland China,1/22/2020 17:00,1.0,0.0,0.0\n\
             2,01/22/2020,Beijing,Mainland China,1/22/2020 17:00,14.0,0.0,0.0\n\
             3,01/22/2020,,Japan,1/22/2020 17:00,2.0,0.0,0.0\n\
             4,01/23/2020,Anhui,Mainland China,1/23/20 17:00,9.0,0.0,0.0\n\
             5,01/23/2020,Beijing,Mainland China,1/23/20 17:00,22.0,,0.0\n",
        );
        let rows = load_kaggle_csv(f.path()).unwrap();
        let summary: Vec<(&str, f64)> = rows.iter().map(|r| (r.country.as_str(), r.cases)).collect();
        assert_eq!(
            summary,
            vec![("Mainland China", 15.0), ("Japan", 2.0), ("Mainland China", 31.0)]
        );
        assert_eq!(rows[2].deaths, 0.0);
    }

    #[test]
    fn test_bad_date_reports_line() {
        let f = write_tmp("1,2020-01-22,,Japan,x,2.0,0.0,0.0\n");
        let err = load_kaggle_csv(f.path()).unwrap_err();
        assert!(matches!(err, CovidError::InvalidRecord { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_non_numeric_count_is_invalid_record() {
        let f = write_tmp(
            "1,01/22/2020,,Japan,1/22/2020 17:00,2.0,,0.0\n\
             2,01/23/2020,,Japan,1/23/2020 17:00,oops,0.0,0.0\n",
        );
        let err = load_kaggle_csv(f.path()).unwrap_err();
        assert!(matches!(err, CovidError::InvalidRecord { line: 3, .. }), "{err}");
    }
}
