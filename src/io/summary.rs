use std::io::Write;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::dataset::CountryDay;
use crate::model::metrics::{CountryStatus, Series};

/// Undefined values (NaN rates, days before the first running average) are
/// written as empty cells.
fn cell(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => String::new(),
    }
}

/// Per-day table of every derived metric for one country, preceded by a few
/// `key=value` header lines.
pub fn write_country_summary<W: Write>(out: &mut W, status: &CountryStatus) -> Result<()> {
    writeln!(out, "country={}", status.country)?;
    writeln!(out, "population={:.0}", status.population)?;
    writeln!(out, "days={}", status.dates.len())?;
    writeln!(out, "window={}", status.window)?;
    if let (Some(first), Some(last)) = (status.dates.first(), status.dates.last()) {
        writeln!(out, "range={}..{}", first, last)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "date,cases,deaths,recovered,open,closed,daily_new_cases,running_average,recovery_rate,death_rate"
    )?;

    for (day, date) in status.dates.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            date,
            cell(Some(status.cases[day]), 0),
            cell(Some(status.deaths[day]), 0),
            cell(Some(status.recovered[day]), 0),
            cell(Some(status.open[day]), 0),
            cell(Some(status.closed[day]), 0),
            cell(Some(status.daily_new_cases[day]), 0),
            cell(status.running_average.at(day), 2),
            cell(Some(status.recovery_rate[day]), 2),
            cell(Some(status.death_rate[day]), 2),
        )?;
    }
    Ok(())
}

/// `day,date,<series name>` rows for one derived series.
pub fn write_series<W: Write>(out: &mut W, dates: &[NaiveDate], series: &Series) -> Result<()> {
    writeln!(out, "day,date,{}", series.name)?;
    for (day, v) in series.points() {
        let date = dates.get(day).map(|d| d.to_string()).unwrap_or_default();
        writeln!(out, "{},{},{}", day, date, cell(Some(v), 6))?;
    }
    Ok(())
}

/// Raw joined rows as CSV with a header.
pub fn write_rows_csv<W: Write>(out: W, rows: &[&CountryDay]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_series_marks_undefined_cells() {
        let dates: Vec<NaiveDate> = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2020, 5, d).unwrap())
            .collect();
        let s = Series::new("recovery_rate", 0, vec![f64::NAN, 50.0, 62.5]);
        let mut buf = Vec::new();
        write_series(&mut buf, &dates, &s).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "day,date,recovery_rate\n0,2020-05-01,\n1,2020-05-02,50.000000\n2,2020-05-03,62.500000\n"
        );
    }

    #[test]
    fn test_write_rows_csv_header() {
        let row = CountryDay {
            country: "Malta".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 3, 7).unwrap(),
            cases: 3.0,
            deaths: 0.0,
            recovered: 1.0,
            open: 2.0,
            closed: 1.0,
            population: 483530.0,
        };
        let mut buf = Vec::new();
        write_rows_csv(&mut buf, &[&row]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("country,date,cases,deaths,recovered,open,closed,population")
        );
        assert_eq!(lines.next(), Some("Malta,2020-03-07,3.0,0.0,1.0,2.0,1.0,483530.0"));
    }
}
