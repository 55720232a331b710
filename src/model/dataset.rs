use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CovidError, Result};

/// Cumulative counts for one country on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub country: String,
    pub date: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
    pub recovered: f64,
    pub open: f64,
    pub closed: f64,
}

impl CaseRecord {
    pub fn new(country: impl Into<String>, date: NaiveDate, cases: f64, deaths: f64, recovered: f64) -> Self {
        let open = cases - (deaths + recovered);
        Self {
            country: country.into(),
            date,
            cases,
            deaths,
            recovered,
            open,
            closed: cases - open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub country: String,
    pub population: f64,
}

/// One row of the joined table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDay {
    pub country: String,
    pub date: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
    pub recovered: f64,
    pub open: f64,
    pub closed: f64,
    pub population: f64,
}

impl CountryDay {
    pub fn get(&self, column: Column) -> f64 {
        match column {
            Column::Cases => self.cases,
            Column::Deaths => self.deaths,
            Column::Recovered => self.recovered,
            Column::Open => self.open,
            Column::Closed => self.closed,
            Column::Population => self.population,
        }
    }
}

/// Raw numeric columns of the joined table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Cases,
    Deaths,
    Recovered,
    Open,
    Closed,
    Population,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Cases,
        Column::Deaths,
        Column::Recovered,
        Column::Open,
        Column::Closed,
        Column::Population,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Cases => "cases",
            Column::Deaths => "deaths",
            Column::Recovered => "recovered",
            Column::Open => "open",
            Column::Closed => "closed",
            Column::Population => "population",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = CovidError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or(CovidError::UnknownMetric(s))
    }
}

/// Case rows inner-joined with population on exact country name.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<CountryDay>,
    countries: Vec<String>,
    unmatched: Vec<String>,
}

impl Dataset {
    /// Join case rows with population rows. Case rows whose country has no
    /// population entry are dropped; their names are kept in
    /// `unmatched_countries`. For duplicate population rows the first wins.
    pub fn join(cases: Vec<CaseRecord>, population: &[PopulationRecord]) -> Result<Self> {
        let mut pop_by_country: HashMap<&str, f64> = HashMap::with_capacity(population.len());
        for p in population {
            if pop_by_country.contains_key(p.country.as_str()) {
                tracing::warn!(country = %p.country, "duplicate population row ignored");
                continue;
            }
            pop_by_country.insert(p.country.as_str(), p.population);
        }

        let mut rows = Vec::with_capacity(cases.len());
        let mut countries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut unmatched = Vec::new();
        let mut unmatched_seen: HashSet<String> = HashSet::new();

        for c in cases {
            let Some(&population) = pop_by_country.get(c.country.as_str()) else {
                if unmatched_seen.insert(c.country.clone()) {
                    unmatched.push(c.country);
                }
                continue;
            };
            if seen.insert(c.country.clone()) {
                countries.push(c.country.clone());
            }
            rows.push(CountryDay {
                country: c.country,
                date: c.date,
                cases: c.cases,
                deaths: c.deaths,
                recovered: c.recovered,
                open: c.open,
                closed: c.closed,
                population,
            });
        }

        if !unmatched.is_empty() {
            tracing::warn!(
                dropped = unmatched.len(),
                "countries without population data dropped from join: {}",
                unmatched.join(", ")
            );
        }
        if rows.is_empty() {
            return Err(CovidError::EmptyDataset);
        }

        Ok(Self { rows, countries, unmatched })
    }

    pub fn rows(&self) -> &[CountryDay] {
        &self.rows
    }

    /// Unique country names in order of first appearance.
    pub fn all_countries(&self) -> &[String] {
        &self.countries
    }

    /// Case countries dropped by the join.
    pub fn unmatched_countries(&self) -> &[String] {
        &self.unmatched
    }

    /// Case-sensitive substring search over country names, order preserved.
    pub fn find_country(&self, term: &str) -> Vec<&str> {
        self.countries
            .iter()
            .filter(|c| c.contains(term))
            .map(String::as_str)
            .collect()
    }

    /// Rows for one country in load order; index `i` is day `i`.
    pub fn by_country(&self, country: &str) -> Result<Vec<&CountryDay>> {
        let rows: Vec<&CountryDay> = self.rows.iter().filter(|r| r.country == country).collect();
        if rows.is_empty() {
            return Err(CovidError::UnknownCountry(country.to_string()));
        }
        Ok(rows)
    }

    pub fn column(&self, country: &str, column: Column) -> Result<Vec<f64>> {
        Ok(self.by_country(country)?.iter().map(|r| r.get(column)).collect())
    }
}
