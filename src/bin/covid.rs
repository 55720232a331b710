//! covid: query and chart per-country case statistics from the command line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use covid_trends::chart::{file_stem, render_countries_status, render_overlay};
use covid_trends::config::{AppConfig, CaseSource};
use covid_trends::io::load_dataset;
use covid_trends::io::summary::{write_country_summary, write_rows_csv, write_series};
use covid_trends::{Column, Metric, MetricsEngine, ScaleOptions};

#[derive(Parser)]
#[command(name = "covid")]
#[command(version, about = "Per-country COVID-19 case statistics and charts", long_about = None)]
struct Cli {
    /// Config file (defaults to ./covid.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Case source override
    #[arg(long, global = true, value_enum)]
    source: Option<SourceArg>,

    /// Population reference year override
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Running average window override, in days
    #[arg(short, long, global = true)]
    window: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Kaggle,
    Owid,
}

impl From<SourceArg> for CaseSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Kaggle => CaseSource::Kaggle,
            SourceArg::Owid => CaseSource::Owid,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List every country in the joined dataset
    Countries {
        /// Also list case countries dropped for lack of population data
        #[arg(long)]
        dropped: bool,
    },

    /// Substring search over country names
    Find {
        term: String,
    },

    /// Print the joined rows of a country
    Rows {
        country: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },

    /// Print one metric for a country
    Series {
        country: String,

        /// cases, deaths, recovered, open, closed, population,
        /// daily_new_cases, running_average, recovery_rate, death_rate
        metric: String,

        /// Divide by this column first (e.g. population)
        #[arg(long)]
        scale_by: Option<String>,

        /// Multiply by this factor (e.g. 1000000 for per million)
        #[arg(long, default_value_t = 1.0)]
        factor: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },

    /// Per-day table of every derived metric for a country
    Summary {
        country: String,
    },

    /// Render the four-panel status figure, one per country
    Plot {
        #[arg(required = true)]
        countries: Vec<String>,

        /// Output directory override
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render one metric for several countries in a single figure
    Compare {
        metric: String,

        #[arg(required = true)]
        countries: Vec<String>,

        #[arg(long)]
        scale_by: Option<String>,

        #[arg(long, default_value_t = 1.0)]
        factor: f64,

        /// Output directory override
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries command output, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "covid_trends=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.data.source = source.into();
    }
    if let Some(year) = cli.year {
        config.data.reference_year = year;
    }
    if let Some(window) = cli.window {
        config.analysis.window = window;
    }

    let dataset = load_dataset(&config.data).context("failed to load dataset")?;
    let engine = MetricsEngine::new(dataset, config.analysis.clone())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Countries { dropped } => {
            for country in engine.all_countries() {
                writeln!(out, "{}", country)?;
            }
            if dropped {
                for country in engine.dataset().unmatched_countries() {
                    writeln!(out, "{} (dropped)", country)?;
                }
            }
        }
        Commands::Find { term } => {
            for country in engine.find_country(&term) {
                writeln!(out, "{}", country)?;
            }
        }
        Commands::Rows { country, format } => {
            let rows = engine.by_country(&country)?;
            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?,
                OutputFormat::Csv => write_rows_csv(&mut out, &rows)?,
            }
        }
        Commands::Series {
            country,
            metric,
            scale_by,
            factor,
            format,
        } => {
            let metric: Metric = metric.parse()?;
            let opts = scale_options(scale_by.as_deref(), factor)?;
            let series = engine.series(&country, metric, &opts)?;
            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&series)?)?,
                OutputFormat::Csv => {
                    let dates: Vec<_> = engine.by_country(&country)?.iter().map(|r| r.date).collect();
                    write_series(&mut out, &dates, &series)?;
                }
            }
        }
        Commands::Summary { country } => {
            let status = engine.country_status(&country)?;
            write_country_summary(&mut out, &status)?;
        }
        Commands::Plot { countries, out: dir } => {
            let dir = dir.unwrap_or_else(|| config.chart.output_dir.clone());
            let statuses = countries
                .iter()
                .map(|c| engine.country_status(c))
                .collect::<Result<Vec<_>, _>>()?;
            for path in render_countries_status(&dir, &statuses, config.chart.size())? {
                writeln!(out, "{}", path.display())?;
            }
        }
        Commands::Compare {
            metric,
            countries,
            scale_by,
            factor,
            out: dir,
        } => {
            let metric: Metric = metric.parse()?;
            let opts = scale_options(scale_by.as_deref(), factor)?;
            let series = countries
                .iter()
                .map(|c| engine.series(c, metric, &opts).map(|s| (c.clone(), s)))
                .collect::<Result<Vec<_>, _>>()?;

            let dir = dir.unwrap_or_else(|| config.chart.output_dir.clone());
            std::fs::create_dir_all(&dir).with_context(|| format!("create chart dir failed (path={:?})", dir))?;
            let path = dir.join(format!("compare_{}_{}", metric, file_stem(&countries.join("_"))));
            let y_desc = match opts.scale_by {
                Some(col) => format!("{} per {} x {}", metric.title(), col, opts.factor),
                None => metric.title().to_string(),
            };
            let path = render_overlay(&path, metric.title(), &y_desc, &series, config.chart.size())?;
            writeln!(out, "{}", path.display())?;
        }
    }

    Ok(())
}

fn scale_options(scale_by: Option<&str>, factor: f64) -> anyhow::Result<ScaleOptions> {
    let scale_by = scale_by.map(str::parse::<Column>).transpose()?;
    Ok(ScaleOptions { scale_by, factor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_source_parse() {
        let cli = Cli::try_parse_from(["covid", "--source", "owid", "rows", "France", "--format", "json"]).unwrap();
        assert_eq!(cli.source, Some(SourceArg::Owid));
        match cli.command {
            Commands::Rows { format, .. } => assert_eq!(format, OutputFormat::Json),
            _ => panic!("expected rows"),
        }

        let cli = Cli::try_parse_from(["covid", "series", "France", "death_rate"]).unwrap();
        match cli.command {
            Commands::Series { format, .. } => assert_eq!(format, OutputFormat::Csv),
            _ => panic!("expected series"),
        }
    }

    #[test]
    fn test_unknown_format_or_source_is_rejected() {
        assert!(Cli::try_parse_from(["covid", "rows", "France", "--format", "xml"]).is_err());
        assert!(Cli::try_parse_from(["covid", "--source", "jhu", "countries"]).is_err());
    }
}
