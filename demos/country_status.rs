use chrono::NaiveDate;

use covid_trends::io::summary::write_country_summary;
use covid_trends::{CaseRecord, Dataset, MetricsConfig, MetricsEngine, PopulationRecord};

fn main() -> anyhow::Result<()> {
    // Toy week for one country; real runs go through io::load_dataset.
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).ok_or_else(|| anyhow::anyhow!("bad start date"))?;
    let totals = [
        (10.0, 0.0, 0.0),
        (25.0, 1.0, 2.0),
        (60.0, 2.0, 5.0),
        (110.0, 4.0, 12.0),
        (180.0, 7.0, 30.0),
        (240.0, 9.0, 55.0),
        (290.0, 12.0, 90.0),
    ];
    let cases: Vec<CaseRecord> = totals
        .iter()
        .zip(start.iter_days())
        .map(|(&(c, d, r), date)| CaseRecord::new("Testland", date, c, d, r))
        .collect();
    let population = vec![PopulationRecord {
        country: "Testland".to_string(),
        population: 1_000_000.0,
    }];

    let dataset = Dataset::join(cases, &population)?;
    let cfg = MetricsConfig {
        window: 3,
        ..MetricsConfig::default()
    };
    let engine = MetricsEngine::new(dataset, cfg)?;

    let status = engine.country_status("Testland")?;
    write_country_summary(&mut std::io::stdout().lock(), &status)?;

    Ok(())
}
