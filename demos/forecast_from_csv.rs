use hourcast::{read_history_csv, write_csv, ForecastConfig, HourcastError, RetrainCycle, ENGINEERED_CSV, FORECAST_CSV};
use std::env;
use std::path::PathBuf;

/// Forecasts the next hour from a saved history CSV with previously trained models.
///
/// The history must be an hourly table with weather codes, such as the
/// `weather_data.csv` a retrain cycle writes. A `weather_data_with_predictions.csv`
/// is a forecast output, not a history, and is rejected.
fn main() -> Result<(), HourcastError> {
    env_logger::init();

    let config = ForecastConfig::default();
    let history_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output_dir.join(ENGINEERED_CSV));
    let output_path = config.output_dir.join(FORECAST_CSV);

    let history = read_history_csv(&history_path)?;
    println!("Read {} rows from {}", history.height(), history_path.display());

    let outcome = RetrainCycle::new(config).forecast_from_store(history)?;
    write_csv(&outcome.table, &output_path)?;

    println!(
        "Next hour {}: {:.1} °C, written to {}",
        outcome.timestamp,
        outcome.temperature,
        output_path.display()
    );
    Ok(())
}
