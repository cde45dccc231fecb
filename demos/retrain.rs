use hourcast::{ForecastConfig, HourcastError, OpenMeteoFetcher, RetrainCycle};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), HourcastError> {
    // RUST_LOG=info (or debug) to follow the cycle
    env_logger::init();
    configure_polars_display();

    // optional JSON config override as the first argument
    let config = match env::args().nth(1) {
        Some(path) => ForecastConfig::from_json_file(Path::new(&path))?,
        None => ForecastConfig::default(),
    };

    let fetcher = match &config.cache_dir {
        Some(dir) => OpenMeteoFetcher::new(config.location, config.timezone.clone(), dir),
        None => OpenMeteoFetcher::with_default_cache(config.location, config.timezone.clone())?,
    };

    let output = RetrainCycle::new(config).run_from_source(&fetcher).await?;
    println!(
        "Next hour {}: {:.1} °C",
        output.forecast.timestamp, output.forecast.temperature
    );
    println!("{}", output.forecast.table.tail(Some(5)));
    println!("History written to {}", output.engineered_path.display());
    println!("Forecast written to {}", output.forecast_path.display());
    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "10");
}
