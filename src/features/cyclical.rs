use polars::prelude::*;
use std::f64::consts::PI;

pub const HOURS_PER_DAY: f64 = 24.0;
pub const DAYS_PER_WEEK: f64 = 7.0;

/// Cyclical encoding for periodic features.
/// Returns `[sin, cos]` so the end of a period sits next to its start.
///
/// # Arguments
/// * `value`: A numeric expression, e.g. the hour of day.
/// * `period`: Length of one full cycle in the units of `value`.
pub fn cyclical_encode(value: Expr, period: f64) -> [Expr; 2] {
    let angle = value.cast(DataType::Float64) * lit(2.0 * PI / period);
    [angle.clone().sin(), angle.cos()]
}

/// Hour of day, 0-23.
pub fn hour_of_day(timestamp: Expr) -> Expr {
    timestamp.dt().hour().cast(DataType::Int64)
}

/// Day of week with Monday = 0.
pub fn day_of_week(timestamp: Expr) -> Expr {
    // ISO weekday counts Monday as 1
    timestamp.dt().weekday().cast(DataType::Int64) - lit(1i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::timestamp_series;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn encoded(values: &[f64], period: f64) -> (Vec<f64>, Vec<f64>) {
        let [sin, cos] = cyclical_encode(col("v"), period);
        let df = df!("v" => values)
            .unwrap()
            .lazy()
            .select([sin.alias("sin"), cos.alias("cos")])
            .collect()
            .unwrap();
        let read = |name: &str| -> Vec<f64> {
            df.column(name).unwrap().f64().unwrap().into_no_null_iter().collect()
        };
        (read("sin"), read("cos"))
    }

    #[test]
    fn midnight_is_next_to_last_hour() {
        let (sin, cos) = encoded(&[23.0, 0.0], HOURS_PER_DAY);
        let distance = ((sin[0] - sin[1]).powi(2) + (cos[0] - cos[1]).powi(2)).sqrt();
        assert!(distance < 0.5, "Distance was {}", distance);
    }

    #[test]
    fn quarter_period_is_ninety_degrees() {
        let (sin, cos) = encoded(&[6.0], HOURS_PER_DAY);
        assert_relative_eq!(sin[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(cos[0], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn calendar_parts() -> Result<(), Box<dyn std::error::Error>> {
        // 2024-05-06 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        let sunday = monday + chrono::Duration::days(6);
        let df = DataFrame::new(vec![timestamp_series("ts", &[Some(monday), Some(sunday)])?.into()])?
            .lazy()
            .select([
                hour_of_day(col("ts")).alias("hour"),
                day_of_week(col("ts")).alias("day"),
            ])
            .collect()?;
        let hours: Vec<Option<i64>> = df.column("hour")?.i64()?.into_iter().collect();
        let days: Vec<Option<i64>> = df.column("day")?.i64()?.into_iter().collect();
        assert_eq!(hours, vec![Some(17), Some(17)]);
        assert_eq!(days, vec![Some(0), Some(6)]);
        Ok(())
    }
}
