use crate::config::ColumnBounds;
use polars::prelude::*;

/// True where the column falls outside `bounds`.
pub fn out_of_range(bounds: &ColumnBounds) -> Expr {
    let column = bounds.column.as_str();
    col(column)
        .lt(lit(bounds.min))
        .or(col(column).gt(lit(bounds.max)))
}

/// Replaces every value outside `bounds` with the column median.
///
/// The median is taken over the whole column, outliers included. A median that
/// itself falls outside the bounds is clamped into them, so the column is
/// always in range afterwards.
pub fn replace_outliers(bounds: &ColumnBounds) -> Expr {
    let column = bounds.column.as_str();
    let median = col(column).median();
    let replacement = when(median.clone().lt(lit(bounds.min)))
        .then(lit(bounds.min))
        .when(median.clone().gt(lit(bounds.max)))
        .then(lit(bounds.max))
        .otherwise(median);
    when(out_of_range(bounds))
        .then(replacement)
        .otherwise(col(column))
        .alias(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature_bounds() -> ColumnBounds {
        ColumnBounds::new("temperature", -6.1, 49.5)
    }

    fn apply(values: &[f64]) -> Vec<f64> {
        let df = df!("temperature" => values).unwrap();
        df.lazy()
            .select([replace_outliers(&temperature_bounds())])
            .collect()
            .unwrap()
            .column("temperature")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn outlier_takes_column_median() {
        assert_eq!(
            apply(&[20.0, 24.3, 60.0, 25.0, 24.0]),
            vec![20.0, 24.3, 24.3, 25.0, 24.0]
        );
    }

    #[test]
    fn values_below_minimum_are_replaced() {
        assert_eq!(apply(&[-40.0, 10.0, 12.0]), vec![10.0, 10.0, 12.0]);
    }

    #[test]
    fn in_range_column_is_untouched() {
        assert_eq!(apply(&[-6.1, 0.0, 49.5]), vec![-6.1, 0.0, 49.5]);
    }

    #[test]
    fn out_of_range_median_is_clamped() {
        assert_eq!(apply(&[80.0, 90.0, 10.0]), vec![49.5, 49.5, 10.0]);
    }

    #[test]
    fn counts_out_of_range_values() {
        let df = df!("temperature" => [-7.0, 0.0, 50.0, 49.5]).unwrap();
        let count = df
            .lazy()
            .select([out_of_range(&temperature_bounds()).sum()])
            .collect()
            .unwrap()
            .column("temperature")
            .unwrap()
            .cast(&DataType::UInt64)
            .unwrap()
            .u64()
            .unwrap()
            .get(0);
        assert_eq!(count, Some(2));
    }
}
