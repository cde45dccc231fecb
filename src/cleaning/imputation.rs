//! Missing-value strategies, expressed as polars expressions. Each one fills the
//! holes of a single column and never changes a value that was observed.

use polars::prelude::*;

/// Fills holes with the most frequent observed value. Ties go to the smallest value.
pub fn mode_fill(column: &str) -> Expr {
    let mode = col(column)
        .drop_nulls()
        .mode()
        .sort(SortOptions::default())
        .first();
    col(column).fill_null(mode).alias(column)
}

/// Fills holes with the median of the observed values.
pub fn median_fill(column: &str) -> Expr {
    col(column).fill_null(col(column).median()).alias(column)
}

pub fn constant_fill(column: &str, value: f64) -> Expr {
    col(column).fill_null(lit(value)).alias(column)
}

/// Fills holes with the running exponentially weighted mean of the observed
/// values (`alpha = 2 / (span + 1)`, no bias adjustment, holes skipped).
///
/// # Arguments
/// * `column`: Name of a `Float64` column.
/// * `span`: EWMA span; values below 1 are treated as 1.
///
/// # Returns
/// An expression yielding the filled column under its own name. Holes before
/// the first observation take the first observed value.
pub fn ewma_fill(column: &str, span: usize) -> Expr {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let running = col(column)
        .ewm_mean(EWMOptions {
            alpha,
            adjust: false,
            ignore_nulls: true,
            ..Default::default()
        })
        .fill_null_with_strategy(FillNullStrategy::Forward(None));
    col(column)
        .fill_null(running)
        .fill_null(col(column).drop_nulls().first())
        .alias(column)
}
