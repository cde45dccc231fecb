//! Quantile histogram binning of feature columns for split finding.

use crate::model::matrix::FeatureMatrix;
use ordered_float::OrderedFloat;

/// Feature columns bucketed into at most `max_bins` bins.
///
/// A value falls in bin `b` when exactly `b` cut points are below it, so every
/// value in bins `0..=k` is `<= cuts[k]`. Tree splits therefore store `cuts[k]`
/// as a raw threshold and prediction needs no bins at all.
#[derive(Debug, Clone)]
pub(crate) struct BinnedMatrix {
    cuts: Vec<Vec<f64>>,
    bins: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    pub(crate) fn new(matrix: &FeatureMatrix, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let mut cuts = Vec::with_capacity(matrix.n_features());
        let mut bins = Vec::with_capacity(matrix.n_features());
        for feature in 0..matrix.n_features() {
            let column: Vec<f64> = matrix.column(feature).collect();
            let feature_cuts = cut_points(&column, max_bins);
            bins.push(
                column
                    .iter()
                    .map(|value| bin_index(&feature_cuts, *value))
                    .collect(),
            );
            cuts.push(feature_cuts);
        }
        Self { cuts, bins }
    }

    pub(crate) fn n_features(&self) -> usize {
        self.cuts.len()
    }

    pub(crate) fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }

    pub(crate) fn bin(&self, feature: usize, row: usize) -> usize {
        self.bins[feature][row] as usize
    }

    pub(crate) fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }
}

fn bin_index(cuts: &[f64], value: f64) -> u8 {
    cuts.partition_point(|cut| *cut < value) as u8
}

/// Midpoints between distinct values when there are few of them, quantiles otherwise.
fn cut_points(column: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<OrderedFloat<f64>> = column.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    let mut distinct = sorted.clone();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct
            .windows(2)
            .map(|pair| (pair[0].0 + pair[1].0) / 2.0)
            .collect();
    }

    let n = sorted.len();
    let mut cuts: Vec<OrderedFloat<f64>> = (1..max_bins)
        .map(|q| sorted[q * n / max_bins])
        .collect();
    cuts.dedup();
    // a cut at the maximum would leave the last bin empty
    if cuts.last() == sorted.last() {
        cuts.pop();
    }
    cuts.into_iter().map(|cut| cut.0).collect()
}
