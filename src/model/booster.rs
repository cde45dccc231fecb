//! Second-order histogram gradient boosting for regression and multiclass
//! classification.

use crate::error::HourcastError;
use crate::features::label_encoder::LabelDecoder;
use crate::forecast::error::SchemaMismatchError;
use crate::model::binning::BinnedMatrix;
use crate::model::error::TrainingError;
use crate::model::matrix::{check_width, FeatureMatrix};
use crate::model::tree::{RegressionTree, TreeGrower};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MIN_HESSIAN: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    /// L2 regularisation on leaf values.
    pub lambda: f64,
    /// Fraction of rows sampled for each boosting round.
    pub subsample: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            lambda: 1.0,
            subsample: 1.0,
            max_bins: 64,
            seed: 42,
        }
    }
}

struct RowSampler {
    rng: StdRng,
    fraction: f64,
    rows: usize,
}

impl RowSampler {
    fn new(params: &BoostingParams, rows: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            fraction: params.subsample.clamp(0.0, 1.0),
            rows,
        }
    }

    fn sample(&mut self) -> Vec<usize> {
        if self.fraction >= 1.0 {
            return (0..self.rows).collect();
        }
        let sampled: Vec<usize> = (0..self.rows)
            .filter(|_| self.rng.gen::<f64>() < self.fraction)
            .collect();
        if sampled.is_empty() {
            vec![self.rng.gen_range(0..self.rows)]
        } else {
            sampled
        }
    }
}

/// Gradient-boosted regression trees with squared-error loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fits a squared-error boosted ensemble starting from the target mean.
    ///
    /// # Arguments
    /// * `x`: Training features, one row per sample.
    /// * `y`: One target per row of `x`.
    /// * `params`: Boosting hyper-parameters.
    ///
    /// # Returns
    /// The fitted regressor, or a [`TrainingError`] if `x` is empty or `y` does
    /// not match it.
    ///
    /// # Examples
    ///
    /// ```
    /// use hourcast::{BoostingParams, FeatureMatrix, FeatureSchema, GradientBoostedRegressor};
    ///
    /// let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
    /// let y: Vec<f64> = (0..30).map(|i| 2.0 * i as f64).collect();
    /// let x = FeatureMatrix::from_rows(FeatureSchema::new(["hour"]), rows)?;
    ///
    /// let model = GradientBoostedRegressor::fit(&x, &y, &BoostingParams::default())?;
    /// assert_eq!(model.n_features(), 1);
    /// assert!(model.predict(&[10.0])?.is_finite());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &BoostingParams) -> Result<Self, TrainingError> {
        check_training_set(x, y.len())?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(TrainingError::InvalidTarget("regression target".to_string()));
        }

        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let binned = BinnedMatrix::new(x, params.max_bins);
        let mut predictions = vec![base_score; y.len()];
        let hessians = vec![1.0; y.len()];
        let mut sampler = RowSampler::new(params, y.len());
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let gradients: Vec<f64> = predictions.iter().zip(y).map(|(p, t)| p - t).collect();
            let tree = TreeGrower::new(&binned, params, &gradients, &hessians).grow(sampler.sample());
            for (idx, prediction) in predictions.iter_mut().enumerate() {
                *prediction += tree.predict(x.row(idx));
            }
            trees.push(tree);
        }
        debug!(
            "Fitted regressor with {} trees (max depth {}) on {} rows x {} features",
            trees.len(),
            trees.iter().map(RegressionTree::depth).max().unwrap_or(0),
            x.n_rows(),
            x.n_features()
        );

        Ok(Self {
            base_score,
            n_features: x.n_features(),
            trees,
        })
    }

    pub fn predict(&self, row: &[f64]) -> Result<f64, SchemaMismatchError> {
        check_width(row, self.n_features)?;
        Ok(self.base_score + self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>())
    }

    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Vec<f64>, SchemaMismatchError> {
        x.rows().map(|row| self.predict(row)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Softmax multiclass boosting: one tree per class per round.
///
/// Class codes are the sorted distinct target values seen during fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    classes: Vec<i64>,
    n_features: usize,
    rounds: Vec<Vec<RegressionTree>>,
}

impl GradientBoostedClassifier {
    pub fn fit(x: &FeatureMatrix, y: &[i64], params: &BoostingParams) -> Result<Self, TrainingError> {
        check_training_set(x, y.len())?;
        let classes: Vec<i64> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(TrainingError::TooFewClasses(classes.len()));
        }
        let targets: Vec<usize> = y
            .iter()
            .map(|code| classes.binary_search(code).unwrap_or_default())
            .collect();

        let n_classes = classes.len();
        let binned = BinnedMatrix::new(x, params.max_bins);
        let mut margins = vec![vec![0.0; n_classes]; y.len()];
        let mut sampler = RowSampler::new(params, y.len());
        let mut rounds = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let probabilities: Vec<Vec<f64>> = margins.iter().map(|m| softmax(m)).collect();
            let rows = sampler.sample();
            let mut round = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                let (gradients, hessians): (Vec<f64>, Vec<f64>) = probabilities
                    .iter()
                    .zip(&targets)
                    .map(|(p, target)| {
                        let p = p[class];
                        let indicator = if *target == class { 1.0 } else { 0.0 };
                        (p - indicator, (2.0 * p * (1.0 - p)).max(MIN_HESSIAN))
                    })
                    .unzip();
                let tree = TreeGrower::new(&binned, params, &gradients, &hessians).grow(rows.clone());
                for (idx, margin) in margins.iter_mut().enumerate() {
                    margin[class] += tree.predict(x.row(idx));
                }
                round.push(tree);
            }
            rounds.push(round);
        }
        debug!(
            "Fitted classifier with {} rounds over {} classes on {} rows",
            rounds.len(),
            n_classes,
            x.n_rows()
        );

        Ok(Self {
            classes,
            n_features: x.n_features(),
            rounds,
        })
    }

    /// Class probabilities, in the order of [`classes`](Self::classes).
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, SchemaMismatchError> {
        check_width(row, self.n_features)?;
        let mut margins = vec![0.0; self.classes.len()];
        for round in &self.rounds {
            for (margin, tree) in margins.iter_mut().zip(round) {
                *margin += tree.predict(row);
            }
        }
        Ok(softmax(&margins))
    }

    /// The most probable class code.
    pub fn predict(&self, row: &[f64]) -> Result<i64, SchemaMismatchError> {
        let probabilities = self.predict_proba(row)?;
        let best = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (idx, p)| {
                if *p > best.1 {
                    (idx, *p)
                } else {
                    best
                }
            })
            .0;
        Ok(self.classes[best])
    }

    /// Predicts a class and decodes it into its condition label.
    pub fn predict_label(&self, row: &[f64], decoder: &LabelDecoder) -> Result<String, HourcastError> {
        let code = self.predict(row)?;
        Ok(decoder.decode(code)?)
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

fn check_training_set(x: &FeatureMatrix, targets: usize) -> Result<(), TrainingError> {
    if x.is_empty() {
        return Err(TrainingError::EmptyFeatures);
    }
    if x.n_features() == 0 {
        return Err(TrainingError::NoFeatureColumns);
    }
    if x.n_rows() != targets {
        return Err(TrainingError::LengthMismatch {
            rows: x.n_rows(),
            targets,
        });
    }
    Ok(())
}

fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::label_encoder::LabelEncoder;
    use crate::types::feature_schema::FeatureSchema;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let width = rows.first().map_or(0, Vec::len);
        let names: Vec<String> = (0..width).map(|i| format!("f{i}")).collect();
        FeatureMatrix::from_rows(FeatureSchema::new(names), rows).unwrap()
    }

    #[test]
    fn regressor_fits_a_linear_signal() -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64 / 10.0, (i % 3) as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        let x = matrix(rows);
        let model = GradientBoostedRegressor::fit(&x, &y, &BoostingParams::default())?;

        assert_eq!(model.n_trees(), 100);
        assert_relative_eq!(model.predict(&[10.0, 0.0])?, 21.0, epsilon = 0.5);
        let predictions = model.predict_matrix(&x)?;
        let mse = predictions.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        assert!(mse < 0.1, "mse {mse}");
        Ok(())
    }

    #[test]
    fn same_seed_gives_identical_models() -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<Vec<f64>> = (0..100).map(|i| vec![(i * 7 % 13) as f64, i as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| r[0] * r[1]).collect();
        let x = matrix(rows);
        let params = BoostingParams {
            subsample: 0.7,
            n_estimators: 20,
            ..BoostingParams::default()
        };
        let a = GradientBoostedRegressor::fit(&x, &y, &params)?;
        let b = GradientBoostedRegressor::fit(&x, &y, &params)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn prediction_checks_feature_count() -> Result<(), Box<dyn std::error::Error>> {
        let x = matrix(vec![vec![1.0, 2.0], vec![2.0, 3.0]]);
        let model = GradientBoostedRegressor::fit(&x, &[1.0, 2.0], &BoostingParams::default())?;
        assert_eq!(
            model.predict(&[1.0]),
            Err(SchemaMismatchError::FeatureCount {
                expected: 2,
                found: 1
            })
        );
        Ok(())
    }

    #[test]
    fn classifier_separates_classes() -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<Vec<f64>> = (0..90).map(|i| vec![(i % 30) as f64]).collect();
        let y: Vec<i64> = rows
            .iter()
            .map(|r| match r[0] as i64 {
                0..=9 => 0,
                10..=19 => 2,
                _ => 5,
            })
            .collect();
        let x = matrix(rows);
        let model = GradientBoostedClassifier::fit(&x, &y, &BoostingParams::default())?;

        assert_eq!(model.classes(), &[0, 2, 5]);
        assert_eq!(model.predict(&[3.0])?, 0);
        assert_eq!(model.predict(&[15.0])?, 2);
        assert_eq!(model.predict(&[27.0])?, 5);
        let probabilities = model.predict_proba(&[15.0])?;
        assert_relative_eq!(probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(probabilities[1] > 0.9);
        Ok(())
    }

    #[test]
    fn classifier_decodes_labels() -> Result<(), Box<dyn std::error::Error>> {
        let encoder = Arc::new(LabelEncoder::fit(["Clear sky", "Overcast"])?);
        let decoder = LabelDecoder::new(encoder);
        let x = matrix((0..20).map(|i| vec![i as f64]).collect());
        let y: Vec<i64> = (0..20).map(|i| i64::from(i >= 10)).collect();
        let model = GradientBoostedClassifier::fit(&x, &y, &BoostingParams::default())?;
        assert_eq!(model.predict_label(&[15.0], &decoder)?, "Overcast");
        Ok(())
    }

    #[test]
    fn classifier_needs_two_classes() {
        let x = matrix(vec![vec![1.0], vec![2.0]]);
        assert!(matches!(
            GradientBoostedClassifier::fit(&x, &[4, 4], &BoostingParams::default()),
            Err(TrainingError::TooFewClasses(1))
        ));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let x = FeatureMatrix::from_rows(FeatureSchema::new(["a"]), vec![]).unwrap();
        assert!(matches!(
            GradientBoostedRegressor::fit(&x, &[], &BoostingParams::default()),
            Err(TrainingError::EmptyFeatures)
        ));
    }
}
