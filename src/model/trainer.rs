use crate::cleaning::error::DataError;
use crate::error::HourcastError;
use crate::features::label_encoder::{LabelDecoder, LabelEncoder};
use crate::frame::{column_f64_values, get_column, is_numeric, str_values};
use crate::model::booster::{BoostingParams, GradientBoostedClassifier, GradientBoostedRegressor};
use crate::model::error::TrainingError;
use crate::model::matrix::FeatureMatrix;
use crate::types::columns::{
    COL_DATE_TIME, COL_TEMPERATURE, COL_WEATHER_CONDITION, COL_WEATHER_CONDITION_ENCODED,
};
use crate::types::feature_schema::FeatureSchema;
use log::info;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Splits a lagged table into feature matrices and fits the temperature
/// regressor and the weather-condition classifier.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    params: BoostingParams,
}

impl ModelTrainer {
    /// Creates a trainer that fits both models with `params`.
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }

    /// The boosting hyper-parameters shared by both models.
    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Every numeric column except `temperature` becomes a feature; the target is `temperature`.
    pub fn prepare_regression(
        &self,
        lagged: &DataFrame,
    ) -> Result<(FeatureMatrix, Vec<f64>), HourcastError> {
        let target = target_f64(lagged, COL_TEMPERATURE)?;
        let columns: Vec<String> = lagged
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != COL_TEMPERATURE && is_numeric(c.dtype()))
            .map(|c| c.name().to_string())
            .collect();
        let x = feature_matrix(lagged, columns, None)?;
        Ok((x, target))
    }

    /// Every column except `date_time` and `weather_condition_encoded` becomes a
    /// feature. The target is `weather_condition_encoded`.
    ///
    /// `weather_condition` is coded through `encoder`, the same mapping the
    /// forecaster applies at inference; any other text column is turned into
    /// category codes over its sorted distinct values.
    pub fn prepare_classification(
        &self,
        lagged: &DataFrame,
        encoder: &LabelEncoder,
    ) -> Result<(FeatureMatrix, Vec<i64>), HourcastError> {
        let target = target_i64(lagged, COL_WEATHER_CONDITION_ENCODED)?;
        let columns: Vec<String> = lagged
            .get_column_names()
            .iter()
            .filter(|c| c.as_str() != COL_DATE_TIME && c.as_str() != COL_WEATHER_CONDITION_ENCODED)
            .map(|c| c.to_string())
            .collect();
        let x = feature_matrix(lagged, columns, Some(encoder))?;
        Ok((x, target))
    }

    pub fn train_regression(
        &self,
        x: &FeatureMatrix,
        y: &[f64],
    ) -> Result<GradientBoostedRegressor, TrainingError> {
        let model = GradientBoostedRegressor::fit(x, y, &self.params)?;
        info!(
            "Trained temperature regressor on {} rows with {} features",
            x.n_rows(),
            x.n_features()
        );
        Ok(model)
    }

    /// Fits the classifier and pairs it with a decoder over the same encoder that
    /// produced the target codes.
    pub fn train_classification(
        &self,
        x: &FeatureMatrix,
        y: &[i64],
        encoder: &Arc<LabelEncoder>,
    ) -> Result<(GradientBoostedClassifier, LabelDecoder), TrainingError> {
        if let Some(code) = y
            .iter()
            .find(|code| encoder.inverse_transform(**code).is_err())
        {
            return Err(TrainingError::UnknownClass {
                code: *code,
                classes: encoder.len(),
            });
        }
        let model = GradientBoostedClassifier::fit(x, y, &self.params)?;
        info!(
            "Trained condition classifier on {} rows with {} features over {} classes",
            x.n_rows(),
            x.n_features(),
            model.n_classes()
        );
        Ok((model, LabelDecoder::new(Arc::clone(encoder))))
    }
}

fn target_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>, HourcastError> {
    let column = df
        .column(name)
        .map_err(|_| TrainingError::MissingTarget(name.to_string()))?;
    let values = column_f64_values(column).map_err(TrainingError::from)?;
    let target = values
        .into_iter()
        .map(|v| v.ok_or_else(|| TrainingError::InvalidTarget(name.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(target)
}

fn target_i64(df: &DataFrame, name: &str) -> Result<Vec<i64>, HourcastError> {
    let column = df
        .column(name)
        .map_err(|_| TrainingError::MissingTarget(name.to_string()))?;
    let cast = column.cast(&DataType::Int64).map_err(TrainingError::from)?;
    let target = cast
        .i64()
        .map_err(TrainingError::from)?
        .into_iter()
        .map(|v| v.ok_or_else(|| TrainingError::InvalidTarget(name.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(target)
}

/// Sorted distinct values map to `0..n`; missing values map to `-1`.
fn category_codes(values: &[Option<String>]) -> Vec<f64> {
    let categories: Vec<&String> = values
        .iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    values
        .iter()
        .map(|value| match value {
            Some(v) => categories.binary_search(&v).map_or(-1.0, |idx| idx as f64),
            None => -1.0,
        })
        .collect()
}

fn encoded_conditions(
    df: &DataFrame,
    encoder: &LabelEncoder,
) -> Result<Vec<f64>, HourcastError> {
    str_values(df, COL_WEATHER_CONDITION)?
        .into_iter()
        .map(|label| match label {
            Some(label) => Ok(encoder.transform(&label)? as f64),
            None => Ok(-1.0),
        })
        .collect()
}

fn feature_matrix(
    df: &DataFrame,
    columns: Vec<String>,
    encoder: Option<&LabelEncoder>,
) -> Result<FeatureMatrix, HourcastError> {
    let mut feature_columns = Vec::with_capacity(columns.len());
    for name in &columns {
        let column = get_column(df, name)?;
        let values = if is_numeric(column.dtype()) {
            column_f64_values(column)
                .map_err(|source| DataError::ColumnOperation {
                    column: name.clone(),
                    source,
                })?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect()
        } else {
            match encoder {
                Some(encoder) if name == COL_WEATHER_CONDITION => encoded_conditions(df, encoder)?,
                _ => category_codes(&str_values(df, name)?),
            }
        };
        feature_columns.push(values);
    }

    let rows = (0..df.height())
        .map(|row| feature_columns.iter().map(|col: &Vec<f64>| col[row]).collect())
        .collect();
    Ok(FeatureMatrix::from_rows(FeatureSchema::new(columns), rows)?)
}
