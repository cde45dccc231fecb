use crate::forecast::error::SchemaMismatchError;
use crate::model::error::TrainingError;
use crate::types::feature_schema::FeatureSchema;

/// Dense row-major feature matrix together with the schema that names its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    values: Vec<f64>,
    rows: usize,
}

impl FeatureMatrix {
    /// Builds a matrix from rows. Every row must have one value per schema
    /// column and every value must be finite.
    pub fn from_rows(schema: FeatureSchema, rows: Vec<Vec<f64>>) -> Result<Self, TrainingError> {
        let width = schema.len();
        let height = rows.len();
        let mut values = Vec::with_capacity(width * height);
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TrainingError::RowWidth {
                    row: row_idx,
                    expected: width,
                    found: row.len(),
                });
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(TrainingError::NonFiniteFeature {
                    feature: schema.columns()[col].clone(),
                    row: row_idx,
                });
            }
            values.extend(row);
        }
        Ok(Self {
            schema,
            values,
            rows: height,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let width = self.n_features();
        &self.values[idx * width..(idx + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(|idx| self.row(idx))
    }

    pub fn column(&self, feature: usize) -> impl Iterator<Item = f64> + '_ {
        let width = self.n_features();
        self.values.iter().skip(feature).step_by(width.max(1)).copied()
    }
}

/// Fails unless `row` has exactly `expected` values.
pub(crate) fn check_width(row: &[f64], expected: usize) -> Result<(), SchemaMismatchError> {
    if row.len() == expected {
        Ok(())
    } else {
        Err(SchemaMismatchError::FeatureCount {
            expected,
            found: row.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_rows_and_columns() -> Result<(), TrainingError> {
        let schema = FeatureSchema::new(["a", "b"]);
        let matrix = FeatureMatrix::from_rows(schema, vec![vec![1.0, 2.0], vec![3.0, 4.0]])?;
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
        assert_eq!(matrix.column(1).collect::<Vec<_>>(), vec![2.0, 4.0]);
        assert_eq!(matrix.n_rows(), 2);
        Ok(())
    }

    #[test]
    fn rejects_non_finite_values() {
        let schema = FeatureSchema::new(["a", "b"]);
        let err = FeatureMatrix::from_rows(schema, vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert!(matches!(err, TrainingError::NonFiniteFeature { feature, row: 0 } if feature == "b"));
    }
}
