//! SHAP background dataset

use serde::{Deserialize, Serialize};

use super::forest::{check_feature_names, ForestError};
use super::record::FEATURE_COUNT;

/// Errors found while validating a background artifact
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackgroundError {
    #[error(transparent)]
    FeatureNames(#[from] ForestError),

    #[error("background dataset has no rows")]
    Empty,

    #[error("row {row} has {found} values, expected 7")]
    RowWidth { row: usize, found: usize },

    #[error("row {row} contains a non-finite value")]
    NonFinite { row: usize },
}

/// Reference feature vectors the explainer measures contributions against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundData {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl BackgroundData {
    pub fn validate(&self) -> Result<(), BackgroundError> {
        check_feature_names(&self.feature_names)?;

        if self.rows.is_empty() {
            return Err(BackgroundError::Empty);
        }
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != FEATURE_COUNT {
                return Err(BackgroundError::RowWidth {
                    row,
                    found: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(BackgroundError::NonFinite { row });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Up to `max` rows picked at an even stride, as fixed-width vectors
    pub fn sample(&self, max: usize) -> Result<Vec<[f64; FEATURE_COUNT]>, BackgroundError> {
        let n = self.rows.len();
        if n == 0 {
            return Err(BackgroundError::Empty);
        }
        let take = max.clamp(1, n);

        (0..take)
            .map(|i| i * n / take)
            .map(|row| {
                let values = &self.rows[row];
                <[f64; FEATURE_COUNT]>::try_from(values.as_slice()).map_err(|_| {
                    BackgroundError::RowWidth {
                        row,
                        found: values.len(),
                    }
                })
            })
            .collect()
    }
}
