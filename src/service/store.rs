//! Model store
//!
//! Loads the classifier and the background dataset once at startup. The
//! store is immutable afterwards and shared between workers behind an `Arc`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::model::{ArtifactConfig, BackgroundData, BackgroundError, ForestError, RandomForest};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModelStoreError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid classifier in {path}: {source}")]
    Classifier {
        path: PathBuf,
        #[source]
        source: ForestError,
    },

    #[error("Invalid background dataset in {path}: {source}")]
    Background {
        path: PathBuf,
        #[source]
        source: BackgroundError,
    },
}

/// Read-only handles to the trained classifier and its background dataset
#[derive(Debug)]
pub struct ModelStore {
    classifier: RandomForest,
    background: BackgroundData,
}

impl ModelStore {
    /// Load and validate both artifacts
    pub fn load(config: &ArtifactConfig) -> Result<Self, ModelStoreError> {
        let mut classifier: RandomForest = read_json(&config.model_path)?;
        classifier
            .validate()
            .map_err(|source| ModelStoreError::Classifier {
                path: config.model_path.clone(),
                source,
            })?;

        let background: BackgroundData = read_json(&config.background_path)?;
        background
            .validate()
            .map_err(|source| ModelStoreError::Background {
                path: config.background_path.clone(),
                source,
            })?;

        tracing::info!(
            model = %config.model_path.display(),
            background = %config.background_path.display(),
            trees = classifier.tree_count(),
            background_rows = background.len(),
            "Loaded model artifacts"
        );

        Ok(Self::from_parts(classifier, background))
    }

    /// Build a store from already validated artifacts
    pub fn from_parts(classifier: RandomForest, background: BackgroundData) -> Self {
        Self {
            classifier,
            background,
        }
    }

    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    pub fn background(&self) -> &BackgroundData {
        &self.background
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelStoreError> {
    let contents = fs::read_to_string(path).map_err(|source| ModelStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ModelStoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::forest::tests::{names, sample_forest};
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn sample_background() -> BackgroundData {
        BackgroundData {
            feature_names: names(),
            rows: vec![
                vec![5.0, 0.0, 15.0, 0.5, 0.0, 0.0, 0.0],
                vec![8.0, 1.0, 32.0, 1.6, 1.0, 0.0, 1.0],
                vec![3.5, 0.0, 8.0, 0.2, 0.0, 1.0, 0.0],
                vec![7.0, 1.0, 24.0, 0.9, 0.0, 0.0, 0.0],
                vec![10.0, 1.0, 45.0, 2.4, 1.0, 1.0, 1.0],
            ],
        }
    }

    pub(crate) fn sample_store() -> ModelStore {
        ModelStore::from_parts(sample_forest(), sample_background())
    }

    fn write_json<T: serde::Serialize>(value: &T) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(value).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn test_load_valid_artifacts() {
        let model = write_json(&sample_forest());
        let background = write_json(&sample_background());
        let config = ArtifactConfig {
            model_path: model.path().to_path_buf(),
            background_path: background.path().to_path_buf(),
        };

        let store = ModelStore::load(&config).unwrap();
        assert_eq!(store.classifier().tree_count(), 5);
        assert_eq!(store.background().len(), 5);

        let x = [5.0, 0.0, 15.0, 0.5, 0.0, 0.0, 0.0];
        assert_eq!(
            store.classifier().predict_proba(&x),
            sample_forest().predict_proba(&x)
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let background = write_json(&sample_background());
        let config = ArtifactConfig {
            model_path: PathBuf::from("/nonexistent/random_forest_model.json"),
            background_path: background.path().to_path_buf(),
        };
        assert!(matches!(
            ModelStore::load(&config),
            Err(ModelStoreError::Io { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let mut model = NamedTempFile::new().unwrap();
        model.write_all(b"\x80\x04\x95 not json").unwrap();
        let background = write_json(&sample_background());
        let config = ArtifactConfig {
            model_path: model.path().to_path_buf(),
            background_path: background.path().to_path_buf(),
        };

        let err = ModelStore::load(&config).unwrap_err();
        // Invalid UTF-8 surfaces as a read error, anything else as a parse error
        assert!(matches!(
            err,
            ModelStoreError::Io { .. } | ModelStoreError::Parse { .. }
        ));
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let model = write_json(&sample_forest());
        let mut mismatched = sample_background();
        mismatched.feature_names.swap(5, 6);
        let background = write_json(&mismatched);
        let config = ArtifactConfig {
            model_path: model.path().to_path_buf(),
            background_path: background.path().to_path_buf(),
        };
        assert!(matches!(
            ModelStore::load(&config),
            Err(ModelStoreError::Background { .. })
        ));
    }
}
