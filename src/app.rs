//! Application state and service initialization
//!
//! Loads the model artifacts once and builds the services handlers share.

use std::sync::Arc;

use crate::model::{BackgroundError, Config};
use crate::service::{ModelStore, ModelStoreError, PredictionService};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Inference, explanation and plotting over the shared model store
    pub prediction_service: Arc<PredictionService>,
}

impl AppState {
    /// Load artifacts and build the service graph.
    ///
    /// Any artifact failure is returned to the caller; the process cannot
    /// serve predictions without them.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let store = Arc::new(ModelStore::load(&config.artifacts)?);

        let prediction_service = Arc::new(PredictionService::new(
            Arc::clone(&store),
            &config.explainer,
        )?);

        tracing::info!(
            base_value = prediction_service.base_value(),
            explainer_rows = prediction_service.explainer_background_rows(),
            "Prediction service ready"
        );

        Ok(Self { prediction_service })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Model artifacts could not be loaded
    #[error("Model initialization failed: {0}")]
    ModelLoad(#[from] ModelStoreError),

    /// Background sample unusable by the explainer
    #[error("Explainer initialization failed: {0}")]
    Explainer(#[from] BackgroundError),
}
