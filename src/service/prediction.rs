//! Prediction service
//!
//! Runs one clinical record through the classifier, explains the result and
//! renders the force plot. All three outputs are produced or none is.

use std::sync::Arc;

use crate::model::{
    BackgroundError, ClinicalRecord, Explanation, ExplainerConfig, PredictionOutcome, RecordError,
};
use crate::service::explainer::TreeExplainer;
use crate::service::force_plot::{render_force_plot, RenderError};
use crate::service::store::ModelStore;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Invalid clinical record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Stateless per-request inference over the shared model store
pub struct PredictionService {
    store: Arc<ModelStore>,
    explainer: TreeExplainer,
}

impl PredictionService {
    pub fn new(store: Arc<ModelStore>, config: &ExplainerConfig) -> Result<Self, BackgroundError> {
        let explainer = TreeExplainer::new(
            store.classifier(),
            store.background(),
            config.max_background_samples,
        )?;

        Ok(Self { store, explainer })
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Expected positive-class probability over the background sample
    pub fn base_value(&self) -> f64 {
        self.explainer.expected_value()
    }

    pub fn explainer_background_rows(&self) -> usize {
        self.explainer.background_rows()
    }

    /// Positive-class probability for a record
    pub fn probability(&self, record: &ClinicalRecord) -> Result<f64, PredictionError> {
        record.validate()?;
        Ok(self.store.classifier().predict_proba(&record.to_features()))
    }

    /// Probability plus its SHAP decomposition
    pub fn explain(&self, record: &ClinicalRecord) -> Result<Explanation, PredictionError> {
        let probability = self.probability(record)?;
        let features = record.to_features();
        let shap_values = self
            .explainer
            .shap_values(self.store.classifier(), &features);

        let explanation = Explanation::new(
            self.explainer.expected_value(),
            probability,
            &features,
            &shap_values,
        );

        let drift = (explanation.reconstructed() - probability).abs();
        if drift > 1e-6 {
            tracing::warn!(
                drift,
                probability,
                "SHAP values do not add up to the prediction"
            );
        }

        Ok(explanation)
    }

    /// Probability, explanation and rendered force plot for one trigger
    pub fn predict(&self, record: &ClinicalRecord) -> Result<PredictionOutcome, PredictionError> {
        let explanation = self.explain(record)?;
        let force_plot_svg = render_force_plot(&explanation)?;

        tracing::debug!(
            probability = explanation.prediction,
            base_value = explanation.base_value,
            "Computed PB risk prediction"
        );

        Ok(PredictionOutcome {
            probability: explanation.prediction,
            explanation,
            force_plot_svg,
        })
    }
}
