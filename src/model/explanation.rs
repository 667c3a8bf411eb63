use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::record::{FEATURE_COUNT, FEATURE_NAMES};

/// Additive attribution of one prediction to one input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureContribution {
    /// Model feature name
    pub feature: String,
    /// Input value the model saw
    pub value: f64,
    /// Signed SHAP value for the positive class
    pub shap_value: f64,
}

/// SHAP decomposition of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Explanation {
    /// Expected positive-class probability over the background dataset
    pub base_value: f64,
    /// Positive-class probability for this record
    pub prediction: f64,
    /// One entry per feature, in model order
    pub contributions: Vec<FeatureContribution>,
}

impl Explanation {
    pub fn new(
        base_value: f64,
        prediction: f64,
        features: &[f64; FEATURE_COUNT],
        shap_values: &[f64; FEATURE_COUNT],
    ) -> Self {
        let contributions = FEATURE_NAMES
            .iter()
            .zip(features.iter().zip(shap_values.iter()))
            .map(|(name, (value, shap))| FeatureContribution {
                feature: name.to_string(),
                value: *value,
                shap_value: *shap,
            })
            .collect();

        Self {
            base_value,
            prediction,
            contributions,
        }
    }

    /// `base_value` plus every contribution
    pub fn reconstructed(&self) -> f64 {
        self.base_value + self.contributions.iter().map(|c| c.shap_value).sum::<f64>()
    }
}

/// Everything produced for one prediction trigger
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub probability: f64,
    pub explanation: Explanation,
    pub force_plot_svg: String,
}

impl PredictionOutcome {
    /// Probability as shown to the user, e.g. `12.34%`
    pub fn percentage(&self) -> String {
        format_percentage(self.probability)
    }
}

pub fn format_percentage(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}
