pub mod background;
pub mod config;
pub mod explanation;
pub mod forest;
pub mod record;

pub use background::{BackgroundData, BackgroundError};
pub use config::{ArtifactConfig, Config, ExplainerConfig};
pub use explanation::{Explanation, FeatureContribution, PredictionOutcome};
pub use forest::{DecisionTree, ForestError, RandomForest};
pub use record::{
    BinaryFlag, ClinicalRecord, FEATURE_COUNT, FEATURE_LABELS, FEATURE_NAMES, RecordError,
};
