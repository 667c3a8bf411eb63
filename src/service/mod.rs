pub mod explainer;
pub mod force_plot;
pub mod prediction;
pub mod store;

pub use prediction::{PredictionError, PredictionService};
pub use store::{ModelStore, ModelStoreError};
