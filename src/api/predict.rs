//! REST API endpoints for PB risk prediction

use actix_web::{HttpResponse, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::model::explanation::format_percentage;
use crate::model::{ClinicalRecord, Explanation, FEATURE_NAMES};
use crate::service::PredictionService;

/// Prediction with its SHAP explanation
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionResponse {
    /// Positive-class probability in [0, 1]
    pub probability: f64,
    /// Probability formatted for display, e.g. `12.34%`
    pub percentage: String,
    pub explanation: Explanation,
    /// RFC 3339 timestamp
    pub computed_at: String,
}

/// Loaded model summary
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelInfo {
    pub feature_names: Vec<String>,
    pub trees: usize,
    pub background_rows: usize,
    pub explainer_background_rows: usize,
    pub base_value: f64,
}

/// Predict PB risk for one clinical record
#[utoipa::path(
    post,
    path = "/v1/predict",
    request_body = ClinicalRecord,
    responses(
        (status = 200, description = "Prediction computed", body = PredictionResponse),
        (status = 400, description = "Malformed record", body = crate::api::error::ErrorResponse)
    ),
    tag = "prediction"
)]
#[post("/v1/predict")]
pub async fn predict(
    service: web::Data<PredictionService>,
    record: web::Json<ClinicalRecord>,
) -> Result<HttpResponse, ApiError> {
    let explanation = service.explain(&record)?;

    tracing::info!(probability = explanation.prediction, "Served prediction");

    Ok(HttpResponse::Ok().json(PredictionResponse {
        probability: explanation.prediction,
        percentage: format_percentage(explanation.prediction),
        explanation,
        computed_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Render the SHAP force plot for one clinical record
#[utoipa::path(
    post,
    path = "/v1/predict/force-plot",
    request_body = ClinicalRecord,
    responses(
        (status = 200, description = "SVG force plot", content_type = "image/svg+xml", body = String),
        (status = 400, description = "Malformed record", body = crate::api::error::ErrorResponse)
    ),
    tag = "prediction"
)]
#[post("/v1/predict/force-plot")]
pub async fn force_plot(
    service: web::Data<PredictionService>,
    record: web::Json<ClinicalRecord>,
) -> Result<HttpResponse, ApiError> {
    let outcome = service.predict(&record)?;

    Ok(HttpResponse::Ok()
        .content_type("image/svg+xml")
        .body(outcome.force_plot_svg))
}

/// Describe the loaded classifier and explainer baseline
#[utoipa::path(
    get,
    path = "/v1/model",
    responses(
        (status = 200, description = "Model summary", body = ModelInfo)
    ),
    tag = "prediction"
)]
#[get("/v1/model")]
pub async fn model_info(service: web::Data<PredictionService>) -> HttpResponse {
    let store = service.store();

    HttpResponse::Ok().json(ModelInfo {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        trees: store.classifier().tree_count(),
        background_rows: store.background().len(),
        explainer_background_rows: service.explainer_background_rows(),
        base_value: service.base_value(),
    })
}

/// Configure prediction routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    cfg.app_data(json_config)
        .service(predict)
        .service(force_plot)
        .service(model_info);
}
