//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::{error, health, predict};
use crate::model::{ClinicalRecord, Explanation, FeatureContribution};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PB Predictor API",
        description = "Plastic bronchitis risk prediction with SHAP explanations"
    ),
    paths(
        predict::predict,
        predict::force_plot,
        predict::model_info,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ClinicalRecord,
        Explanation,
        FeatureContribution,
        predict::PredictionResponse,
        predict::ModelInfo,
        health::HealthStatus,
        health::ReadinessStatus,
        health::ModelHealth,
        error::ErrorResponse,
    )),
    tags(
        (name = "prediction", description = "PB risk prediction and explanation"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => HttpResponse::Ok().content_type("text/yaml").body(yaml),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize OpenAPI document");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
