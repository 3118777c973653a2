// src/web/handlers/system_handlers.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

use crate::service::AnalysisService;
use crate::web::types::*;

pub async fn health_handler(
    service: &State<AnalysisService>,
) -> Result<Json<TextResponse>, ApiError> {
    match service.database().health_check().await {
        Ok(()) => {
            info!("Health check passed");
            Ok(Json(TextResponse::success(
                "Interview analysis service is healthy".to_string(),
            )))
        }
        Err(e) => {
            error!("Health check failed: {:#}", e);
            Err(api_error(
                Status::ServiceUnavailable,
                "Database is unavailable".to_string(),
                "DATABASE_ERROR",
                &["Check the database path and permissions"],
            ))
        }
    }
}
