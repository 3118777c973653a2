// src/web/mod.rs

pub mod handlers;
pub mod types;
pub mod webhook_auth;

pub use types::*;
pub use webhook_auth::{VerifiedWebhook, WebhookConfig};

use anyhow::Result;
use rocket::serde::json::{Json, Value};
use rocket::{catchers, get, post, routes, Build, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

use crate::analysis::AnalysisRequest;
use crate::core::{ConfigManager, Database};
use crate::service::{AnalysisService, WebhookAck};
use crate::vendor::VendorClient;

#[post("/webhooks/vapi", data = "<payload>")]
pub async fn vapi_webhook(
    verified: VerifiedWebhook,
    payload: Json<Value>,
    service: &State<AnalysisService>,
) -> Result<Json<DataResponse<WebhookAck>>, ApiError> {
    handlers::vapi_webhook_handler(verified, payload, service).await
}

#[get("/interviews/<session_id>/analysis")]
pub async fn get_analysis(
    session_id: &str,
    service: &State<AnalysisService>,
) -> Result<Json<DataResponse<SessionAnalysisData>>, ApiError> {
    handlers::get_analysis_handler(session_id, service).await
}

#[get("/interviews/<session_id>/report")]
pub async fn get_report(
    session_id: &str,
    service: &State<AnalysisService>,
) -> Result<MarkdownResponse, ApiError> {
    handlers::get_report_handler(session_id, service).await
}

#[post("/analysis", data = "<request>")]
pub async fn analyze(
    request: Json<AnalysisRequest>,
    service: &State<AnalysisService>,
) -> Json<DataResponse<DirectAnalysisData>> {
    handlers::analyze_handler(request, service).await
}

#[get("/health")]
pub async fn health(service: &State<AnalysisService>) -> Result<Json<TextResponse>, ApiError> {
    handlers::health_handler(service).await
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Webhook secret missing or invalid".to_string(),
        "UNAUTHORIZED".to_string(),
        vec![format!(
            "Send the shared secret in the {} header",
            webhook_auth::SECRET_HEADER
        )],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be parsed".to_string(),
        "BAD_REQUEST".to_string(),
        vec!["Send a JSON object body".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Mount the API and its state on a Rocket instance
pub fn mount_api(
    rocket: Rocket<Build>,
    service: AnalysisService,
    webhook_config: WebhookConfig,
) -> Rocket<Build> {
    rocket
        .manage(service)
        .manage(webhook_config)
        .register(
            "/api",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![vapi_webhook, get_analysis, get_report, analyze, health],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    let database = match Database::new(&config.environment.database_path).await {
        Ok(database) => Arc::new(database),
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return Err(e);
        }
    };

    let vendor_client = Arc::new(VendorClient::new(&config.vendor)?);
    let service = AnalysisService::new(database, vendor_client);
    let webhook_config = WebhookConfig::new(config.vendor.webhook_secret.clone());

    info!("Starting interview analysis API server");
    info!("Database: {}", config.environment.database_path.display());
    info!(
        "Server: http://{}:{}",
        config.server.address, config.server.port
    );

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    mount_api(rocket::custom(figment), service, webhook_config)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server failed: {}", e))?;

    Ok(())
}
