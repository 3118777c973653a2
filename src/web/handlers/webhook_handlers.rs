// src/web/handlers/webhook_handlers.rs
use rocket::http::Status;
use rocket::serde::json::{Json, Value};
use rocket::State;
use tracing::{error, info, warn};

use crate::service::{AnalysisService, WebhookAck};
use crate::vendor::WebhookEvent;
use crate::web::types::*;
use crate::web::webhook_auth::VerifiedWebhook;

pub async fn vapi_webhook_handler(
    _verified: VerifiedWebhook,
    payload: Json<Value>,
    service: &State<AnalysisService>,
) -> Result<Json<DataResponse<WebhookAck>>, ApiError> {
    let event = WebhookEvent::from_payload(payload.into_inner()).map_err(|e| {
        warn!("Rejected webhook payload: {:#}", e);
        api_error(
            Status::BadRequest,
            format!("{:#}", e),
            "INVALID_WEBHOOK",
            &["Send the vendor envelope with a `type` field"],
        )
    })?;

    info!(
        "Webhook {:?} for call {}",
        event.kind,
        event.call_id.as_deref().unwrap_or("<none>")
    );

    // A failure here makes the vendor redeliver
    let ack = service.handle_webhook(event).await.map_err(|e| {
        error!("Webhook processing failed: {:#}", e);
        api_error(
            Status::InternalServerError,
            "Failed to process webhook".to_string(),
            "DATABASE_ERROR",
            &["The delivery can be retried safely"],
        )
    })?;

    Ok(Json(DataResponse::success(
        "Webhook received".to_string(),
        ack,
    )))
}
