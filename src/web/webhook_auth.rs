// src/web/webhook_auth.rs
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use tracing::warn;

use crate::utils::constant_time_eq;

pub const SECRET_HEADER: &str = "x-vapi-secret";

/// Shared secret the vendor sends with every webhook delivery
pub struct WebhookConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAuthError {
    MissingSecret,
    InvalidSecret,
    NotConfigured,
}

impl WebhookConfig {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// No configured secret accepts every delivery
    pub fn verify(&self, provided: Option<&str>) -> Result<(), WebhookAuthError> {
        let Some(expected) = self.secret.as_deref() else {
            return Ok(());
        };
        match provided {
            None => Err(WebhookAuthError::MissingSecret),
            Some(provided) if constant_time_eq(provided, expected) => Ok(()),
            Some(_) => Err(WebhookAuthError::InvalidSecret),
        }
    }
}

/// Request guard for webhook routes
pub struct VerifiedWebhook;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VerifiedWebhook {
    type Error = WebhookAuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<WebhookConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => {
                return Outcome::Error((status, WebhookAuthError::NotConfigured))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        match config.verify(req.headers().get_one(SECRET_HEADER)) {
            Ok(()) => Outcome::Success(VerifiedWebhook),
            Err(e) => {
                warn!("Rejected webhook delivery: {:?}", e);
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}
