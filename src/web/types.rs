// src/web/types.rs

use rocket::http::{ContentType, Status};
use rocket::response::status::Custom;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::{Request, Response};

use crate::analysis::AnalysisResult;
use crate::service::AnalysisSource;

pub type ApiError = Custom<Json<StandardErrorResponse>>;

pub struct MarkdownResponse {
    pub body: String,
    pub filename: Option<String>,
}

impl MarkdownResponse {
    pub fn with_filename(body: String, filename: String) -> Self {
        Self {
            body,
            filename: Some(filename),
        }
    }
}

impl<'r> Responder<'r, 'static> for MarkdownResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut binding = Response::build();
        let mut response = binding
            .header(ContentType::new("text", "markdown"))
            .sized_body(self.body.len(), std::io::Cursor::new(self.body));

        if let Some(filename) = self.filename {
            response = response.raw_header(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", filename),
            );
        }

        response.ok()
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

/// Analysis of one interview session
#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SessionAnalysisData {
    pub session_id: String,
    pub candidate_name: String,
    pub position: String,
    pub source: AnalysisSource,
    pub analysis: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

/// Result of a direct analysis request
#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DirectAnalysisData {
    pub analysis: AnalysisResult,
    pub report: String,
}

impl TextResponse {
    pub fn success(message: String) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

/// Error envelope with an HTTP status attached
pub fn api_error(status: Status, error: String, error_code: &str, suggestions: &[&str]) -> ApiError {
    Custom(
        status,
        Json(StandardErrorResponse::new(
            error,
            error_code.to_string(),
            suggestions.iter().map(|s| s.to_string()).collect(),
        )),
    )
}
