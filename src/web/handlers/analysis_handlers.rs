// src/web/handlers/analysis_handlers.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

use crate::analysis::{AnalysisRequest, SummaryReportRenderer};
use crate::service::{AnalysisService, AnalysisSource, ServiceError};
use crate::web::types::*;

pub async fn get_analysis_handler(
    session_id: &str,
    service: &State<AnalysisService>,
) -> Result<Json<DataResponse<SessionAnalysisData>>, ApiError> {
    let outcome = service
        .get_or_compute(session_id)
        .await
        .map_err(service_error_response)?;

    let message = match (&outcome.save_error, outcome.source) {
        (Some(_), _) => "Analysis computed but could not be saved".to_string(),
        (None, source) => format!("Analysis {}", source_label(source)),
    };

    info!(
        "Served analysis for session {} ({:?})",
        session_id, outcome.source
    );

    Ok(Json(DataResponse::success(
        message,
        SessionAnalysisData {
            session_id: outcome.session.id,
            candidate_name: outcome.session.candidate_name,
            position: outcome.session.position,
            source: outcome.source,
            analysis: outcome.result,
            save_error: outcome.save_error,
        },
    )))
}

pub async fn get_report_handler(
    session_id: &str,
    service: &State<AnalysisService>,
) -> Result<MarkdownResponse, ApiError> {
    let report = service
        .render_report(session_id)
        .await
        .map_err(service_error_response)?;

    Ok(MarkdownResponse::with_filename(
        report,
        format!("interview-{}.md", session_id),
    ))
}

pub async fn analyze_handler(
    request: Json<AnalysisRequest>,
    service: &State<AnalysisService>,
) -> Json<DataResponse<DirectAnalysisData>> {
    let request = request.into_inner();
    let candidate_name = request.candidate_name.clone();
    let position = request.position.clone();

    let analysis = service.analyze_fragments(request);
    let report = SummaryReportRenderer::render(&analysis, &candidate_name, &position);

    Json(DataResponse::success(
        format!("Analysis complete: {}/100", analysis.overall_score),
        DirectAnalysisData { analysis, report },
    ))
}

fn source_label(source: AnalysisSource) -> &'static str {
    match source {
        AnalysisSource::Stored => "loaded from storage",
        AnalysisSource::Computed => "computed from vendor call",
    }
}

pub(crate) fn service_error_response(err: ServiceError) -> ApiError {
    match &err {
        ServiceError::SessionNotFound(_) => api_error(
            Status::NotFound,
            err.to_string(),
            "SESSION_NOT_FOUND",
            &["Check the interview session id"],
        ),
        ServiceError::NoCallLinked(_) => api_error(
            Status::Conflict,
            err.to_string(),
            "NO_CALL_LINKED",
            &["Link a vendor call to the session before requesting analysis"],
        ),
        ServiceError::CallNotFinished { .. } => api_error(
            Status::Conflict,
            err.to_string(),
            "CALL_NOT_FINISHED",
            &["Retry once the call has ended"],
        ),
        ServiceError::Vendor(_) => {
            warn!("{}", err);
            api_error(
                Status::BadGateway,
                err.to_string(),
                "VENDOR_ERROR",
                &[
                    "Try again in a few moments",
                    "Verify the vendor API key and call id",
                ],
            )
        }
        ServiceError::Database(_) => {
            error!("{}", err);
            api_error(
                Status::InternalServerError,
                "Failed to access interview storage".to_string(),
                "DATABASE_ERROR",
                &["Try again in a few moments"],
            )
        }
    }
}
