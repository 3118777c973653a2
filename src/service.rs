// src/service.rs
//! Orchestrates the webhook push and on-demand pull paths around the
//! normalizer and the session store.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisInput, AnalysisNormalizer, AnalysisRequest, AnalysisResult, RawFragments,
    SummaryReportRenderer,
};
use crate::core::{Database, InterviewSession};
use crate::vendor::{CallSource, EventKind, WebhookEvent};

#[derive(Debug)]
pub enum ServiceError {
    SessionNotFound(String),
    NoCallLinked(String),
    CallNotFinished { call_id: String, status: String },
    Vendor(anyhow::Error),
    Database(anyhow::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::SessionNotFound(id) => write!(f, "Interview session not found: {}", id),
            ServiceError::NoCallLinked(id) => {
                write!(f, "Interview session {} has no vendor call linked", id)
            }
            ServiceError::CallNotFinished { call_id, status } => {
                write!(f, "Call {} has not ended yet (status: {})", call_id, status)
            }
            ServiceError::Vendor(e) => write!(f, "Vendor request failed: {:#}", e),
            ServiceError::Database(e) => write!(f, "Database error: {:#}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Stored,
    Computed,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub session: InterviewSession,
    pub result: AnalysisResult,
    pub source: AnalysisSource,
    /// Set when the result was computed but could not be persisted
    pub save_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookAck {
    Ignored { reason: String },
    UnknownCall { call_id: Option<String> },
    StatusUpdated { session_id: String, status: String },
    Analyzed { session_id: String, overall_score: u32 },
}

pub struct AnalysisService {
    database: Arc<Database>,
    source: Arc<dyn CallSource>,
}

impl AnalysisService {
    pub fn new(database: Arc<Database>, source: Arc<dyn CallSource>) -> Self {
        Self { database, source }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Handle one webhook delivery. Deliveries may repeat; every path is
    /// safe to run again.
    pub async fn handle_webhook(&self, event: WebhookEvent) -> anyhow::Result<WebhookAck> {
        match &event.kind {
            EventKind::Other(kind) => {
                info!("Ignoring webhook event: {}", kind);
                Ok(WebhookAck::Ignored {
                    reason: format!("unhandled event type {}", kind),
                })
            }
            EventKind::StatusUpdate => {
                let Some(status) = event.session_status() else {
                    return Ok(WebhookAck::Ignored {
                        reason: format!(
                            "status {} does not change the session",
                            event.status.as_deref().unwrap_or("unknown")
                        ),
                    });
                };
                let Some(session) = self.resolve_session(&event).await? else {
                    return Ok(unknown_call(&event));
                };

                self.database
                    .sessions()
                    .update_status(&session.id, status)
                    .await?;

                Ok(WebhookAck::StatusUpdated {
                    session_id: session.id,
                    status: status.to_string(),
                })
            }
            EventKind::EndOfCallReport => {
                let Some(session) = self.resolve_session(&event).await? else {
                    return Ok(unknown_call(&event));
                };

                let repo = self.database.sessions();
                repo.record_call_artifacts(&session.id, &event.report.artifacts())
                    .await?;

                let result = analyze_session(&session, &event.report.fragments());
                repo.apply_analysis(&session.id, &result).await?;

                Ok(WebhookAck::Analyzed {
                    session_id: session.id,
                    overall_score: result.overall_score,
                })
            }
        }
    }

    /// Find the session a webhook refers to, linking the call on first sight
    /// when the dialer tagged it with a session id.
    async fn resolve_session(
        &self,
        event: &WebhookEvent,
    ) -> anyhow::Result<Option<InterviewSession>> {
        let Some(call_id) = event.call_id.as_deref() else {
            return Ok(None);
        };

        let repo = self.database.sessions();
        if let Some(session) = repo.find_by_vendor_call_id(call_id).await? {
            return Ok(Some(session));
        }

        let Some(session_id) = event.session_id.as_deref() else {
            return Ok(None);
        };
        let Some(mut session) = repo.find_by_id(session_id).await? else {
            return Ok(None);
        };

        repo.attach_call(&session.id, call_id).await?;
        session.vendor_call_id = Some(call_id.to_string());
        Ok(Some(session))
    }

    /// Stored analysis when there is one, otherwise pull the call from the
    /// vendor, analyze and persist it.
    pub async fn get_or_compute(&self, session_id: &str) -> Result<AnalysisOutcome, ServiceError> {
        let repo = self.database.sessions();
        let session = repo
            .find_by_id(session_id)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::SessionNotFound(session_id.to_string()))?;

        if let Some(result) = repo
            .load_analysis(session_id)
            .await
            .map_err(ServiceError::Database)?
        {
            return Ok(AnalysisOutcome {
                session,
                result,
                source: AnalysisSource::Stored,
                save_error: None,
            });
        }

        let call_id = session
            .vendor_call_id
            .clone()
            .ok_or_else(|| ServiceError::NoCallLinked(session_id.to_string()))?;

        let call = self
            .source
            .fetch_call(&call_id)
            .await
            .map_err(ServiceError::Vendor)?;

        if let Some(status) = call.status.as_deref().filter(|s| *s != "ended") {
            return Err(ServiceError::CallNotFinished {
                call_id,
                status: status.to_string(),
            });
        }

        let report = call.report();
        let mut fragments = report.fragments();
        if fragments.transcript.is_none() {
            fragments.transcript = session.transcript.clone();
        }
        if fragments.duration_minutes.is_none() {
            fragments.duration_minutes = session
                .duration_minutes
                .and_then(|minutes| u32::try_from(minutes).ok());
        }
        let result = analyze_session(&session, &fragments);

        let saved = async {
            repo.record_call_artifacts(&session.id, &report.artifacts())
                .await?;
            repo.apply_analysis(&session.id, &result).await
        }
        .await;

        let save_error = match saved {
            Ok(()) => None,
            Err(e) => {
                warn!("Analysis for session {} computed but not saved: {:#}", session.id, e);
                Some(format!("{:#}", e))
            }
        };

        Ok(AnalysisOutcome {
            session,
            result,
            source: AnalysisSource::Computed,
            save_error,
        })
    }

    /// Analyze and persist explicit fragments for an existing session
    pub async fn apply_fragments(
        &self,
        session_id: &str,
        fragments: &RawFragments,
    ) -> Result<AnalysisResult, ServiceError> {
        let repo = self.database.sessions();
        let session = repo
            .find_by_id(session_id)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::SessionNotFound(session_id.to_string()))?;

        let result = analyze_session(&session, fragments);
        repo.apply_analysis(&session.id, &result)
            .await
            .map_err(ServiceError::Database)?;
        Ok(result)
    }

    /// Direct analysis of explicit fragments, nothing persisted
    pub fn analyze_fragments(&self, request: AnalysisRequest) -> AnalysisResult {
        AnalysisNormalizer::analyze(&request.into_input())
    }

    pub async fn render_report(&self, session_id: &str) -> Result<String, ServiceError> {
        let outcome = self.get_or_compute(session_id).await?;
        Ok(SummaryReportRenderer::render(
            &outcome.result,
            &outcome.session.candidate_name,
            &outcome.session.position,
        ))
    }
}

fn analyze_session(session: &InterviewSession, fragments: &RawFragments) -> AnalysisResult {
    let input = AnalysisInput::from_raw(
        session.candidate_name.clone(),
        session.position.clone(),
        fragments,
    );
    AnalysisNormalizer::analyze(&input)
}

fn unknown_call(event: &WebhookEvent) -> WebhookAck {
    warn!(
        "Webhook for unknown call {}",
        event.call_id.as_deref().unwrap_or("<none>")
    );
    WebhookAck::UnknownCall {
        call_id: event.call_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HiringRecommendation;
    use crate::core::{CallArtifacts, SessionStatus};
    use crate::vendor::VendorCall;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        call: serde_json::Value,
        fetches: AtomicUsize,
    }

    #[rocket::async_trait]
    impl CallSource for StubSource {
        async fn fetch_call(&self, call_id: &str) -> anyhow::Result<VendorCall> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if call_id == "missing-call" {
                anyhow::bail!("Vendor API returned error 404 Not Found");
            }
            Ok(serde_json::from_value(self.call.clone())?)
        }
    }

    async fn service_with(call: serde_json::Value) -> (AnalysisService, Arc<StubSource>) {
        let database = Arc::new(Database::in_memory().await.unwrap());
        let source = Arc::new(StubSource {
            call,
            fetches: AtomicUsize::new(0),
        });
        (AnalysisService::new(database, source.clone()), source)
    }

    fn ended_call() -> serde_json::Value {
        json!({
            "id": "call-7",
            "status": "ended",
            "startedAt": "2024-05-01T10:00:00Z",
            "endedAt": "2024-05-01T10:20:00Z",
            "artifact": {"transcript": "Interviewer: Tell me about Rust. Candidate: I like it."},
            "analysis": {"structuredData": {"overallScore": 82}}
        })
    }

    #[tokio::test]
    async fn test_get_or_compute_pulls_once_then_serves_stored() {
        let (service, source) = service_with(ended_call()).await;
        let repo = service.database().sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();
        repo.attach_call(&session.id, "call-7").await.unwrap();

        let first = service.get_or_compute(&session.id).await.unwrap();
        assert_eq!(first.source, AnalysisSource::Computed);
        assert_eq!(first.result.overall_score, 82);
        assert_eq!(first.result.hiring_recommendation, HiringRecommendation::Yes);
        assert!(first.save_error.is_none());

        let second = service.get_or_compute(&session.id).await.unwrap();
        assert_eq!(second.source, AnalysisSource::Stored);
        assert_eq!(second.result, first.result);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        let stored = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.duration_minutes, Some(20));
        assert_eq!(stored.status().unwrap(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_get_or_compute_falls_back_to_stored_artifacts() {
        let (service, _) = service_with(json!({"id": "call-9", "status": "ended"})).await;
        let repo = service.database().sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();

        // 10 turns of 19 words over one minute
        let turn = vec!["word"; 18].join(" ");
        let transcript: String = (0..10)
            .map(|i| {
                let speaker = if i % 2 == 0 { "Interviewer:" } else { "Candidate:" };
                format!("{} {}. ", speaker, turn)
            })
            .collect();
        repo.record_call_artifacts(
            &session.id,
            &CallArtifacts {
                transcript: Some(transcript),
                duration_minutes: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.attach_call(&session.id, "call-9").await.unwrap();

        let outcome = service.get_or_compute(&session.id).await.unwrap();
        let flow = &outcome.result.interview_flow;
        assert_eq!(flow.engagement, 100);
        assert_eq!(flow.clarity, 100);
        assert_eq!(flow.completeness, 100);

        let stored = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.duration_minutes, Some(1));
    }

    #[tokio::test]
    async fn test_get_or_compute_errors() {
        let (service, _) = service_with(json!({"id": "call-8", "status": "in-progress"})).await;
        let repo = service.database().sessions();

        assert!(matches!(
            service.get_or_compute("nope").await,
            Err(ServiceError::SessionNotFound(_))
        ));

        let session = repo.create_session("Ada", "Engineer").await.unwrap();
        assert!(matches!(
            service.get_or_compute(&session.id).await,
            Err(ServiceError::NoCallLinked(_))
        ));

        repo.attach_call(&session.id, "call-8").await.unwrap();
        assert!(matches!(
            service.get_or_compute(&session.id).await,
            Err(ServiceError::CallNotFinished { .. })
        ));

        repo.attach_call(&session.id, "missing-call").await.unwrap();
        assert!(matches!(
            service.get_or_compute(&session.id).await,
            Err(ServiceError::Vendor(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_end_of_call_links_and_analyzes() {
        let (service, source) = service_with(json!({})).await;
        let repo = service.database().sessions();
        let session = repo.create_session("Grace", "Admiral").await.unwrap();

        let payload = json!({
            "message": {
                "type": "end-of-call-report",
                "call": {"id": "call-9", "metadata": {"sessionId": session.id}},
                "artifact": {"transcript": "Candidate: Ready."},
                "analysis": {"successEvaluation": true}
            }
        });

        for _ in 0..2 {
            let event = WebhookEvent::from_payload(payload.clone()).unwrap();
            let ack = service.handle_webhook(event).await.unwrap();
            assert_eq!(
                ack,
                WebhookAck::Analyzed {
                    session_id: session.id.clone(),
                    overall_score: 0
                }
            );
        }

        let stored = repo.load_analysis(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.hiring_recommendation, HiringRecommendation::Yes);
        assert_eq!(
            repo.find_by_id(&session.id).await.unwrap().unwrap().vendor_call_id.as_deref(),
            Some("call-9")
        );
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_webhook_status_and_unknown_events() {
        let (service, _) = service_with(json!({})).await;
        let repo = service.database().sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();
        repo.attach_call(&session.id, "call-1").await.unwrap();

        let event = WebhookEvent::from_payload(json!({
            "type": "status-update", "status": "in-progress", "call": {"id": "call-1"}
        }))
        .unwrap();
        assert!(matches!(
            service.handle_webhook(event).await.unwrap(),
            WebhookAck::StatusUpdated { .. }
        ));
        let stored = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status().unwrap(), SessionStatus::InProgress);

        let stranger = WebhookEvent::from_payload(json!({
            "type": "end-of-call-report", "call": {"id": "call-unknown"}
        }))
        .unwrap();
        assert_eq!(
            service.handle_webhook(stranger).await.unwrap(),
            WebhookAck::UnknownCall {
                call_id: Some("call-unknown".to_string())
            }
        );

        let hang = WebhookEvent::from_payload(json!({"type": "hang"})).unwrap();
        assert!(matches!(
            service.handle_webhook(hang).await.unwrap(),
            WebhookAck::Ignored { .. }
        ));
    }

    #[tokio::test]
    async fn test_apply_fragments_and_report() {
        let (service, _) = service_with(json!({})).await;
        let session = service
            .database()
            .sessions()
            .create_session("Ada", "Engineer")
            .await
            .unwrap();

        let fragments: RawFragments = serde_json::from_value(json!({
            "structuredData": {"categoryScores": {"communication": 80, "technical": 60}}
        }))
        .unwrap();
        let result = service.apply_fragments(&session.id, &fragments).await.unwrap();
        assert_eq!(result.overall_score, 70);

        let report = service.render_report(&session.id).await.unwrap();
        assert!(report.contains("**Candidate:** Ada"));
        assert!(report.contains("## Overall Score: 70/100"));

        assert!(matches!(
            service.apply_fragments("nope", &fragments).await,
            Err(ServiceError::SessionNotFound(_))
        ));
    }
}
