//! REST handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PulseError, ValidationError};
use crate::event::ApprovedDecision;

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Acknowledgement body.
#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub scenario: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub feedback: Value,
    #[serde(default)]
    pub decision: Value,
}

#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub decision: Value,
}

fn missing(field: &str) -> ApiError {
    PulseError::from(ValidationError::MissingField {
        field: field.to_string(),
    })
    .into()
}

/// `POST /api/simulate`
pub async fn simulate(
    State(state): State<AppState>,
    body: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let scenario = body
        .ok()
        .and_then(|Json(req)| req.scenario)
        .ok_or_else(|| missing("scenario"))?;
    state.dashboard.simulate(&scenario);
    Ok(Ack::new(format!("Simulation for {scenario} started.")))
}

/// `POST /api/feedback`
pub async fn feedback(Json(req): Json<FeedbackRequest>) -> Json<Ack> {
    tracing::info!(feedback = %req.feedback, decision = %req.decision, "feedback received");
    Ack::new("Feedback received.")
}

/// `POST /api/approve_decision`
pub async fn approve_decision(
    State(state): State<AppState>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let decision = match body {
        Ok(Json(ApproveRequest { decision: Value::Null })) => return Err(missing("decision")),
        Ok(Json(ApproveRequest { decision })) => ApprovedDecision::new(decision),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable approval body");
            return Err(missing("decision"));
        }
    };
    state.dashboard.approve(decision)?;
    Ok(Ack::new("Decision approved and executed."))
}

/// `GET /api/metrics`: the last snapshot, `{}` before the first tick.
pub async fn metrics(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let body = match state.dashboard.latest_metrics() {
        Some(snapshot) => serde_json::to_value(snapshot).map_err(PulseError::from)?,
        None => json!({}),
    };
    Ok(Json(body))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "subscribers": state.dashboard.broker().subscription_count(),
        "ingested": state.dashboard.ingestion.ingested_count(),
    }))
}
