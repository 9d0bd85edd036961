use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use ringline_core::{DialStatusEvent, GatherEvent, InitiateEvent, RecordingStatusEvent};
use ringline_ivr::{IvrEngine, IvrReply};
use ringline_storage::CallStore;

/// Shared application state for the route handlers.
pub struct AppState {
    pub engine: Arc<IvrEngine>,
    pub store: Arc<dyn CallStore>,
}

/// Build the Axum router with webhook and API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/twilio/voice", post(voice))
        .route("/twilio/gather", post(gather))
        .route("/twilio/call-status", post(call_status))
        .route("/twilio/recording-status", post(recording_status))
        .route("/api/calls", get(list_calls))
        .route("/api/health", get(health))
        .with_state(state)
}

async fn root() -> &'static str {
    "IVR server is running"
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ringline",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Event A: inbound call start.
async fn voice(
    State(state): State<Arc<AppState>>,
    Form(event): Form<InitiateEvent>,
) -> Response {
    xml_response(state.engine.handle_initiate(event).await)
}

/// Event B: menu digit gathered.
async fn gather(
    State(state): State<Arc<AppState>>,
    Form(event): Form<GatherEvent>,
) -> Response {
    xml_response(state.engine.handle_gather(event).await)
}

/// Event C: parent-call or dialed-leg status callback.
async fn call_status(
    State(state): State<Arc<AppState>>,
    Form(event): Form<DialStatusEvent>,
) -> Response {
    xml_response(state.engine.handle_dial_status(event).await)
}

/// Event D: voicemail recording status callback.
async fn recording_status(
    State(state): State<Arc<AppState>>,
    Form(event): Form<RecordingStatusEvent>,
) -> Response {
    xml_response(state.engine.handle_recording_status(event).await)
}

/// Activity feed: all call records, newest first.
async fn list_calls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.store.list_all().await {
        Ok(calls) => Ok(Json(json!(calls))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch call logs");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching call logs" })),
            ))
        }
    }
}

/// Render an engine reply as a voice-markup HTTP response. The carrier must
/// always receive a document, so even error replies carry a body.
fn xml_response(reply: IvrReply) -> Response {
    let status = if reply.is_error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (
        status,
        [(header::CONTENT_TYPE, "text/xml")],
        reply.twiml.to_xml(),
    )
        .into_response()
}
