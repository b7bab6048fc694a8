//! JSON conversation API.
//!
//! - `POST /api/v1/conversations/{id}/open`          welcome directives
//! - `POST /api/v1/conversations/{id}/turns`         handle one recognized turn
//! - `GET  /api/v1/conversations/{id}/reservations`  reservations made in the conversation

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;
use watchfinder_core::dialog::{RecognizedTurn, ResponseDirective};
use watchfinder_core::errors::{ApplicationError, InterfaceError};
use watchfinder_core::router::RouterDecision;
use watchfinder_core::selection::ReservationEntry;
use watchfinder_core::session::{ConversationId, ConversationPhase};
use watchfinder_slack::{error_message, render_directives, MessageTemplate};

use crate::conversation::{ConversationReply, ConversationService};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    service: Arc<ConversationService>,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub conversation_id: String,
    pub correlation_id: String,
    pub phase: ConversationPhase,
    pub decision: Option<RouterDecision>,
    pub directives: Vec<ResponseDirective>,
    pub messages: Vec<MessageTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl TurnResponse {
    fn from_reply(reply: ConversationReply, correlation_id: String) -> Self {
        let messages = render_directives(&reply.directives);
        Self {
            conversation_id: reply.conversation_id.0,
            correlation_id,
            phase: reply.phase,
            decision: reply.decision,
            directives: reply.directives,
            messages,
            error: reply.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationsResponse {
    pub conversation_id: String,
    pub reservations: Vec<ReservationEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub correlation_id: String,
    pub messages: Vec<MessageTemplate>,
}

pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = self.0.user_message();
        let correlation_id = self.0.correlation_id().to_string();
        let body = ErrorBody {
            error,
            messages: vec![error_message(error, &correlation_id)],
            correlation_id,
        };
        (status, Json(body)).into_response()
    }
}

fn api_error(error: ApplicationError, correlation_id: &str) -> ApiError {
    error!(
        event_name = "api.request_failed",
        correlation_id = %correlation_id,
        error = %error,
        "conversation request failed"
    );
    ApiError(error.into_interface(correlation_id))
}

pub fn router(service: Arc<ConversationService>) -> Router {
    Router::new()
        .route("/api/v1/conversations/{id}/open", post(open_conversation))
        .route("/api/v1/conversations/{id}/turns", post(post_turn))
        .route("/api/v1/conversations/{id}/reservations", get(list_reservations))
        .with_state(ApiState { service })
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn open_conversation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let conversation_id = ConversationId(id);
    info!(
        event_name = "api.conversation_opened",
        correlation_id = %correlation_id,
        conversation_id = %conversation_id,
        "conversation opened"
    );

    let reply = state
        .service
        .open(&conversation_id)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;
    Ok(Json(TurnResponse::from_reply(reply, correlation_id)))
}

async fn post_turn(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(turn): Json<RecognizedTurn>,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let conversation_id = ConversationId(id);
    info!(
        event_name = "api.turn_received",
        correlation_id = %correlation_id,
        conversation_id = %conversation_id,
        intent = turn.intent.as_str(),
        "turn received"
    );

    let reply = state
        .service
        .handle_turn(&conversation_id, &turn, &correlation_id)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;
    Ok(Json(TurnResponse::from_reply(reply, correlation_id)))
}

async fn list_reservations(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReservationsResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let conversation_id = ConversationId(id);

    let reservations = state
        .service
        .reservations(&conversation_id)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;
    Ok(Json(ReservationsResponse { conversation_id: conversation_id.0, reservations }))
}
