use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::buzzer::{ButtonStateResponse, ConnectRequest, DiagnosticLine},
    error::AppError,
    serial::link::LinkStatus,
    services::buzzer_service,
    state::SharedState,
};

/// Current button vector, last pressed index and link status.
pub async fn buttons(State(state): State<SharedState>) -> Json<ButtonStateResponse> {
    Json(buzzer_service::button_state(&state))
}

/// Last raw serial lines with capture timestamps.
pub async fn diagnostics(State(state): State<SharedState>) -> Json<Vec<DiagnosticLine>> {
    Json(buzzer_service::diagnostics(&state).await)
}

/// Open, or reopen, the buzzer serial link.
pub async fn connect(
    State(state): State<SharedState>,
    body: Option<Json<ConnectRequest>>,
) -> Result<Json<LinkStatus>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    request.validate()?;
    let status = buzzer_service::connect(&state, request).await?;
    Ok(Json(status))
}

/// Release the buzzer serial link.
pub async fn disconnect(State(state): State<SharedState>) -> Json<LinkStatus> {
    Json(buzzer_service::disconnect(&state).await)
}

/// Configure the buzzer routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/buzzers", get(buttons))
        .route("/buzzers/log", get(diagnostics))
        .route("/buzzers/connect", post(connect))
        .route("/buzzers/disconnect", post(disconnect))
}
