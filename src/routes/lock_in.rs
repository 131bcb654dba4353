use axum::{Json, Router, extract::State, http::StatusCode, routing::put};
use validator::Validate;

use crate::{
    dto::lock_in::{LockInRequest, LockInResponse},
    error::AppError,
    services::lock_in_service,
    state::SharedState,
};

/// Designate the winning team, or clear the designation with `null`.
pub async fn lock_in(
    State(state): State<SharedState>,
    Json(request): Json<LockInRequest>,
) -> Result<(StatusCode, Json<LockInResponse>), AppError> {
    request.validate()?;
    let response = lock_in_service::lock_in(&state, request.winner);
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Configure the lock-in route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/lock-in", put(lock_in))
}
