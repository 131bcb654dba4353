use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::snapshot::{SnapshotPayload, SnapshotResponse},
    state::SharedState,
};

/// Last good snapshot and the effects currently on screen.
pub async fn current_snapshot(State(state): State<SharedState>) -> Json<SnapshotResponse> {
    let snapshot = state.latest_snapshot().await.map(SnapshotPayload::from);
    Json(SnapshotResponse {
        snapshot,
        effects: state.effects(),
        winner: state.winner(),
        degraded: state.is_degraded(),
    })
}

/// Configure the snapshot route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/snapshot", get(current_snapshot))
}
