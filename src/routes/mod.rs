use axum::Router;

use crate::state::SharedState;

/// `/buzzers` routes.
pub mod buzzers;
/// `/healthcheck`.
pub mod health;
/// `/lock-in`.
pub mod lock_in;
/// `/snapshot`.
pub mod snapshot;
/// `/sse/public`.
pub mod sse;

/// Compose all route trees and wire in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(snapshot::router())
        .merge(buzzers::router())
        .merge(lock_in::router())
        .with_state(state)
}
