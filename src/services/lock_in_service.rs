use tracing::info;

use crate::{dto::lock_in::LockInResponse, state::SharedState};

/// Record the externally designated winner; the display session reacts to it.
pub fn lock_in(state: &SharedState, winner: Option<usize>) -> LockInResponse {
    let previous = state.set_winner(winner);
    if previous != winner {
        info!(?previous, ?winner, "winner designation changed");
    }
    LockInResponse { winner, previous }
}
