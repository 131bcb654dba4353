use tokio::time::timeout;
use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `degraded` while no store is installed, while the last poll failed,
/// or when the store does not answer a direct probe.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.game_store().await else {
        return HealthResponse::degraded();
    };

    let limit = state.config().polling.fetch_timeout;
    match timeout(limit, store.health_check()).await {
        Ok(Ok(())) if !state.is_degraded() => HealthResponse::ok(),
        Ok(Ok(())) => HealthResponse::degraded(),
        Ok(Err(err)) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
        Err(_) => {
            warn!(?limit, "storage health check timed out");
            HealthResponse::degraded()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState,
    };

    #[tokio::test]
    async fn no_store_is_degraded() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");
    }

    #[tokio::test]
    async fn reachable_store_after_good_poll_is_ok() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;
        state.update_degraded(false);
        assert_eq!(health_status(&state).await.status, "ok");

        store.fail_next(1);
        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
