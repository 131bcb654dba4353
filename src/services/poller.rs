use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use indexmap::IndexSet;
use thiserror::Error;
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::SnapshotError,
        storage::{StorageError, StorageResult},
    },
    state::snapshot::{Snapshot, SoundCues},
};

/// Default upper bound on a single store read.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(1_500);

/// Why a poll cycle produced nothing. Every variant is transient.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The store did not answer in time.
    #[error("store read timed out after {0:?}")]
    Timeout(Duration),
    /// The game row does not exist.
    #[error("game `{0}` not found")]
    NotFound(Uuid),
    /// The game row failed validation.
    #[error(transparent)]
    Invalid(#[from] SnapshotError),
}

/// Reads one game through a [`GameStore`], bounding every call with a timeout.
#[derive(Clone)]
pub struct SnapshotPoller {
    store: Arc<dyn GameStore>,
    game_id: Uuid,
    fetch_timeout: Duration,
}

impl SnapshotPoller {
    /// Poll `game_id` through `store`, giving each read `fetch_timeout`.
    pub fn new(store: Arc<dyn GameStore>, game_id: Uuid, fetch_timeout: Duration) -> Self {
        Self {
            store,
            game_id,
            fetch_timeout,
        }
    }

    /// Game followed by this poller.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Read and validate the full game record.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let record = self
            .bounded(self.store.fetch_game(self.game_id))
            .await?
            .ok_or(FetchError::NotFound(self.game_id))?;
        Ok(Snapshot::try_from(record)?)
    }

    /// Read only the three cue-token columns.
    pub async fn fetch_sound_cues(&self) -> Result<SoundCues, FetchError> {
        let record = self
            .bounded(self.store.fetch_sound_cues(self.game_id))
            .await?
            .ok_or(FetchError::NotFound(self.game_id))?;
        Ok(record.into())
    }

    /// Read the ids of every answer revealed so far.
    pub async fn fetch_revealed(&self) -> Result<IndexSet<String>, FetchError> {
        self.bounded(self.store.fetch_revealed_answers(self.game_id))
            .await
    }

    async fn bounded<T>(&self, read: BoxFuture<'static, StorageResult<T>>) -> Result<T, FetchError> {
        timeout(self.fetch_timeout, read)
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))?
            .map_err(FetchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{game_store::memory::MemoryGameStore, models::GameRecord};

    fn poller(store: &MemoryGameStore, game_id: Uuid) -> SnapshotPoller {
        SnapshotPoller::new(Arc::new(store.clone()), game_id, DEFAULT_FETCH_TIMEOUT)
    }

    #[tokio::test]
    async fn missing_game_is_reported() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        let err = poller(&store, game_id).fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(id) if id == game_id));
    }

    #[tokio::test]
    async fn invalid_record_is_rejected() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        store.put_game(
            game_id,
            GameRecord {
                team1_strikes: 7,
                ..GameRecord::default()
            },
        );
        let err = poller(&store, game_id).fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, FetchError::Invalid(_)));
    }

    #[tokio::test]
    async fn storage_failure_is_transient() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        store.put_game(game_id, GameRecord::default());
        store.fail_next(1);

        let poller = poller(&store, game_id);
        assert!(matches!(
            poller.fetch_snapshot().await,
            Err(FetchError::Storage(_))
        ));
        assert!(poller.fetch_snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn cue_columns_are_read_separately() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        store.update_game(game_id, |game| {
            game.play_winning_sound_at = Some(crate::dao::models::OpaqueId::Text("t1".into()));
        });

        let cues = poller(&store, game_id).fetch_sound_cues().await.unwrap();
        assert_eq!(cues.winning.as_deref(), Some("t1"));
        assert_eq!(store.cue_reads(), 1);
        assert_eq!(store.game_reads(), 0);
    }
}
