/// In-memory store.
pub mod memory;
/// PostgREST store.
#[cfg(feature = "rest-store")]
pub mod rest;

use futures::future::BoxFuture;
use indexmap::IndexSet;
use uuid::Uuid;

use crate::dao::{
    models::{GameRecord, SoundCueRecord},
    storage::StorageResult,
};

/// Read-only access to the remote store holding the live game.
///
/// Implementations never write: every mutation belongs to the host console.
pub trait GameStore: Send + Sync {
    /// Full game row, `None` when the game does not exist.
    fn fetch_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// Only the cue-token columns of the game row.
    fn fetch_sound_cues(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SoundCueRecord>>>;
    /// Ids of the answers revealed so far, in store order.
    fn fetch_revealed_answers(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<IndexSet<String>>>;
    /// Cheap probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
