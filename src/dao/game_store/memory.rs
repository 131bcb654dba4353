//! In-process store used by tests and local rehearsals.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::BoxFuture;
use indexmap::IndexSet;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameRecord, SoundCueRecord},
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Inner {
    games: HashMap<Uuid, GameRecord>,
    revealed: HashMap<Uuid, IndexSet<String>>,
    failures_left: usize,
    revealed_failures_left: usize,
    game_reads: usize,
    cue_reads: usize,
    revealed_reads: usize,
}

/// Store keeping game rows in memory, with injectable read failures.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row of `game_id`.
    pub fn put_game(&self, game_id: Uuid, record: GameRecord) {
        self.lock().games.insert(game_id, record);
    }

    /// Mutate the row of `game_id` in place, creating a default row if needed.
    pub fn update_game(&self, game_id: Uuid, update: impl FnOnce(&mut GameRecord)) {
        update(self.lock().games.entry(game_id).or_default());
    }

    /// Replace the revealed answer ids of `game_id`.
    pub fn set_revealed<I, S>(&self, game_id: Uuid, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .revealed
            .insert(game_id, ids.into_iter().map(Into::into).collect());
    }

    /// Make the next `count` reads fail as if the store were unreachable.
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_left = count;
    }

    /// Make the next `count` revealed-answer reads fail, leaving other reads alone.
    pub fn fail_revealed_next(&self, count: usize) {
        self.lock().revealed_failures_left = count;
    }

    /// Number of full game reads served so far.
    pub fn game_reads(&self) -> usize {
        self.lock().game_reads
    }

    /// Number of sound-cue reads served so far.
    pub fn cue_reads(&self) -> usize {
        self.lock().cue_reads
    }

    /// Number of revealed-answer reads served so far.
    pub fn revealed_reads(&self) -> usize {
        self.lock().revealed_reads
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, read: impl FnOnce(&mut Inner) -> T) -> StorageResult<T> {
        let mut inner = self.lock();
        if inner.failures_left > 0 {
            inner.failures_left -= 1;
            return Err(injected_failure());
        }
        Ok(read(&mut inner))
    }
}

impl GameStore for MemoryGameStore {
    fn fetch_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let result = self.read(|inner| {
            inner.game_reads += 1;
            inner.games.get(&game_id).cloned()
        });
        Box::pin(async move { result })
    }

    fn fetch_sound_cues(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SoundCueRecord>>> {
        let result = self.read(|inner| {
            inner.cue_reads += 1;
            inner.games.get(&game_id).map(|game| SoundCueRecord {
                play_intense_sound_at: game.play_intense_sound_at.clone(),
                play_winning_sound_at: game.play_winning_sound_at.clone(),
                stop_sounds_at: game.stop_sounds_at.clone(),
            })
        });
        Box::pin(async move { result })
    }

    fn fetch_revealed_answers(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<IndexSet<String>>> {
        let result = self.read(|inner| {
            inner.revealed_reads += 1;
            if inner.revealed_failures_left > 0 {
                inner.revealed_failures_left -= 1;
                return Err(injected_failure());
            }
            Ok(inner.revealed.get(&game_id).cloned().unwrap_or_default())
        });
        let result = result.and_then(|revealed| revealed);
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.read(|_| ());
        Box::pin(async move { result })
    }
}

fn injected_failure() -> StorageError {
    StorageError::unavailable(
        "memory store offline".into(),
        io::Error::new(io::ErrorKind::NotConnected, "injected failure"),
    )
}
