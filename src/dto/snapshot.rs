use serde::Serialize;

use crate::state::{
    effects::EffectsView,
    snapshot::{GameStatus, Snapshot, SoundCues, TeamStanding},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Game state as last read from the store.
pub struct SnapshotPayload {
    /// Score and strikes of the five teams.
    pub teams: Vec<TeamStanding>,
    /// Game status.
    pub status: GameStatus,
    /// Zero-based index of the current question.
    pub question_index: u32,
    /// Last cue token per sound channel.
    pub sound_cues: SoundCues,
}

impl From<Snapshot> for SnapshotPayload {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            teams: snapshot.teams.to_vec(),
            status: snapshot.status,
            question_index: snapshot.question_index,
            sound_cues: snapshot.cues,
        }
    }
}

#[derive(Debug, Serialize)]
/// Everything a late-joining display needs to catch up.
pub struct SnapshotResponse {
    /// `None` until the first poll succeeds.
    pub snapshot: Option<SnapshotPayload>,
    /// Effects currently on screen.
    pub effects: EffectsView,
    /// Externally designated winner.
    pub winner: Option<usize>,
    /// Whether the last store read failed.
    pub degraded: bool,
}
