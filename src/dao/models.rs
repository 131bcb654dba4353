//! Raw records exchanged with the remote store and their validated conversions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::state::snapshot::{GameStatus, MAX_TEAMS, Snapshot, SoundCues, TeamStanding};

/// Record validation failures at the store boundary.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A field is outside its allowed range.
    #[error("game record failed validation: {0}")]
    Invalid(#[from] ValidationErrors),
    /// A numeric field does not fit the domain type.
    #[error("game record field `{field}` out of range")]
    Overflow {
        /// Store column name.
        field: &'static str,
    },
}

/// Game status as spelled by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatusRecord {
    /// `waiting`
    #[default]
    Waiting,
    /// `playing`
    Playing,
    /// `paused`
    Paused,
    /// `finished`
    Finished,
}

impl From<GameStatusRecord> for GameStatus {
    fn from(value: GameStatusRecord) -> Self {
        match value {
            GameStatusRecord::Waiting => GameStatus::Waiting,
            GameStatusRecord::Playing => GameStatus::Playing,
            GameStatusRecord::Paused => GameStatus::Paused,
            GameStatusRecord::Finished => GameStatus::Finished,
        }
    }
}

/// Opaque identifier the store may send as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OpaqueId {
    /// JSON string.
    Text(String),
    /// JSON number, rendered with its original digits.
    Number(serde_json::Number),
}

impl From<OpaqueId> for String {
    fn from(value: OpaqueId) -> Self {
        match value {
            OpaqueId::Text(text) => text,
            OpaqueId::Number(number) => number.to_string(),
        }
    }
}

/// Flat game row as returned by the store.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct GameRecord {
    /// Score of team 1.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub team1_score: i64,
    /// Score of team 2.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub team2_score: i64,
    /// Score of team 3.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub team3_score: i64,
    /// Score of team 4.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub team4_score: i64,
    /// Score of team 5.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub team5_score: i64,
    /// Strikes of team 1.
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub team1_strikes: i64,
    /// Strikes of team 2.
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub team2_strikes: i64,
    /// Strikes of team 3.
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub team3_strikes: i64,
    /// Strikes of team 4.
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub team4_strikes: i64,
    /// Strikes of team 5.
    #[serde(default)]
    #[validate(range(min = 0, max = 3))]
    pub team5_strikes: i64,
    /// Lifecycle status.
    #[serde(default)]
    pub game_status: GameStatusRecord,
    /// Zero-based index of the current question.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub current_question_index: i64,
    /// Intense music cue token.
    #[serde(default)]
    pub play_intense_sound_at: Option<OpaqueId>,
    /// Winning jingle cue token.
    #[serde(default)]
    pub play_winning_sound_at: Option<OpaqueId>,
    /// Stop cue token.
    #[serde(default)]
    pub stop_sounds_at: Option<OpaqueId>,
}

impl TryFrom<GameRecord> for Snapshot {
    type Error = SnapshotError;

    fn try_from(record: GameRecord) -> Result<Self, Self::Error> {
        record.validate()?;

        let scores = [
            ("team1_score", record.team1_score),
            ("team2_score", record.team2_score),
            ("team3_score", record.team3_score),
            ("team4_score", record.team4_score),
            ("team5_score", record.team5_score),
        ];
        let strikes = [
            ("team1_strikes", record.team1_strikes),
            ("team2_strikes", record.team2_strikes),
            ("team3_strikes", record.team3_strikes),
            ("team4_strikes", record.team4_strikes),
            ("team5_strikes", record.team5_strikes),
        ];

        let mut teams = [TeamStanding::default(); MAX_TEAMS];
        for (team, ((score_field, score), (strike_field, strike))) in
            teams.iter_mut().zip(scores.into_iter().zip(strikes))
        {
            team.score = u32::try_from(score)
                .map_err(|_| SnapshotError::Overflow { field: score_field })?;
            team.strikes = u8::try_from(strike)
                .map_err(|_| SnapshotError::Overflow { field: strike_field })?;
        }

        let question_index = u32::try_from(record.current_question_index).map_err(|_| {
            SnapshotError::Overflow {
                field: "current_question_index",
            }
        })?;

        Ok(Snapshot {
            teams,
            status: record.game_status.into(),
            question_index,
            cues: SoundCues {
                intense: record.play_intense_sound_at.map(Into::into),
                winning: record.play_winning_sound_at.map(Into::into),
                stop: record.stop_sounds_at.map(Into::into),
            },
        })
    }
}

/// Cue-token columns only, read by the fast sound poll.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SoundCueRecord {
    /// Intense music cue token.
    #[serde(default)]
    pub play_intense_sound_at: Option<OpaqueId>,
    /// Winning jingle cue token.
    #[serde(default)]
    pub play_winning_sound_at: Option<OpaqueId>,
    /// Stop cue token.
    #[serde(default)]
    pub stop_sounds_at: Option<OpaqueId>,
}

impl From<SoundCueRecord> for SoundCues {
    fn from(record: SoundCueRecord) -> Self {
        Self {
            intense: record.play_intense_sound_at.map(Into::into),
            winning: record.play_winning_sound_at.map(Into::into),
            stop: record.stop_sounds_at.map(Into::into),
        }
    }
}

/// One revealed answer row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevealedAnswerRecord {
    /// Id of the revealed answer.
    pub answer_id: OpaqueId,
}

/// Collect revealed answer rows into an ordered id set.
pub fn revealed_ids(rows: Vec<RevealedAnswerRecord>) -> IndexSet<String> {
    rows.into_iter().map(|row| row.answer_id.into()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_converts_into_snapshot() {
        let record: GameRecord = serde_json::from_value(json!({
            "team1_score": 120,
            "team2_score": 45,
            "team1_strikes": 1,
            "team3_strikes": 3,
            "game_status": "playing",
            "current_question_index": 2,
            "play_intense_sound_at": "2024-05-01T20:00:00Z",
            "stop_sounds_at": 1714593600123u64,
            "extra_column": "ignored"
        }))
        .unwrap();

        let snapshot = Snapshot::try_from(record).unwrap();
        assert_eq!(snapshot.teams[0], TeamStanding { score: 120, strikes: 1 });
        assert_eq!(snapshot.teams[1].score, 45);
        assert!(snapshot.teams[2].is_eliminated());
        assert_eq!(snapshot.status, GameStatus::Playing);
        assert_eq!(snapshot.question_index, 2);
        assert_eq!(snapshot.cues.intense.as_deref(), Some("2024-05-01T20:00:00Z"));
        assert_eq!(snapshot.cues.winning, None);
        assert_eq!(snapshot.cues.stop.as_deref(), Some("1714593600123"));
    }

    #[test]
    fn out_of_range_strikes_are_rejected() {
        let record = GameRecord {
            team2_strikes: 4,
            ..GameRecord::default()
        };
        assert!(matches!(
            Snapshot::try_from(record),
            Err(SnapshotError::Invalid(_))
        ));
    }

    #[test]
    fn negative_score_is_rejected() {
        let record = GameRecord {
            team5_score: -10,
            ..GameRecord::default()
        };
        assert!(Snapshot::try_from(record).is_err());
    }

    #[test]
    fn unknown_status_fails_to_decode() {
        let decoded = serde_json::from_value::<GameRecord>(json!({ "game_status": "lobby" }));
        assert!(decoded.is_err());
    }

    #[test]
    fn revealed_rows_keep_order_and_dedupe() {
        let rows: Vec<RevealedAnswerRecord> = serde_json::from_value(json!([
            { "answer_id": "b" },
            { "answer_id": 7 },
            { "answer_id": "b" }
        ]))
        .unwrap();

        let ids: Vec<_> = revealed_ids(rows).into_iter().collect();
        assert_eq!(ids, vec!["b".to_string(), "7".to_string()]);
    }
}
