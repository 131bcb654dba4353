use serde::Serialize;

use crate::state::{
    effects::{DisplayCue, EffectChannel, EndReason},
    snapshot::{GameStatus, SoundChannel},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name; `None` sends a default message event.
    pub event: Option<String>,
    /// JSON payload written to the `data:` field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (always `public`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the store is currently failing.
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
/// Broadcast when the service enters or leaves degraded mode.
pub struct SystemStatus {
    /// `true` while store reads fail.
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
/// Broadcast when a team's score moved.
pub struct ScoreChangedEvent {
    /// Zero-based team index.
    pub team: usize,
    /// Score before the change.
    pub from: u32,
    /// Score after the change.
    pub to: u32,
}

#[derive(Debug, Serialize)]
/// Broadcast once per observed strike increase.
pub struct StrikeIncreasedEvent {
    /// Zero-based team index.
    pub team: usize,
    /// Strike count after the increase.
    pub strikes: u8,
}

#[derive(Debug, Serialize)]
/// Answer ids revealed since the previous poll, in store order.
pub struct AnswersRevealedEvent {
    /// Newly revealed ids only.
    pub answer_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
/// Broadcast when the host fires a sound cue with a new token.
pub struct SoundCueEvent {
    /// Channel whose token changed.
    pub channel: SoundChannel,
}

#[derive(Debug, Serialize)]
/// Broadcast when the host moves to another question.
pub struct QuestionChangedEvent {
    /// Previous question index.
    pub from: u32,
    /// Current question index.
    pub to: u32,
}

#[derive(Debug, Serialize)]
/// Broadcast when the game status changes.
pub struct StatusChangedEvent {
    /// Previous status.
    pub from: GameStatus,
    /// Current status.
    pub to: GameStatus,
}

#[derive(Debug, Serialize)]
/// An effect countdown started, or restarted over a running one.
pub struct EffectStartedEvent {
    /// Effect channel being started.
    pub channel: EffectChannel,
    /// Team the effect belongs to, for strike flashes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<usize>,
    /// Countdown length in milliseconds.
    pub duration_ms: u64,
    /// Whether a running countdown on the same channel was replaced.
    pub restarted: bool,
}

#[derive(Debug, Serialize)]
/// Broadcast when an effect channel goes idle.
pub struct EffectEndedEvent {
    /// Channel that went idle.
    pub channel: EffectChannel,
    /// Why it ended.
    pub reason: EndReason,
}

#[derive(Debug, Serialize)]
/// Broadcast when a lock-in celebration starts.
pub struct CelebrationStartedEvent {
    /// Celebrated team.
    pub team: usize,
    /// Another team was already eliminated when this one locked in.
    pub steal: bool,
    /// Celebration length in milliseconds.
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
/// Broadcast when a celebration leaves the screen.
pub struct CelebrationEndedEvent {
    /// Team that was celebrated.
    pub team: usize,
    /// Why it ended.
    pub reason: EndReason,
}

/// Event name and payload of a display cue.
pub enum DisplayCueEvent {
    /// `effect.started`
    EffectStarted(EffectStartedEvent),
    /// `effect.ended`
    EffectEnded(EffectEndedEvent),
    /// `celebration.started`
    CelebrationStarted(CelebrationStartedEvent),
    /// `celebration.ended`
    CelebrationEnded(CelebrationEndedEvent),
}

impl From<&DisplayCue> for DisplayCueEvent {
    fn from(cue: &DisplayCue) -> Self {
        match *cue {
            DisplayCue::EffectStarted {
                channel,
                team,
                duration_ms,
                restarted,
            } => Self::EffectStarted(EffectStartedEvent {
                channel,
                team,
                duration_ms,
                restarted,
            }),
            DisplayCue::EffectEnded { channel, reason } => {
                Self::EffectEnded(EffectEndedEvent { channel, reason })
            }
            DisplayCue::CelebrationStarted {
                team,
                steal,
                duration_ms,
            } => Self::CelebrationStarted(CelebrationStartedEvent {
                team,
                steal,
                duration_ms,
            }),
            DisplayCue::CelebrationEnded { team, reason } => {
                Self::CelebrationEnded(CelebrationEndedEvent { team, reason })
            }
        }
    }
}
