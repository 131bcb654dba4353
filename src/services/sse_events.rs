use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        buzzer::ButtonsPayload,
        snapshot::SnapshotPayload,
        sse::{
            AnswersRevealedEvent, DisplayCueEvent, QuestionChangedEvent, ScoreChangedEvent,
            ServerEvent, SoundCueEvent, StatusChangedEvent, StrikeIncreasedEvent, SystemStatus,
        },
    },
    serial::link::LinkStatus,
    state::{
        SharedState, buttons::ButtonBoard, edge::EdgeEvent, effects::DisplayCue,
        snapshot::Snapshot,
    },
};

const EVENT_SCORE_CHANGED: &str = "score.changed";
const EVENT_STRIKE_INCREASED: &str = "strike.increased";
const EVENT_ANSWERS_REVEALED: &str = "answers.revealed";
const EVENT_SOUND_CUE: &str = "sound.cue";
const EVENT_QUESTION_CHANGED: &str = "question.changed";
const EVENT_STATUS_CHANGED: &str = "status.changed";
const EVENT_EFFECT_STARTED: &str = "effect.started";
const EVENT_EFFECT_ENDED: &str = "effect.ended";
const EVENT_CELEBRATION_STARTED: &str = "celebration.started";
const EVENT_CELEBRATION_ENDED: &str = "celebration.ended";
const EVENT_SNAPSHOT: &str = "snapshot";
const EVENT_BUZZERS: &str = "buzzers.state";
const EVENT_BUZZER_LINK: &str = "buzzers.link";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast every edge detected in one poll cycle, in detection order.
pub fn broadcast_edges(state: &SharedState, edges: &[EdgeEvent]) {
    for edge in edges {
        match edge {
            EdgeEvent::ScoreChanged { team, from, to } => send_public_event(
                state,
                EVENT_SCORE_CHANGED,
                &ScoreChangedEvent {
                    team: *team,
                    from: *from,
                    to: *to,
                },
            ),
            EdgeEvent::StrikeIncreased { team, strikes } => send_public_event(
                state,
                EVENT_STRIKE_INCREASED,
                &StrikeIncreasedEvent {
                    team: *team,
                    strikes: *strikes,
                },
            ),
            EdgeEvent::AnswersRevealed(ids) => send_public_event(
                state,
                EVENT_ANSWERS_REVEALED,
                &AnswersRevealedEvent {
                    answer_ids: ids.iter().cloned().collect(),
                },
            ),
            EdgeEvent::SoundCueFired(channel) => send_public_event(
                state,
                EVENT_SOUND_CUE,
                &SoundCueEvent { channel: *channel },
            ),
            EdgeEvent::QuestionChanged { from, to } => send_public_event(
                state,
                EVENT_QUESTION_CHANGED,
                &QuestionChangedEvent {
                    from: *from,
                    to: *to,
                },
            ),
            EdgeEvent::StatusChanged { from, to } => send_public_event(
                state,
                EVENT_STATUS_CHANGED,
                &StatusChangedEvent {
                    from: *from,
                    to: *to,
                },
            ),
        }
    }
}

/// Broadcast effect and celebration transitions.
pub fn broadcast_display_cues(state: &SharedState, cues: &[DisplayCue]) {
    for cue in cues {
        match DisplayCueEvent::from(cue) {
            DisplayCueEvent::EffectStarted(payload) => {
                send_public_event(state, EVENT_EFFECT_STARTED, &payload)
            }
            DisplayCueEvent::EffectEnded(payload) => {
                send_public_event(state, EVENT_EFFECT_ENDED, &payload)
            }
            DisplayCueEvent::CelebrationStarted(payload) => {
                send_public_event(state, EVENT_CELEBRATION_STARTED, &payload)
            }
            DisplayCueEvent::CelebrationEnded(payload) => {
                send_public_event(state, EVENT_CELEBRATION_ENDED, &payload)
            }
        }
    }
}

/// Broadcast the snapshot accepted by the last successful poll.
pub fn broadcast_snapshot(state: &SharedState, snapshot: &Snapshot) {
    let payload = SnapshotPayload::from(snapshot.clone());
    send_public_event(state, EVENT_SNAPSHOT, &payload);
}

/// Broadcast the live button vector.
pub fn broadcast_buttons(state: &SharedState, board: &ButtonBoard) {
    send_public_event(state, EVENT_BUZZERS, &ButtonsPayload::from(board));
}

/// Broadcast a serial link status change.
pub fn broadcast_link_status(state: &SharedState, status: &LinkStatus) {
    send_public_event(state, EVENT_BUZZER_LINK, status);
}

/// Broadcast a degraded mode transition.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
