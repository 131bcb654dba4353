//! Time-bounded visual and audio effects driven by edge events.
//!
//! Every effect channel is an explicit `Idle -> Active -> Idle` machine owning
//! at most one [`ScopedTimer`]. Starting a channel that is already active
//! replaces its timer, so two expirations can never race each other.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::state::{
    celebration::{CelebrationValidator, duration_ms},
    edge::EdgeEvent,
    snapshot::{Snapshot, SoundChannel},
    timer::ScopedTimer,
};

/// Effect channels with their own countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectChannel {
    /// Red flash shown after a strike.
    StrikeFlash,
    /// Tension music.
    IntenseSound,
    /// Victory jingle.
    WinningSound,
}

/// Why an effect or celebration left its active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The countdown ran out.
    Expired,
    /// The host fired the `stop` sound cue.
    Stopped,
    /// The external winner index was reset.
    WinnerCleared,
    /// The host moved to another question.
    QuestionChanged,
    /// The celebrated team reached three strikes.
    Eliminated,
    /// Another lock-in took over.
    Preempted,
    /// The display session was torn down.
    Cancelled,
}

/// Instruction for display surfaces produced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCue {
    /// A channel started or restarted its countdown.
    EffectStarted {
        /// Channel started.
        channel: EffectChannel,
        /// Team the strike flash belongs to.
        team: Option<usize>,
        /// Countdown length.
        duration_ms: u64,
        /// A running countdown was replaced.
        restarted: bool,
    },
    /// A channel went idle.
    EffectEnded {
        /// Channel stopped.
        channel: EffectChannel,
        /// Why it stopped.
        reason: EndReason,
    },
    /// A lock-in celebration started.
    CelebrationStarted {
        /// Celebrated team.
        team: usize,
        /// Another team was already eliminated.
        steal: bool,
        /// Celebration length.
        duration_ms: u64,
    },
    /// The celebration left the screen.
    CelebrationEnded {
        /// Team that was celebrated.
        team: usize,
        /// Why it ended.
        reason: EndReason,
    },
}

/// Configured length of every timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDurations {
    /// Strike flash length, 2000 ms by default.
    pub strike_flash: Duration,
    /// Intense music length, 10000 ms by default.
    pub intense_sound: Duration,
    /// Winning jingle length, 6000 ms by default.
    pub winning_sound: Duration,
}

impl Default for EffectDurations {
    fn default() -> Self {
        Self {
            strike_flash: Duration::from_millis(2_000),
            intense_sound: Duration::from_millis(10_000),
            winning_sound: Duration::from_millis(6_000),
        }
    }
}

impl EffectDurations {
    fn of(&self, channel: EffectChannel) -> Duration {
        match channel {
            EffectChannel::StrikeFlash => self.strike_flash,
            EffectChannel::IntenseSound => self.intense_sound,
            EffectChannel::WinningSound => self.winning_sound,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum EffectState {
    #[default]
    Idle,
    Active {
        team: Option<usize>,
        timer: ScopedTimer,
    },
}

/// Read-only view of what is currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectsView {
    /// Channels with a running countdown.
    pub active: Vec<EffectChannel>,
    /// Team of the running strike flash.
    pub strike_team: Option<usize>,
    /// Team being celebrated.
    pub celebrating: Option<usize>,
    /// Externally designated winner, celebrated or not.
    pub winner: Option<usize>,
}

/// Owns every effect timer of a display session, including the celebration.
#[derive(Debug)]
pub struct EffectOrchestrator {
    durations: EffectDurations,
    strike_flash: EffectState,
    intense: EffectState,
    winning: EffectState,
    celebration: CelebrationValidator,
}

impl EffectOrchestrator {
    /// Create an orchestrator with every channel idle.
    pub fn new(durations: EffectDurations) -> Self {
        Self {
            durations,
            strike_flash: EffectState::Idle,
            intense: EffectState::Idle,
            winning: EffectState::Idle,
            celebration: CelebrationValidator::new(),
        }
    }

    /// Whether `channel` is currently active.
    pub fn is_active(&self, channel: EffectChannel) -> bool {
        matches!(self.slot(channel), EffectState::Active { .. })
    }

    /// Team currently celebrated, if any.
    pub fn celebrating(&self) -> Option<usize> {
        self.celebration.celebrating()
    }

    /// Snapshot of the active effects for late-joining displays.
    pub fn view(&self) -> EffectsView {
        let active = [
            EffectChannel::StrikeFlash,
            EffectChannel::IntenseSound,
            EffectChannel::WinningSound,
        ]
        .into_iter()
        .filter(|channel| self.is_active(*channel))
        .collect();
        let strike_team = match self.strike_flash {
            EffectState::Active { team, .. } => team,
            EffectState::Idle => None,
        };

        EffectsView {
            active,
            strike_team,
            celebrating: self.celebration.celebrating(),
            winner: self.celebration.winner(),
        }
    }

    /// Earliest pending expiry across all channels.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.strike_flash, &self.intense, &self.winning]
            .into_iter()
            .filter_map(|state| match state {
                EffectState::Active { timer, .. } => Some(timer.deadline()),
                EffectState::Idle => None,
            })
            .chain(self.celebration.deadline())
            .min()
    }

    /// Turn edge events into effect transitions.
    ///
    /// A question change stops every running channel before the remaining
    /// edges are applied.
    pub fn apply_edges(&mut self, edges: &[EdgeEvent], now: Instant) -> Vec<DisplayCue> {
        let mut cues = Vec::new();
        if edges
            .iter()
            .any(|edge| matches!(edge, EdgeEvent::QuestionChanged { .. }))
        {
            cues.extend(self.stop_all(EndReason::QuestionChanged));
        }
        for edge in edges {
            match edge {
                EdgeEvent::StrikeIncreased { team, .. } => {
                    cues.push(self.start(EffectChannel::StrikeFlash, Some(*team), now));
                }
                EdgeEvent::SoundCueFired(SoundChannel::Intense) => {
                    cues.push(self.start(EffectChannel::IntenseSound, None, now));
                }
                EdgeEvent::SoundCueFired(SoundChannel::Winning) => {
                    cues.push(self.start(EffectChannel::WinningSound, None, now));
                }
                EdgeEvent::SoundCueFired(SoundChannel::Stop) => {
                    cues.extend(self.stop(EffectChannel::IntenseSound, EndReason::Stopped));
                    cues.extend(self.stop(EffectChannel::WinningSound, EndReason::Stopped));
                }
                EdgeEvent::ScoreChanged { .. }
                | EdgeEvent::AnswersRevealed(_)
                | EdgeEvent::QuestionChanged { .. }
                | EdgeEvent::StatusChanged { .. } => {}
            }
        }
        cues
    }

    /// Feed strikes and question index of a fresh snapshot to the celebration gate.
    pub fn sync_snapshot(&mut self, snapshot: &Snapshot) -> Vec<DisplayCue> {
        self.celebration.on_snapshot(snapshot)
    }

    /// Feed the externally designated winner to the celebration gate.
    pub fn set_winner(&mut self, winner: Option<usize>, now: Instant) -> Vec<DisplayCue> {
        self.celebration.on_winner(winner, now)
    }

    /// Expire every timer due at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<DisplayCue> {
        let mut cues = Vec::new();
        for channel in [
            EffectChannel::StrikeFlash,
            EffectChannel::IntenseSound,
            EffectChannel::WinningSound,
        ] {
            let slot = self.slot_mut(channel);
            if let EffectState::Active { timer, .. } = *slot {
                if timer.is_due(now) {
                    *slot = EffectState::Idle;
                    cues.push(DisplayCue::EffectEnded {
                        channel,
                        reason: EndReason::Expired,
                    });
                }
            }
        }
        cues.extend(self.celebration.expire(now));
        cues
    }

    /// Cancel every outstanding timer, effects first, then the celebration.
    pub fn cancel_all(&mut self) -> Vec<DisplayCue> {
        let mut cues = self.stop_all(EndReason::Cancelled);
        cues.extend(self.celebration.force_idle(EndReason::Cancelled));
        cues
    }

    fn stop_all(&mut self, reason: EndReason) -> Vec<DisplayCue> {
        [
            EffectChannel::StrikeFlash,
            EffectChannel::IntenseSound,
            EffectChannel::WinningSound,
        ]
        .into_iter()
        .filter_map(|channel| self.stop(channel, reason))
        .collect()
    }

    fn start(&mut self, channel: EffectChannel, team: Option<usize>, now: Instant) -> DisplayCue {
        let duration = self.durations.of(channel);
        let previous = std::mem::replace(
            self.slot_mut(channel),
            EffectState::Active {
                team,
                timer: ScopedTimer::start(now, duration),
            },
        );
        let restarted = matches!(previous, EffectState::Active { .. });
        if restarted {
            debug!(?channel, "restarting active effect");
        }

        DisplayCue::EffectStarted {
            channel,
            team,
            duration_ms: duration_ms(duration),
            restarted,
        }
    }

    fn stop(&mut self, channel: EffectChannel, reason: EndReason) -> Option<DisplayCue> {
        match std::mem::take(self.slot_mut(channel)) {
            EffectState::Active { .. } => Some(DisplayCue::EffectEnded { channel, reason }),
            EffectState::Idle => None,
        }
    }

    fn slot(&self, channel: EffectChannel) -> &EffectState {
        match channel {
            EffectChannel::StrikeFlash => &self.strike_flash,
            EffectChannel::IntenseSound => &self.intense,
            EffectChannel::WinningSound => &self.winning,
        }
    }

    fn slot_mut(&mut self, channel: EffectChannel) -> &mut EffectState {
        match channel {
            EffectChannel::StrikeFlash => &mut self.strike_flash,
            EffectChannel::IntenseSound => &mut self.intense,
            EffectChannel::WinningSound => &mut self.winning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::celebration::CELEBRATION_DURATION;

    fn orchestrator() -> EffectOrchestrator {
        EffectOrchestrator::new(EffectDurations::default())
    }

    fn strike(team: usize, strikes: u8) -> EdgeEvent {
        EdgeEvent::StrikeIncreased { team, strikes }
    }

    #[test]
    fn strike_flash_runs_for_two_seconds() {
        let mut fx = orchestrator();
        let t0 = Instant::now();

        let cues = fx.apply_edges(&[strike(2, 1)], t0);
        assert_eq!(
            cues,
            vec![DisplayCue::EffectStarted {
                channel: EffectChannel::StrikeFlash,
                team: Some(2),
                duration_ms: 2_000,
                restarted: false,
            }]
        );
        assert!(fx.is_active(EffectChannel::StrikeFlash));
        assert_eq!(fx.next_deadline(), Some(t0 + Duration::from_millis(2_000)));

        assert!(fx.expire(t0 + Duration::from_millis(1_999)).is_empty());
        assert_eq!(
            fx.expire(t0 + Duration::from_millis(2_000)),
            vec![DisplayCue::EffectEnded {
                channel: EffectChannel::StrikeFlash,
                reason: EndReason::Expired,
            }]
        );
        assert!(!fx.is_active(EffectChannel::StrikeFlash));
        assert_eq!(fx.next_deadline(), None);
    }

    #[test]
    fn restarting_a_channel_replaces_its_timer() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(&[strike(0, 1)], t0);

        let t1 = t0 + Duration::from_millis(1_500);
        let cues = fx.apply_edges(&[strike(1, 1)], t1);
        assert!(matches!(
            cues.as_slice(),
            [DisplayCue::EffectStarted { team: Some(1), restarted: true, .. }]
        ));

        // The first countdown no longer exists.
        assert!(fx.expire(t0 + Duration::from_millis(2_000)).is_empty());
        assert_eq!(fx.expire(t1 + Duration::from_millis(2_000)).len(), 1);
    }

    #[test]
    fn stop_cue_silences_both_sound_channels() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(
            &[
                EdgeEvent::SoundCueFired(SoundChannel::Intense),
                EdgeEvent::SoundCueFired(SoundChannel::Winning),
            ],
            t0,
        );
        assert!(fx.is_active(EffectChannel::IntenseSound));
        assert!(fx.is_active(EffectChannel::WinningSound));

        let cues = fx.apply_edges(&[EdgeEvent::SoundCueFired(SoundChannel::Stop)], t0);
        assert_eq!(cues.len(), 2);
        assert!(cues.iter().all(|cue| matches!(
            cue,
            DisplayCue::EffectEnded {
                reason: EndReason::Stopped,
                ..
            }
        )));
        assert_eq!(fx.next_deadline(), None);
    }

    #[test]
    fn stop_cue_with_nothing_playing_is_silent() {
        let mut fx = orchestrator();
        assert!(
            fx.apply_edges(&[EdgeEvent::SoundCueFired(SoundChannel::Stop)], Instant::now())
                .is_empty()
        );
    }

    #[test]
    fn question_change_stops_running_effects_first() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(
            &[strike(0, 1), EdgeEvent::SoundCueFired(SoundChannel::Intense)],
            t0,
        );

        let t1 = t0 + Duration::from_millis(500);
        let cues = fx.apply_edges(
            &[EdgeEvent::QuestionChanged { from: 0, to: 1 }, strike(2, 1)],
            t1,
        );
        assert_eq!(
            cues,
            vec![
                DisplayCue::EffectEnded {
                    channel: EffectChannel::StrikeFlash,
                    reason: EndReason::QuestionChanged,
                },
                DisplayCue::EffectEnded {
                    channel: EffectChannel::IntenseSound,
                    reason: EndReason::QuestionChanged,
                },
                DisplayCue::EffectStarted {
                    channel: EffectChannel::StrikeFlash,
                    team: Some(2),
                    duration_ms: 2_000,
                    restarted: false,
                },
            ]
        );
        assert!(!fx.is_active(EffectChannel::IntenseSound));
        assert_eq!(fx.next_deadline(), Some(t1 + Duration::from_millis(2_000)));
    }

    #[test]
    fn next_deadline_is_the_earliest_timer() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(&[EdgeEvent::SoundCueFired(SoundChannel::Intense)], t0);
        fx.set_winner(Some(0), t0);

        assert_eq!(fx.next_deadline(), Some(t0 + CELEBRATION_DURATION));
        fx.apply_edges(&[strike(1, 1)], t0);
        assert_eq!(fx.next_deadline(), Some(t0 + Duration::from_millis(2_000)));
    }

    #[test]
    fn cancel_all_leaves_nothing_armed() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(
            &[strike(0, 1), EdgeEvent::SoundCueFired(SoundChannel::Winning)],
            t0,
        );
        fx.set_winner(Some(3), t0);

        let cues = fx.cancel_all();
        assert_eq!(cues.len(), 3);
        assert_eq!(
            cues.last(),
            Some(&DisplayCue::CelebrationEnded {
                team: 3,
                reason: EndReason::Cancelled,
            })
        );
        assert_eq!(fx.next_deadline(), None);
        assert!(fx.expire(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn view_reports_active_channels() {
        let mut fx = orchestrator();
        let t0 = Instant::now();
        fx.apply_edges(&[strike(4, 2)], t0);
        fx.set_winner(Some(1), t0);

        assert_eq!(
            fx.view(),
            EffectsView {
                active: vec![EffectChannel::StrikeFlash],
                strike_team: Some(4),
                celebrating: Some(1),
                winner: Some(1),
            }
        );
    }
}
