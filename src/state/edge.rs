use indexmap::IndexSet;
use tracing::debug;

use crate::state::snapshot::{GameStatus, Snapshot, SoundChannel, SoundCues};

/// Discrete change observed between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeEvent {
    /// A team's score moved (up or down).
    ScoreChanged {
        /// Zero-based team index.
        team: usize,
        /// Previous score.
        from: u32,
        /// Current score.
        to: u32,
    },
    /// A team received at least one more strike.
    StrikeIncreased {
        /// Zero-based team index.
        team: usize,
        /// Strike count after the increase.
        strikes: u8,
    },
    /// Answers revealed since the previous read, in reveal order.
    AnswersRevealed(IndexSet<String>),
    /// The host requested a sound on this channel.
    SoundCueFired(SoundChannel),
    /// The host moved to another question.
    QuestionChanged {
        /// Previous question index.
        from: u32,
        /// Current question index.
        to: u32,
    },
    /// The game status changed.
    StatusChanged {
        /// Previous status.
        from: GameStatus,
        /// Current status.
        to: GameStatus,
    },
}

/// Last-seen cue token per sound channel.
///
/// A token is recorded the moment it is observed, so a second poll returning
/// the same token can never re-fire the cue.
#[derive(Debug, Default)]
pub struct CueTracker {
    seen: Option<SoundCues>,
}

impl CueTracker {
    /// Record `incoming` and return the channels whose token changed.
    ///
    /// The first observation only establishes the baseline. A token cleared to
    /// null is recorded but does not fire.
    pub fn observe(&mut self, incoming: &SoundCues) -> Vec<SoundChannel> {
        let Some(seen) = self.seen.as_mut() else {
            self.seen = Some(incoming.clone());
            return Vec::new();
        };

        let mut fired = Vec::new();
        for channel in SoundChannel::ALL {
            let next = incoming.token(channel);
            if seen.token(channel) == next {
                continue;
            }
            seen.set_token(channel, next.map(str::to_owned));
            if next.is_some() {
                fired.push(channel);
            }
        }
        fired
    }
}

/// Diffs successive snapshots into [`EdgeEvent`]s.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    previous: Option<Snapshot>,
    cues: CueTracker,
    revealed: Option<IndexSet<String>>,
}

impl EdgeDetector {
    /// Create a detector with no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last snapshot accepted as baseline.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Compare `next` with the baseline, then make `next` the new baseline.
    ///
    /// Strike increases are left out while `strike_flash_active` is set; the
    /// new counts still become the baseline so they are not reported later.
    pub fn reconcile(&mut self, next: Snapshot, strike_flash_active: bool) -> Vec<EdgeEvent> {
        let Some(previous) = self.previous.take() else {
            self.cues.observe(&next.cues);
            self.previous = Some(next);
            return Vec::new();
        };

        let mut edges = Vec::new();

        if previous.question_index != next.question_index {
            edges.push(EdgeEvent::QuestionChanged {
                from: previous.question_index,
                to: next.question_index,
            });
        }

        if previous.status != next.status {
            edges.push(EdgeEvent::StatusChanged {
                from: previous.status,
                to: next.status,
            });
        }

        for (team, (before, after)) in previous.teams.iter().zip(next.teams.iter()).enumerate() {
            if before.score != after.score {
                edges.push(EdgeEvent::ScoreChanged {
                    team,
                    from: before.score,
                    to: after.score,
                });
            }
            if after.strikes > before.strikes {
                if strike_flash_active {
                    debug!(team, strikes = after.strikes, "strike flash active; edge absorbed");
                } else {
                    edges.push(EdgeEvent::StrikeIncreased {
                        team,
                        strikes: after.strikes,
                    });
                }
            }
        }

        edges.extend(
            self.cues
                .observe(&next.cues)
                .into_iter()
                .map(EdgeEvent::SoundCueFired),
        );

        self.previous = Some(next);
        edges
    }

    /// Diff cue tokens read by the fast sound poll.
    pub fn observe_cues(&mut self, cues: &SoundCues) -> Vec<EdgeEvent> {
        self.cues
            .observe(cues)
            .into_iter()
            .map(EdgeEvent::SoundCueFired)
            .collect()
    }

    /// Diff the revealed-answer set against the known one.
    ///
    /// The first read establishes the baseline. Known ids are only ever added
    /// to, across question changes too, so each id is reported at most once.
    pub fn observe_revealed(&mut self, revealed: IndexSet<String>) -> Option<EdgeEvent> {
        let Some(known) = self.revealed.as_mut() else {
            self.revealed = Some(revealed);
            return None;
        };

        let added: IndexSet<String> = revealed
            .iter()
            .filter(|id| !known.contains(*id))
            .cloned()
            .collect();
        known.extend(added.iter().cloned());

        (!added.is_empty()).then_some(EdgeEvent::AnswersRevealed(added))
    }

    /// Drop every baseline; the next snapshot is treated as the first one.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
