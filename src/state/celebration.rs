use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::state::{
    effects::{DisplayCue, EndReason},
    snapshot::{ELIMINATION_STRIKES, MAX_TEAMS, Snapshot},
    timer::ScopedTimer,
};

/// Length of a lock-in celebration, steals included.
pub const CELEBRATION_DURATION: Duration = Duration::from_millis(3_000);

/// Lock-in celebration state. At most one team celebrates at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CelebrationState {
    /// Nothing on screen.
    #[default]
    Idle,
    /// `team` locked in and is being celebrated until the timer expires.
    Celebrating {
        /// Celebrated team.
        team: usize,
        /// Countdown to the end of the celebration.
        timer: ScopedTimer,
    },
}

/// Gates celebrations on the externally reported winner and team strikes.
///
/// Only reachable through the effect orchestrator, which owns it together with
/// its timer.
#[derive(Debug)]
pub struct CelebrationValidator {
    state: CelebrationState,
    winner: Option<usize>,
    strikes: [u8; MAX_TEAMS],
    question: Option<u32>,
}

impl CelebrationValidator {
    pub(crate) fn new() -> Self {
        Self {
            state: CelebrationState::Idle,
            winner: None,
            strikes: [0; MAX_TEAMS],
            question: None,
        }
    }

    /// Team currently celebrated, if any.
    pub fn celebrating(&self) -> Option<usize> {
        match self.state {
            CelebrationState::Celebrating { team, .. } => Some(team),
            CelebrationState::Idle => None,
        }
    }

    /// Winner index last reported by the external source.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub(crate) fn state(&self) -> CelebrationState {
        self.state
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        match self.state {
            CelebrationState::Celebrating { timer, .. } => Some(timer.deadline()),
            CelebrationState::Idle => None,
        }
    }

    /// React to a new winner index from the external source.
    pub(crate) fn on_winner(&mut self, winner: Option<usize>, now: Instant) -> Vec<DisplayCue> {
        let previous = std::mem::replace(&mut self.winner, winner);
        match (previous, winner) {
            (_, None) => self.force_idle(EndReason::WinnerCleared).into_iter().collect(),
            (Some(before), Some(after)) if before == after => Vec::new(),
            (_, Some(team)) => self.request(team, now),
        }
    }

    /// Track strikes and question index from a fresh snapshot, clearing the
    /// celebration when the question moves on or the celebrated team is
    /// eliminated.
    pub(crate) fn on_snapshot(&mut self, snapshot: &Snapshot) -> Vec<DisplayCue> {
        self.strikes = snapshot.strikes();
        let mut cues = Vec::new();

        let question_changed = self
            .question
            .replace(snapshot.question_index)
            .is_some_and(|previous| previous != snapshot.question_index);
        if question_changed {
            cues.extend(self.force_idle(EndReason::QuestionChanged));
        }

        if let Some(team) = self.celebrating() {
            if self.strikes[team] >= ELIMINATION_STRIKES {
                info!(team, "celebrated team eliminated; clearing celebration");
                cues.extend(self.force_idle(EndReason::Eliminated));
            }
        }

        cues
    }

    /// Return to idle once the timer elapsed.
    pub(crate) fn expire(&mut self, now: Instant) -> Option<DisplayCue> {
        match self.state {
            CelebrationState::Celebrating { team, timer } if timer.is_due(now) => {
                self.state = CelebrationState::Idle;
                Some(DisplayCue::CelebrationEnded {
                    team,
                    reason: EndReason::Expired,
                })
            }
            _ => None,
        }
    }

    /// Leave the celebrating state early, dropping the pending timer first.
    pub(crate) fn force_idle(&mut self, reason: EndReason) -> Option<DisplayCue> {
        match std::mem::take(&mut self.state) {
            CelebrationState::Celebrating { team, .. } => {
                Some(DisplayCue::CelebrationEnded { team, reason })
            }
            CelebrationState::Idle => None,
        }
    }

    fn request(&mut self, team: usize, now: Instant) -> Vec<DisplayCue> {
        let Some(&strikes) = self.strikes.get(team) else {
            warn!(team, "winner index outside team range; ignoring");
            return Vec::new();
        };
        if strikes >= ELIMINATION_STRIKES {
            info!(team, strikes, "eliminated team reported as winner; not celebrating");
            return Vec::new();
        }

        let steal = self
            .strikes
            .iter()
            .enumerate()
            .any(|(other, &count)| other != team && count >= ELIMINATION_STRIKES);
        if steal {
            info!(team, "steal lock-in");
        }

        let mut cues = Vec::new();
        if let Some(previous) = self.celebrating() {
            info!(previous, team, "lock-in pre-empts running celebration");
            cues.extend(self.force_idle(EndReason::Preempted));
        }

        self.state = CelebrationState::Celebrating {
            team,
            timer: ScopedTimer::start(now, CELEBRATION_DURATION),
        };
        cues.push(DisplayCue::CelebrationStarted {
            team,
            steal,
            duration_ms: duration_ms(CELEBRATION_DURATION),
        });
        cues
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> CelebrationValidator {
        CelebrationValidator::new()
    }

    fn snapshot(strikes: [u8; MAX_TEAMS], question_index: u32) -> Snapshot {
        let mut snapshot = Snapshot {
            question_index,
            ..Snapshot::default()
        };
        for (team, count) in snapshot.teams.iter_mut().zip(strikes) {
            team.strikes = count;
        }
        snapshot
    }

    fn ended(team: usize, reason: EndReason) -> DisplayCue {
        DisplayCue::CelebrationEnded { team, reason }
    }

    #[test]
    fn celebration_clears_after_exactly_three_seconds() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_snapshot(&snapshot([0; MAX_TEAMS], 0));

        let cues = v.on_winner(Some(1), t0);
        assert!(matches!(
            cues.as_slice(),
            [DisplayCue::CelebrationStarted { team: 1, steal: false, duration_ms: 3_000 }]
        ));

        assert_eq!(v.expire(t0 + Duration::from_millis(2_999)), None);
        assert_eq!(v.celebrating(), Some(1));
        assert_eq!(
            v.expire(t0 + Duration::from_millis(3_000)),
            Some(ended(1, EndReason::Expired))
        );
        assert_eq!(v.state(), CelebrationState::Idle);
    }

    #[test]
    fn eliminated_winner_is_never_celebrated() {
        let mut v = validator();
        v.on_snapshot(&snapshot([3, 0, 0, 0, 0], 0));

        assert!(v.on_winner(Some(0), Instant::now()).is_empty());
        assert_eq!(v.celebrating(), None);
        assert_eq!(v.winner(), Some(0));
    }

    #[test]
    fn steal_keeps_the_same_duration() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_snapshot(&snapshot([3, 0, 0, 0, 0], 0));

        let cues = v.on_winner(Some(2), t0);
        assert!(matches!(
            cues.as_slice(),
            [DisplayCue::CelebrationStarted { team: 2, steal: true, duration_ms: 3_000 }]
        ));
        assert_eq!(v.deadline(), Some(t0 + CELEBRATION_DURATION));
    }

    #[test]
    fn winner_reset_forces_idle() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_winner(Some(0), t0);

        assert_eq!(
            v.on_winner(None, t0 + Duration::from_millis(100)),
            vec![ended(0, EndReason::WinnerCleared)]
        );
        assert_eq!(v.deadline(), None);
    }

    #[test]
    fn question_change_forces_idle() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_snapshot(&snapshot([0; MAX_TEAMS], 4));
        v.on_winner(Some(3), t0);

        assert!(v.on_snapshot(&snapshot([0; MAX_TEAMS], 4)).is_empty());
        assert_eq!(
            v.on_snapshot(&snapshot([0; MAX_TEAMS], 5)),
            vec![ended(3, EndReason::QuestionChanged)]
        );
    }

    #[test]
    fn celebrated_team_reaching_three_strikes_forces_idle() {
        let mut v = validator();
        v.on_snapshot(&snapshot([2, 0, 0, 0, 0], 0));
        v.on_winner(Some(0), Instant::now());

        assert_eq!(
            v.on_snapshot(&snapshot([3, 0, 0, 0, 0], 0)),
            vec![ended(0, EndReason::Eliminated)]
        );
    }

    #[test]
    fn new_winner_preempts_running_celebration() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_winner(Some(0), t0);

        let t1 = t0 + Duration::from_millis(1_000);
        let cues = v.on_winner(Some(4), t1);
        assert_eq!(cues[0], ended(0, EndReason::Preempted));
        assert!(matches!(cues[1], DisplayCue::CelebrationStarted { team: 4, .. }));

        // The first timer is gone: nothing fires at its old deadline.
        assert_eq!(v.expire(t0 + CELEBRATION_DURATION), None);
        assert_eq!(
            v.expire(t1 + CELEBRATION_DURATION),
            Some(ended(4, EndReason::Expired))
        );
    }

    #[test]
    fn same_winner_reported_twice_does_not_restart() {
        let mut v = validator();
        let t0 = Instant::now();
        v.on_winner(Some(1), t0);

        assert!(v.on_winner(Some(1), t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(v.deadline(), Some(t0 + CELEBRATION_DURATION));
    }

    #[test]
    fn out_of_range_winner_is_ignored() {
        let mut v = validator();
        assert!(v.on_winner(Some(MAX_TEAMS), Instant::now()).is_empty());
        assert_eq!(v.celebrating(), None);
    }
}
