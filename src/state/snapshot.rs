//! Authoritative game state as read from the remote store on each poll cycle.

use serde::Serialize;

/// Number of team slots carried by every game record.
pub const MAX_TEAMS: usize = 5;
/// Strike count at which a team is eliminated from the current question.
pub const ELIMINATION_STRIKES: u8 = 3;

/// Lifecycle status of the game as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Lobby: the host has not started the game yet.
    #[default]
    Waiting,
    /// A question is live; answers may be revealed.
    Playing,
    /// Play is suspended by the host.
    Paused,
    /// Final scores are shown.
    Finished,
}

/// Sound cue channels the host can trigger remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundChannel {
    /// Tension music while teams think.
    Intense,
    /// Victory jingle.
    Winning,
    /// Silence every playing sound.
    Stop,
}

impl SoundChannel {
    /// Every channel, in the order they are diffed.
    pub const ALL: [SoundChannel; 3] = [
        SoundChannel::Intense,
        SoundChannel::Winning,
        SoundChannel::Stop,
    ];
}

/// Latest cue token per sound channel.
///
/// Tokens are opaque: the host writes a fresh value (usually a timestamp)
/// each time it requests a sound, so only inequality carries meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoundCues {
    /// Token of the last intense-music request.
    pub intense: Option<String>,
    /// Token of the last winning-jingle request.
    pub winning: Option<String>,
    /// Token of the last stop request.
    pub stop: Option<String>,
}

impl SoundCues {
    /// Token currently stored for `channel`.
    pub fn token(&self, channel: SoundChannel) -> Option<&str> {
        match channel {
            SoundChannel::Intense => self.intense.as_deref(),
            SoundChannel::Winning => self.winning.as_deref(),
            SoundChannel::Stop => self.stop.as_deref(),
        }
    }

    /// Replace the token stored for `channel`.
    pub fn set_token(&mut self, channel: SoundChannel, token: Option<String>) {
        let slot = match channel {
            SoundChannel::Intense => &mut self.intense,
            SoundChannel::Winning => &mut self.winning,
            SoundChannel::Stop => &mut self.stop,
        };
        *slot = token;
    }
}

/// Score and strikes for one team slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeamStanding {
    /// Points scored so far.
    pub score: u32,
    /// Strikes on the current question, 0..=3.
    pub strikes: u8,
}

impl TeamStanding {
    /// Whether the team has used up its strikes.
    pub fn is_eliminated(&self) -> bool {
        self.strikes >= ELIMINATION_STRIKES
    }
}

/// One polled read of the game record. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// One standing per team slot.
    pub teams: [TeamStanding; MAX_TEAMS],
    /// Game status.
    pub status: GameStatus,
    /// Zero-based index of the current question.
    pub question_index: u32,
    /// Cue tokens as read with the game row.
    pub cues: SoundCues,
}

impl Snapshot {
    /// Strike counts for every team slot.
    pub fn strikes(&self) -> [u8; MAX_TEAMS] {
        self.teams.map(|team| team.strikes)
    }

    /// Standing of the team at `index`, if the slot exists.
    pub fn team(&self, index: usize) -> Option<&TeamStanding> {
        self.teams.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_tokens_are_addressed_per_channel() {
        let mut cues = SoundCues::default();
        cues.set_token(SoundChannel::Winning, Some("t1".into()));

        assert_eq!(cues.token(SoundChannel::Winning), Some("t1"));
        assert_eq!(cues.token(SoundChannel::Intense), None);
        assert_eq!(cues.token(SoundChannel::Stop), None);
    }

    #[test]
    fn elimination_starts_at_three_strikes() {
        assert!(!TeamStanding { score: 0, strikes: 2 }.is_eliminated());
        assert!(TeamStanding { score: 0, strikes: 3 }.is_eliminated());
    }
}
