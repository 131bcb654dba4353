use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dto::format_timestamp,
    serial::link::LinkStatus,
    state::buttons::{ButtonBoard, DiagnosticEntry},
};

#[derive(Debug, Default, Deserialize, Validate)]
/// Body of `POST /buzzers/connect`; missing fields fall back to configuration.
pub struct ConnectRequest {
    /// Device path, e.g. `/dev/ttyUSB0`.
    #[validate(length(min = 1))]
    pub path: Option<String>,
    /// Line speed in baud.
    #[validate(range(min = 300, max = 4_000_000))]
    pub baud_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Live button vector as published to displays.
pub struct ButtonsPayload {
    /// Pressed flag per button, index 0 is button 1.
    pub states: Vec<bool>,
    /// Zero-based index of the most recent press, kept after release.
    pub last_pressed: Option<usize>,
}

impl From<&ButtonBoard> for ButtonsPayload {
    fn from(board: &ButtonBoard) -> Self {
        Self {
            states: board.states().to_vec(),
            last_pressed: board.last_pressed(),
        }
    }
}

#[derive(Debug, Serialize)]
/// Response of `GET /buzzers`.
pub struct ButtonStateResponse {
    /// Current button vector.
    #[serde(flatten)]
    pub buttons: ButtonsPayload,
    /// Serial link state.
    pub link: LinkStatus,
}

#[derive(Debug, Serialize)]
/// One raw serial line with its capture time.
pub struct DiagnosticLine {
    /// RFC 3339 capture time.
    pub captured_at: String,
    /// Decoded line without its terminator.
    pub line: String,
}

impl From<DiagnosticEntry> for DiagnosticLine {
    fn from(entry: DiagnosticEntry) -> Self {
        Self {
            captured_at: format_timestamp(entry.captured_at),
            line: entry.line,
        }
    }
}
