use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::serial::{
    link::LinkStatus,
    protocol::{ButtonEvent, parse_line},
};

/// Default number of physical buzzer channels.
pub const DEFAULT_BUTTON_COUNT: usize = 5;
/// Default number of raw serial lines kept for troubleshooting.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Live pressed/released state for every buzzer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonBoard {
    states: Vec<bool>,
    last_pressed: Option<usize>,
}

impl ButtonBoard {
    /// All `count` buttons released, nothing pressed yet.
    pub fn new(count: usize) -> Self {
        Self {
            states: vec![false; count],
            last_pressed: None,
        }
    }

    /// Apply a decoded transition. Returns whether anything changed.
    ///
    /// Only presses move `last_pressed`; a release leaves it untouched.
    pub fn apply(&mut self, event: ButtonEvent) -> bool {
        let Some(slot) = self.states.get_mut(event.index) else {
            return false;
        };
        let changed = *slot != event.pressed;
        *slot = event.pressed;
        if event.pressed {
            let moved = self.last_pressed != Some(event.index);
            self.last_pressed = Some(event.index);
            return changed || moved;
        }
        changed
    }

    /// Release every button, keeping the last pressed index.
    pub fn release_all(&mut self) -> bool {
        let any_pressed = self.states.iter().any(|pressed| *pressed);
        self.states.iter_mut().for_each(|pressed| *pressed = false);
        any_pressed
    }

    /// Pressed flag per button.
    pub fn states(&self) -> &[bool] {
        &self.states
    }

    /// Index of the most recent transition to pressed.
    pub fn last_pressed(&self) -> Option<usize> {
        self.last_pressed
    }

    /// Number of buzzer channels.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the board has no channel at all.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Raw serial line captured for troubleshooting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    /// When the line was framed.
    pub captured_at: OffsetDateTime,
    /// Decoded line without its terminator.
    pub line: String,
}

/// Bounded ring of recent raw lines; the oldest entry is evicted first.
#[derive(Debug)]
pub struct DiagnosticLog {
    entries: VecDeque<DiagnosticEntry>,
    capacity: usize,
}

impl DiagnosticLog {
    /// Create an empty log holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `line`, evicting the oldest entries past capacity.
    pub fn push(&mut self, line: String, captured_at: OffsetDateTime) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DiagnosticEntry { captured_at, line });
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared button state fed by the serial reader and read by everyone else.
///
/// The board is published through a watch channel: readers clone the latest
/// value and never hold a lock the writer needs.
pub struct ButtonHub {
    board: watch::Sender<ButtonBoard>,
    link: watch::Sender<LinkStatus>,
    log: Mutex<DiagnosticLog>,
}

impl ButtonHub {
    /// Build a hub for `button_count` channels and a log of `log_capacity` lines.
    pub fn new(button_count: usize, log_capacity: usize) -> Self {
        let (board, _rx) = watch::channel(ButtonBoard::new(button_count));
        let (link, _rx) = watch::channel(LinkStatus::Disconnected);
        Self {
            board,
            link,
            log: Mutex::new(DiagnosticLog::new(log_capacity)),
        }
    }

    /// Log `line` and apply it to the board when it parses as a button event.
    pub async fn ingest_line(&self, line: &str) -> Option<ButtonEvent> {
        self.log
            .lock()
            .await
            .push(line.to_string(), OffsetDateTime::now_utc());

        let count = self.board.borrow().len();
        match parse_line(line.trim(), count) {
            Ok(event) => {
                self.board.send_if_modified(|board| board.apply(event));
                Some(event)
            }
            Err(rejection) => {
                debug!(line, %rejection, "ignoring serial line");
                None
            }
        }
    }

    /// Current board value.
    pub fn board(&self) -> ButtonBoard {
        self.board.borrow().clone()
    }

    /// Subscribe to board updates.
    pub fn subscribe(&self) -> watch::Receiver<ButtonBoard> {
        self.board.subscribe()
    }

    /// Release every button (used when the link goes away).
    pub fn release_all(&self) {
        if self.board.send_if_modified(ButtonBoard::release_all) {
            info!("released all buttons after link teardown");
        }
    }

    /// Copy of the diagnostic log, oldest first.
    pub async fn diagnostics(&self) -> Vec<DiagnosticEntry> {
        self.log.lock().await.entries().cloned().collect()
    }

    /// Current serial link status.
    pub fn link_status(&self) -> LinkStatus {
        self.link.borrow().clone()
    }

    /// Subscribe to serial link status changes.
    pub fn subscribe_link(&self) -> watch::Receiver<LinkStatus> {
        self.link.subscribe()
    }

    /// Publish a new serial link status.
    pub fn set_link_status(&self, status: LinkStatus) {
        self.link.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(index: usize) -> ButtonEvent {
        ButtonEvent {
            index,
            pressed: true,
        }
    }

    fn release(index: usize) -> ButtonEvent {
        ButtonEvent {
            index,
            pressed: false,
        }
    }

    #[test]
    fn release_keeps_last_pressed_index() {
        let mut board = ButtonBoard::new(DEFAULT_BUTTON_COUNT);

        assert!(board.apply(press(2)));
        assert_eq!(board.last_pressed(), Some(2));
        assert_eq!(board.states(), &[false, false, true, false, false]);

        assert!(board.apply(release(2)));
        assert_eq!(board.last_pressed(), Some(2));
        assert_eq!(board.states(), &[false; 5]);
    }

    #[test]
    fn repeated_press_is_not_a_change() {
        let mut board = ButtonBoard::new(3);
        assert!(board.apply(press(0)));
        assert!(!board.apply(press(0)));
        assert!(board.apply(press(1)));
        assert_eq!(board.last_pressed(), Some(1));
    }

    #[test]
    fn events_beyond_board_are_ignored() {
        let mut board = ButtonBoard::new(2);
        assert!(!board.apply(press(5)));
        assert_eq!(board.last_pressed(), None);
    }

    #[test]
    fn log_evicts_oldest_first() {
        let mut log = DiagnosticLog::new(3);
        let now = OffsetDateTime::now_utc();
        for n in 0..5 {
            log.push(format!("line {n}"), now);
        }

        let lines: Vec<_> = log.entries().map(|entry| entry.line.as_str()).collect();
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[tokio::test]
    async fn every_line_is_logged_even_when_rejected() {
        let hub = ButtonHub::new(DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY);

        assert_eq!(hub.ingest_line("hello from arduino").await, None);
        assert_eq!(hub.ingest_line("Button 9 PRESSED").await, None);
        assert_eq!(hub.ingest_line("Button 3 PRESSED").await, Some(press(2)));

        let log = hub.diagnostics().await;
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].line, "hello from arduino");
        assert_eq!(hub.board().last_pressed(), Some(2));
    }

    #[tokio::test]
    async fn log_is_bounded_to_capacity() {
        let hub = ButtonHub::new(DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY);
        for n in 0..(DEFAULT_LOG_CAPACITY + 25) {
            hub.ingest_line(&format!("noise {n}")).await;
        }

        let log = hub.diagnostics().await;
        assert_eq!(log.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(log[0].line, "noise 25");
    }

    #[tokio::test]
    async fn subscribers_see_board_changes() {
        let hub = ButtonHub::new(DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY);
        let mut rx = hub.subscribe();

        hub.ingest_line("Button 1 PRESSED").await;
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().states()[0]);

        hub.release_all();
        rx.changed().await.unwrap();
        assert!(rx.borrow().states().iter().all(|pressed| !pressed));
    }
}
