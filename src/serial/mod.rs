//! Buzzer microcontroller link: byte framing, line protocol and port ownership.

/// Byte stream to line framing.
pub mod frame;
/// Serial port ownership and the reader task.
pub mod link;
/// `Button <N> PRESSED|RELEASED` line grammar.
pub mod protocol;
