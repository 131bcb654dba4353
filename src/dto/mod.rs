use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Buzzer board and serial link payloads.
pub mod buzzer;
/// Health check payloads.
pub mod health;
/// Winner designation payloads.
pub mod lock_in;
/// Snapshot catch-up payloads.
pub mod snapshot;
/// Server-Sent Events payloads.
pub mod sse;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
