/// Serial link control and button state queries.
pub mod buzzer_service;
/// Health check service.
pub mod health_service;
/// Winner designation feeding the celebration gate.
pub mod lock_in_service;
/// Bounded store reads for one game.
pub mod poller;
/// The display session loop.
pub mod session;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
