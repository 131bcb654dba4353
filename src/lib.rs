//! Library crate for feud-sync, exposing modules for the binary and integration tests.

/// Runtime configuration.
pub mod config;
/// Store access.
pub mod dao;
/// Wire payloads.
pub mod dto;
/// Service and HTTP errors.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Buzzer serial link.
pub mod serial;
/// Business logic behind the routes and the display session.
pub mod services;
/// Shared application state and the effect state machines.
pub mod state;
