// ABOUTME: Library root for fleetup - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fleet;
pub mod output;
pub mod rollout;
pub mod types;
pub mod upgrade;
