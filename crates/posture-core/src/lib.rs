//! # posture-core
//!
//! Foundation crate for the Posture assessment engine.
//! Configuration, errors, events, traits, tracing, and shared types.

pub mod config;
pub mod errors;
pub mod events;
pub mod tracing_setup;
pub mod traits;
pub mod types;
