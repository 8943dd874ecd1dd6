//! Shared domain types for the warden runtime.
//!
//! Everything other crates agree on lives here: the error type, the
//! transcript message model, the graph state that is snapshotted per
//! thread, structured trace events, and the TOML configuration surface.

pub mod config;
pub mod error;
pub mod graph;
pub mod message;
pub mod trace;
