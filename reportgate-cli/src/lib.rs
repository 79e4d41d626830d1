//! Reportgate CLI -- command layer over the formats and policy crates.
//!
//! The binary in `main.rs` parses arguments, loads `GateConfig`, installs
//! the tracing subscriber and dispatches to [`commands::run`].

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
