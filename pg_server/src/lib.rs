//! Party game server library: configuration, logging and the HTTP API.
//!
//! The binary in `main.rs` wires these together; integration tests build
//! the router directly and drive it with `tower::ServiceExt::oneshot`.

pub mod api;
pub mod config;
pub mod logging;
