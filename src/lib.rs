//! Vigil - policy-validated task orchestration
//!
//! The binary wires the engine from `vigil-core` to an HTTP API, a seeded
//! knowledge hub and a small client CLI.

#![forbid(unsafe_code)]

pub mod api;
pub mod cli;
pub mod hub;
pub mod server;
