//! Service registry
//!
//! TTL-based directory that lets the orchestrator, executor and validator
//! find each other.
//!
//! # Module Structure
//!
//! - `types`: [`ServiceRecord`], [`RegistryConfig`] and [`HeartbeatConfig`]
//! - `store`: the in-memory [`ServiceRegistry`] with lazy expiry and an optional sweeper
//! - `client`: [`Discovery`]/[`Registrar`] seams, retrying discovery and the heartbeat loop

mod client;
mod store;
mod types;


pub use client::{discover_with_retry, spawn_heartbeat, Discovery, Registrar};
pub use store::ServiceRegistry;
pub use types::{HeartbeatConfig, RegistryConfig, ServiceRecord};
