//! Server module for Vigil
//!
//! Contains the server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Production configuration validation
//! - `providers`: LLM provider resolution
//! - `adapters`: HTTP clients for remote peers and directories
//! - `components`: Engine wiring and the HTTP router
//! - `shutdown`: Signal handling
//! - `init`: Main server initialization and run loop

pub mod adapters;
mod components;
pub mod config;
mod init;
mod loader;
mod providers;
mod shutdown;
mod validation;

// Re-export public API
pub use components::Components;
pub use init::run;
pub use loader::load_config;
pub use providers::resolve_llm_provider;
