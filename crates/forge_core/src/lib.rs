//! # forge_core - Domain model for siteforge
//!
//! Shared types for the generation and delivery pipeline:
//! applications, chat messages, generation modes, stream events,
//! code artifacts and deployment records, plus the error taxonomy
//! and runtime configuration used across the workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
