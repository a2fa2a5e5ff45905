//! # forge_store - Persistence boundary for siteforge
//!
//! The pipeline consumes storage through the [`AppStore`], [`ChatStore`]
//! and [`DeploymentStore`] traits; any backend with the required query
//! shapes can sit behind them. [`MemoryStore`] is the in-process
//! reference implementation used by tests and the CLI demo.
//!
//! [`ChatHistoryService`] layers the chat invariants on top of a
//! [`ChatStore`]: parent-linked ai replies, subtree retries, the
//! context window and cursor paging.

pub mod apps;
pub mod error;
pub mod history;
pub mod memory;
pub mod traits;

pub use apps::*;
pub use error::*;
pub use history::*;
pub use memory::*;
pub use traits::*;
