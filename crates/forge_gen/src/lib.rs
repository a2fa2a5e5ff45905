//! # forge_gen - Generation orchestration for siteforge
//!
//! Turns one user prompt into validated, persisted code artifacts
//! streamed back to the caller:
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ GenerationRouter │────▶│   SessionCache   │────▶│GenerationBackend │
//! └────────┬─────────┘     └──────────────────┘     └────────┬─────────┘
//!          │                                                  │ callbacks
//!          ▼                                                  ▼
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │   ChatHistory    │◀────│ StreamNormalizer │◀────│    EventSink     │
//! └──────────────────┘     └────────┬─────────┘     └──────────────────┘
//!                                   │ on completion
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │  Parser + Saver  │
//!                          └──────────────────┘
//! ```
//!
//! The router records the user message, resolves the mode, and hands
//! the turn to a per-application task. The normalizer relays backend
//! events live while buffering text; on completion the parser/saver
//! persists artifacts and the ai reply lands in chat history. Failures
//! become a `Failed` event plus a diagnostic chat entry.

pub mod backend;
pub mod error;
pub mod mock;
pub mod parser;
pub mod router;
pub mod saver;
pub mod session;
pub mod stream;

pub use backend::*;
pub use error::*;
pub use mock::*;
pub use router::*;
pub use saver::*;
pub use session::*;
pub use stream::EventStream;
