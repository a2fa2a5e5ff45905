//! # forge_deploy - Build and publish pipeline for siteforge
//!
//! Takes an application's generated code from its output directory to a
//! shareable URL: allocates a stable deploy key, runs the external build
//! for project modes, replaces the deploy directory wholesale and
//! records the deployment. A detached task captures a screenshot of the
//! published URL afterwards; its failure never reaches the caller.

pub mod builder;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod screenshot;

pub use builder::*;
pub use error::*;
pub use mock::*;
pub use pipeline::*;
pub use screenshot::*;
