//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod cache_stats;
pub mod generate;

/// siteforge - prompt-to-webapp generation and delivery
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "siteforge - prompt-to-webapp generation and delivery")]
#[command(long_about = r#"
siteforge turns a natural-language prompt into runnable front-end code
(a single HTML page, a multi-file HTML/CSS/JS set, or a Vue/React
project) and publishes it to a shareable URL.

This CLI drives the pipeline locally against an in-memory store and a
scripted backend, so the whole flow can be exercised without a live
provider.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Generation failure
  5 - Build/deploy failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate code from a prompt, optionally retry and deploy
    Generate(generate::GenerateArgs),

    /// Exercise the session cache and print its counters
    #[command(name = "cache-stats")]
    CacheStats(cache_stats::CacheStatsArgs),
}
