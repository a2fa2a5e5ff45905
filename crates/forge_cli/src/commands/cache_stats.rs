//! Cache-stats command - exercise the session cache surface.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use forge_core::{ForgeConfig, GenMode, MessageRole};
use forge_gen::SessionCache;
use forge_store::{ChatHistoryService, MemoryStore};

#[derive(Args)]
pub struct CacheStatsArgs {
    /// Number of demo applications to warm
    #[arg(long, default_value_t = 3)]
    apps: i64,
}

pub async fn execute(args: CacheStatsArgs) -> Result<()> {
    let config = ForgeConfig::load(std::env::current_dir()?);
    let store = Arc::new(MemoryStore::new());
    let history = ChatHistoryService::new(store.clone());
    let cache = SessionCache::from_settings(history.clone(), config.context_window, &config.cache);

    // Seed a little history so warmed handles have context to load
    for app_id in 1..=args.apps {
        history
            .add_message(app_id, 1, MessageRole::User, format!("prompt for app {}", app_id), None)
            .await?;
    }

    for app_id in 1..=args.apps {
        cache.warm(app_id).await;
    }
    // A second pass is all hits
    for app_id in 1..=args.apps {
        cache.get(app_id, GenMode::MultiFile).await;
    }
    cache.evict_app(1);

    let stats = cache.stats();
    println!("Session cache");
    println!("  size:      {}", stats.size);
    println!("  hits:      {}", stats.hits);
    println!("  misses:    {}", stats.misses);
    println!("  loads:     {}", stats.loads);
    println!("  evictions: {}", stats.evictions);
    println!("  hit rate:  {:.1}%", stats.hit_rate() * 100.0);
    Ok(())
}
