//! `kiln cache`: inspect or empty the persistent cache.

use kiln_cache::PersistentCache;

use crate::settings::resolve_config;
use crate::{CacheAction, GlobalArgs};

/// Runs a `kiln cache` action.
///
/// Acts on the configured cache directory whether or not caching is enabled
/// for builds, and never creates it.
pub fn run(action: CacheAction, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let cache = PersistentCache::open_existing(&config.cache)?;
    let dir = cache
        .dir()
        .map(|d| d.display().to_string())
        .unwrap_or_default();

    match action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            println!("{dir}: {} entries, {} bytes", stats.entries, stats.total_bytes);
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            if !global.quiet {
                println!("removed {removed} entries from {dir}");
            }
        }
    }
    Ok(0)
}
