use crate::{enrichment::EnrichmentCache, error, info, warning};

/// Prints enrichment cache statistics.
pub async fn cache() {
    let cache = match EnrichmentCache::open_default().await {
        Ok(cache) => cache,
        Err(e) => error!("Failed to open enrichment cache: {}", e),
    };

    if cache.is_empty().await {
        warning!("Enrichment cache at {} is empty", cache.path().display());
        return;
    }

    let stats = cache.stats().await;
    info!("Enrichment cache: {}", cache.path().display());
    println!("  Artists cached:        {}", stats.total);
    println!("  Refreshed last 7 days: {}", stats.refreshed_last_7_days);
    println!("  With genres:           {}", stats.with_genres);
    println!("  With tags:             {}", stats.with_tags);
    match stats.average_rating {
        Some(r) => println!("  Average rating:        {:.1}", r),
        None => println!("  Average rating:        -"),
    }
    println!("  File size:             {:.1} KiB", stats.file_size as f64 / 1024.0);
}
