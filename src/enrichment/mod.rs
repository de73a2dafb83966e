//! Optional community metadata for artists.
//!
//! An [`Enricher`] maps an artist id and name to extra genres, free-text community
//! tags and a rating in `[0, 100]`. The recommendation engine treats every failure
//! as "no enrichment" and keeps going.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EnrichmentError;

mod cache;
mod musicbrainz;

pub use cache::{CacheStats, CachedArtist, EnrichmentCache};
pub use musicbrainz::MusicBrainzEnricher;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    /// Community rating scaled to `[0, 100]`, `0.0` when unrated.
    pub rating: f64,
    pub from_cache: bool,
    /// Not looked up because the per-request lookup allowance was used up.
    pub skipped: bool,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.tags.is_empty() && self.rating <= 0.0
    }

    fn skipped() -> Self {
        Enrichment {
            skipped: true,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Fresh cached data only, never a network call.
    async fn cached(&self, artist_id: &str) -> Option<Enrichment>;

    /// Cache first, then a (throttled) lookup.
    async fn enrich(&self, artist_id: &str, artist_name: &str)
    -> Result<Enrichment, EnrichmentError>;
}

/// Enriches `(artist_id, artist_name)` pairs, serving from the cache first and
/// performing at most `max_new_lookups` uncached lookups. Artists beyond that
/// allowance get a skipped, empty record.
pub async fn batch_enrich(
    enricher: &dyn Enricher,
    artists: &[(String, String)],
    max_new_lookups: usize,
) -> HashMap<String, Enrichment> {
    let mut enriched = HashMap::with_capacity(artists.len());
    let mut new_lookups = 0;

    for (artist_id, artist_name) in artists {
        if enriched.contains_key(artist_id) {
            continue;
        }

        if let Some(cached) = enricher.cached(artist_id).await {
            enriched.insert(artist_id.clone(), cached);
            continue;
        }

        if new_lookups >= max_new_lookups {
            enriched.insert(artist_id.clone(), Enrichment::skipped());
            continue;
        }

        new_lookups += 1;
        debug!(artist = %artist_name, lookup = new_lookups, "enriching artist");
        let enrichment = match enricher.enrich(artist_id, artist_name).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!(artist = %artist_name, error = %e, "enrichment lookup failed");
                Enrichment::default()
            }
        };
        enriched.insert(artist_id.clone(), enrichment);
    }

    let from_cache = enriched.values().filter(|e| e.from_cache).count();
    let skipped = enriched.values().filter(|e| e.skipped).count();
    tracing::info!(
        artists = enriched.len(),
        from_cache,
        new_lookups,
        skipped,
        "batch enrichment complete"
    );

    enriched
}
