use std::{collections::HashMap, path::PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{config, error::EnrichmentError};

use super::Enrichment;

const FRESHNESS_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArtist {
    /// MusicBrainz id, `None` when the artist could not be matched.
    pub mb_id: Option<String>,
    pub name: String,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub rating: f64,
    /// Unix seconds.
    pub cached_at: i64,
}

impl CachedArtist {
    pub fn to_enrichment(&self) -> Enrichment {
        Enrichment {
            genres: self.genres.clone(),
            tags: self.tags.clone(),
            rating: self.rating,
            from_cache: true,
            skipped: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub refreshed_last_7_days: usize,
    pub with_genres: usize,
    pub with_tags: usize,
    pub average_rating: Option<f64>,
    pub file_size: u64,
}

/// Artist enrichment cache persisted as one JSON file, keyed by artist id.
///
/// Writes are last-writer-wins upserts. The whole map is rewritten through a
/// temporary file and renamed into place, so readers never see a torn file.
pub struct EnrichmentCache {
    path: PathBuf,
    max_age: Duration,
    entries: Mutex<HashMap<String, CachedArtist>>,
}

impl EnrichmentCache {
    pub fn default_path() -> PathBuf {
        config::data_dir().join("cache").join("enrichment.json")
    }

    pub async fn open_default() -> Result<Self, EnrichmentError> {
        Self::open(Self::default_path()).await
    }

    /// Loads the cache file if present. A corrupt file is discarded.
    pub async fn open(path: PathBuf) -> Result<Self, EnrichmentError> {
        let entries = match async_fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str::<HashMap<String, CachedArtist>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable enrichment cache");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = entries.len(), "enrichment cache opened");
        Ok(Self {
            path,
            max_age: Duration::days(FRESHNESS_DAYS),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The entry for `artist_id` if it is younger than the freshness window.
    pub async fn get(&self, artist_id: &str) -> Option<CachedArtist> {
        let min_timestamp = (Utc::now() - self.max_age).timestamp();
        let entries = self.entries.lock().await;
        entries
            .get(artist_id)
            .filter(|entry| entry.cached_at > min_timestamp)
            .cloned()
    }

    /// Inserts or replaces the entry and persists the cache.
    pub async fn upsert(&self, artist_id: &str, entry: CachedArtist) -> Result<(), EnrichmentError> {
        let mut entries = self.entries.lock().await;
        entries.insert(artist_id.to_string(), entry);
        self.write(&entries).await
    }

    /// Stores freshly fetched data stamped with the current time.
    pub async fn save(
        &self,
        artist_id: &str,
        mb_id: Option<String>,
        name: &str,
        genres: Vec<String>,
        tags: Vec<String>,
        rating: f64,
    ) -> Result<(), EnrichmentError> {
        let entry = CachedArtist {
            mb_id,
            name: name.to_string(),
            genres,
            tags,
            rating,
            cached_at: Utc::now().timestamp(),
        };
        self.upsert(artist_id, entry).await
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let week_ago = (Utc::now() - Duration::days(7)).timestamp();
        let entries = self.entries.lock().await;

        let rated: Vec<f64> = entries
            .values()
            .map(|e| e.rating)
            .filter(|r| *r > 0.0)
            .collect();
        let average_rating = if rated.is_empty() {
            None
        } else {
            Some(rated.iter().sum::<f64>() / rated.len() as f64)
        };

        let file_size = async_fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        CacheStats {
            total: entries.len(),
            refreshed_last_7_days: entries.values().filter(|e| e.cached_at > week_ago).count(),
            with_genres: entries.values().filter(|e| !e.genres.is_empty()).count(),
            with_tags: entries.values().filter(|e| !e.tags.is_empty()).count(),
            average_rating,
            file_size,
        }
    }

    async fn write(&self, entries: &HashMap<String, CachedArtist>) -> Result<(), EnrichmentError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
