use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::{config, error::EnrichmentError};

use super::{Enricher, Enrichment, EnrichmentCache};

const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TAGS: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    artists: Vec<ArtistHit>,
}

#[derive(Debug, Deserialize)]
struct ArtistHit {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtistDetails {
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    tags: Vec<Tag>,
    rating: Option<Rating>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: Option<String>,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct Rating {
    /// Zero to five stars.
    value: Option<f64>,
}

/// [`Enricher`] backed by the MusicBrainz web service.
///
/// Lookups go through a shared throttle so that no two requests start less than a
/// second apart, across all concurrent callers of the same enricher.
pub struct MusicBrainzEnricher {
    http: Client,
    base_url: String,
    cache: Arc<EnrichmentCache>,
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzEnricher {
    pub fn new(cache: Arc<EnrichmentCache>) -> Result<Self, EnrichmentError> {
        Self::with_base_url(config::musicbrainz_apiurl(), cache)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        cache: Arc<EnrichmentCache>,
    ) -> Result<Self, EnrichmentError> {
        let http = Client::builder()
            .user_agent(config::musicbrainz_user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            last_request: Mutex::new(None),
        })
    }

    async fn respect_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn search_artist(&self, artist_name: &str) -> Result<Option<String>, EnrichmentError> {
        self.respect_rate_limit().await;
        let query = format!("artist:\"{}\"", artist_name.trim().to_lowercase());
        let response: SearchResponse = self
            .http
            .get(format!("{}/artist/", self.base_url))
            .query(&[("query", query.as_str()), ("limit", "1"), ("fmt", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.artists.into_iter().find_map(|a| a.id))
    }

    async fn artist_details(&self, mb_id: &str) -> Result<ArtistDetails, EnrichmentError> {
        self.respect_rate_limit().await;
        let details = self
            .http
            .get(format!("{}/artist/{}", self.base_url, mb_id))
            .query(&[("inc", "genres+tags+ratings"), ("fmt", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(details)
    }
}

fn genres_of(details: &ArtistDetails) -> Vec<String> {
    details
        .genres
        .iter()
        .filter_map(|g| g.name.clone())
        .collect()
}

fn tags_of(details: &ArtistDetails) -> Vec<String> {
    details
        .tags
        .iter()
        .filter(|t| t.count > 0)
        .filter_map(|t| t.name.clone())
        .take(MAX_TAGS)
        .collect()
}

/// Stars (0-5) to the `[0, 100]` scale.
fn rating_of(details: &ArtistDetails) -> f64 {
    details
        .rating
        .as_ref()
        .and_then(|r| r.value)
        .map(|stars| (stars * 20.0).clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

#[async_trait]
impl Enricher for MusicBrainzEnricher {
    async fn cached(&self, artist_id: &str) -> Option<Enrichment> {
        self.cache.get(artist_id).await.map(|c| c.to_enrichment())
    }

    async fn enrich(
        &self,
        artist_id: &str,
        artist_name: &str,
    ) -> Result<Enrichment, EnrichmentError> {
        if let Some(cached) = self.cached(artist_id).await {
            return Ok(cached);
        }

        let Some(mb_id) = self.search_artist(artist_name).await? else {
            debug!(artist = %artist_name, "no MusicBrainz match");
            // Remember the miss so the artist is not searched again for a while.
            self.cache
                .save(artist_id, None, artist_name, Vec::new(), Vec::new(), 0.0)
                .await?;
            return Ok(Enrichment::default());
        };

        let details = self.artist_details(&mb_id).await?;
        let enrichment = Enrichment {
            genres: genres_of(&details),
            tags: tags_of(&details),
            rating: rating_of(&details),
            from_cache: false,
            skipped: false,
        };
        debug!(
            artist = %artist_name,
            genres = enrichment.genres.len(),
            tags = enrichment.tags.len(),
            rating = enrichment.rating,
            "MusicBrainz details"
        );

        self.cache
            .save(
                artist_id,
                Some(mb_id),
                artist_name,
                enrichment.genres.clone(),
                enrichment.tags.clone(),
                enrichment.rating,
            )
            .await?;

        Ok(enrichment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(json: &str) -> ArtistDetails {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_tags_require_votes_and_are_capped() {
        let tags: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"name":"tag{}","count":{}}}"#, i, i % 3))
            .collect();
        let d = details(&format!(r#"{{"tags":[{}]}}"#, tags.join(",")));
        let kept = tags_of(&d);

        assert_eq!(kept.len(), MAX_TAGS);
        assert!(!kept.contains(&"tag0".to_string()));
        assert_eq!(kept[0], "tag1");
    }

    #[test]
    fn test_rating_is_scaled_to_percent() {
        assert_eq!(rating_of(&details(r#"{"rating":{"value":4.5}}"#)), 90.0);
        assert_eq!(rating_of(&details(r#"{"rating":{"value":null}}"#)), 0.0);
        assert_eq!(rating_of(&details("{}")), 0.0);
    }

    #[test]
    fn test_genres_skip_unnamed_entries() {
        let d = details(r#"{"genres":[{"name":"rock"},{"name":null},{"name":"indie rock"}]}"#);
        assert_eq!(genres_of(&d), vec!["rock", "indie rock"]);
    }
}
