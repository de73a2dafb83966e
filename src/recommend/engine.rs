use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Local};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom, seq::index};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    analysis::TasteProfile,
    config::EngineSettings,
    enrichment::{self, Enricher, Enrichment},
    spotify::{MAX_ARTISTS_PER_CALL, MusicApi},
    types::{TimeRange, Track},
    utils,
};

use super::{ScoringContext, TrackQuota, UserPreferences, score_track};

const TOP_ARTISTS_REQUESTED: usize = 10;
const TOP_TRACKS_PER_ARTIST: usize = 5;
const RECENT_ALBUMS: usize = 1;
const TRACKS_PER_RECENT_ALBUM: usize = 3;
const DISCOVERY_MIN_LEVEL: u8 = 20;
const RELATED_SOURCE_ARTISTS: usize = 3;
const RELATED_PER_ARTIST: usize = 2;
const MIN_RELATED_ARTISTS: usize = 5;
const SEARCH_GENRES: usize = 3;
const SEARCH_RESULTS_PER_GENRE: usize = 10;
const MAX_GENRE_DISCOVERIES: usize = 10;
const DISCOVERY_ARTISTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub track: Track,
    pub score: f64,
}

/// Candidate collection shared by the familiar and the discovery pool.
///
/// Rejects tracks already collected in this request and, unconditionally, every
/// track in the exclusion set.
#[derive(Debug)]
pub struct CandidatePool<'a> {
    excluded: &'a HashSet<String>,
    seen: HashSet<String>,
    tracks: Vec<Track>,
    excluded_hits: usize,
}

impl<'a> CandidatePool<'a> {
    pub fn new(excluded: &'a HashSet<String>) -> Self {
        Self {
            excluded,
            seen: HashSet::new(),
            tracks: Vec::new(),
            excluded_hits: 0,
        }
    }

    /// Adds the track unless it is excluded or already present.
    pub fn offer(&mut self, track: Track) -> bool {
        if self.excluded.contains(&track.id) {
            self.excluded_hits += 1;
            return false;
        }
        if !self.seen.insert(track.id.clone()) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn excluded_hits(&self) -> usize {
        self.excluded_hits
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Turns a taste profile into ranked track recommendations.
///
/// Stateless across requests. Randomness (artist sub-sampling, discovery order,
/// score jitter) comes from one generator per request, seeded from
/// [`EngineSettings::shuffle_seed`] when set and from fresh entropy otherwise.
pub struct RecommendationEngine<'a> {
    api: &'a dyn MusicApi,
    enricher: Option<&'a dyn Enricher>,
    settings: EngineSettings,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(api: &'a dyn MusicApi, settings: EngineSettings) -> Self {
        Self {
            api,
            enricher: None,
            settings,
        }
    }

    pub fn with_enricher(mut self, enricher: &'a dyn Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    fn request_rng(&self) -> StdRng {
        match self.settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Ranked tracks, at most `limit`.
    ///
    /// `include_audio_targets` only logs the profile's audio averages as targets.
    /// No scoring term reads them, so the flag never changes the ranking. It is
    /// ignored when the profile has no averages.
    pub async fn generate_recommendations(
        &self,
        profile: &TasteProfile,
        limit: usize,
        include_audio_targets: bool,
        preferences: &UserPreferences,
    ) -> Vec<Track> {
        self.generate_scored(profile, limit, include_audio_targets, preferences)
            .await
            .into_iter()
            .map(|c| c.track)
            .collect()
    }

    /// Like [`Self::generate_recommendations`], keeping the scores.
    pub async fn generate_scored(
        &self,
        profile: &TasteProfile,
        limit: usize,
        include_audio_targets: bool,
        preferences: &UserPreferences,
    ) -> Vec<ScoredCandidate> {
        let mut rng = self.request_rng();

        if include_audio_targets && !profile.has_audio_features() {
            tracing::info!("no audio feature averages in the profile, audio targets disabled");
        } else if include_audio_targets {
            debug!(targets = ?profile.audio_features, "audio targets");
        }

        let working_set = self.working_artists(profile, &mut rng).await;
        if working_set.is_empty() {
            warn!("no artists to build recommendations from");
            return Vec::new();
        }

        let quota = TrackQuota::for_discovery(preferences.discovery());
        tracing::info!(
            artists = working_set.len(),
            discovery = preferences.discovery(),
            familiar_per_artist = quota.familiar,
            discovery_per_artist = quota.discovery,
            "collecting candidates"
        );

        let mut pool = CandidatePool::new(&profile.excluded_track_ids);
        self.collect_familiar(&working_set, quota.familiar, &mut pool)
            .await;
        let familiar = pool.len();

        if preferences.discovery() > DISCOVERY_MIN_LEVEL {
            let discovered = self
                .discover_artists(&working_set, &profile.genre_seeds, &mut rng)
                .await;
            self.collect_discovery(&discovered, quota.discovery, &mut pool)
                .await;
        }

        tracing::info!(
            familiar,
            discovery = pool.len() - familiar,
            excluded = pool.excluded_hits(),
            "candidates collected"
        );

        let candidates = pool.into_tracks();
        if candidates.is_empty() {
            warn!("no candidate tracks found");
            return Vec::new();
        }

        let artist_genres = self.primary_artist_genres(&candidates).await;
        let enrichment = self.enrich(&candidates).await;

        let ctx = ScoringContext::new(
            &profile.genre_seeds,
            working_set.iter().cloned(),
            *preferences,
            Local::now().year(),
        )
        .with_artist_genres(artist_genres)
        .with_enrichment(enrichment)
        .with_jitter(self.settings.jitter);

        let mut ranked = rank_candidates(candidates, &ctx, &mut rng);
        ranked.truncate(limit);

        for (i, c) in ranked.iter().take(3).enumerate() {
            debug!(
                rank = i + 1,
                track = %c.track.name,
                artist = %c.track.primary_artist_name(),
                score = c.score,
                "top recommendation"
            );
        }

        ranked
    }

    /// Up to `working_artists` ids, preferring the platform's top artists over the
    /// profile's frequency ranking. Larger lists are randomly sub-sampled.
    async fn working_artists(&self, profile: &TasteProfile, rng: &mut StdRng) -> Vec<String> {
        let wanted = self.settings.working_artists;

        let top: Vec<String> = match self
            .api
            .user_top_artists(TOP_ARTISTS_REQUESTED, TimeRange::MediumTerm)
            .await
        {
            Ok(artists) if !artists.is_empty() => artists.into_iter().map(|a| a.id).collect(),
            Ok(_) => {
                debug!("no top artists from the platform, using analysis");
                profile.top_artist_ids().into_iter().take(wanted).collect()
            }
            Err(e) => {
                warn!(error = %e, "top artists unavailable, using analysis");
                profile.top_artist_ids().into_iter().take(wanted).collect()
            }
        };

        if top.len() <= wanted {
            return top;
        }
        index::sample(rng, top.len(), wanted)
            .into_iter()
            .map(|i| top[i].clone())
            .collect()
    }

    async fn collect_familiar(
        &self,
        artists: &[String],
        per_artist: usize,
        pool: &mut CandidatePool<'_>,
    ) {
        for artist_id in artists {
            let mut taken = 0;

            let top_tracks = self
                .api
                .artist_top_tracks(artist_id)
                .await
                .unwrap_or_else(|e| {
                    warn!(artist = %artist_id, error = %e, "top tracks unavailable");
                    Vec::new()
                });
            for track in top_tracks.into_iter().take(TOP_TRACKS_PER_ARTIST) {
                if taken >= per_artist {
                    break;
                }
                if pool.offer(track) {
                    taken += 1;
                }
            }

            if taken >= per_artist {
                continue;
            }

            let albums = self
                .api
                .artist_albums(artist_id, RECENT_ALBUMS)
                .await
                .unwrap_or_else(|e| {
                    warn!(artist = %artist_id, error = %e, "albums unavailable");
                    Vec::new()
                });
            for album in albums.into_iter().take(RECENT_ALBUMS) {
                let tracks = self
                    .api
                    .album_tracks(&album.id, TRACKS_PER_RECENT_ALBUM)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(album = %album.id, error = %e, "album tracks unavailable");
                        Vec::new()
                    });
                for mut track in tracks.into_iter().take(TRACKS_PER_RECENT_ALBUM) {
                    if taken >= per_artist {
                        break;
                    }
                    track.album_id.get_or_insert_with(|| album.id.clone());
                    if track.release_date.is_none() {
                        track.release_date = album.release_date.clone();
                    }
                    if pool.offer(track) {
                        taken += 1;
                    }
                }
            }
        }
    }

    /// New artists: related artists first, genre search when that yields too few.
    /// The result is shuffled.
    async fn discover_artists(
        &self,
        working_set: &[String],
        genre_seeds: &[String],
        rng: &mut StdRng,
    ) -> Vec<String> {
        let mut discovered = Vec::new();

        for artist_id in working_set.iter().take(RELATED_SOURCE_ARTISTS) {
            match self.api.related_artists(artist_id).await {
                Ok(related) => discovered.extend(
                    related
                        .into_iter()
                        .take(RELATED_PER_ARTIST)
                        .map(|a| a.id),
                ),
                Err(e) => debug!(artist = %artist_id, error = %e, "related artists unavailable"),
            }
        }

        if discovered.len() < MIN_RELATED_ARTISTS {
            debug!(related = discovered.len(), "falling back to genre search");
            discovered.extend(self.discover_by_genre(genre_seeds, working_set).await);
        }

        let mut discovered = utils::dedup_preserving_order(discovered);
        discovered.shuffle(rng);
        discovered.truncate(DISCOVERY_ARTISTS);
        discovered
    }

    async fn discover_by_genre(&self, genres: &[String], exclude: &[String]) -> Vec<String> {
        let mut seen: HashSet<String> = exclude.iter().cloned().collect();
        let mut found = Vec::new();

        for genre in genres.iter().take(SEARCH_GENRES) {
            let artists = match self
                .api
                .search_artists_by_genre(genre, SEARCH_RESULTS_PER_GENRE)
                .await
            {
                Ok(artists) => artists,
                Err(e) => {
                    warn!(%genre, error = %e, "genre search failed");
                    continue;
                }
            };
            for artist in artists {
                if seen.insert(artist.id.clone()) {
                    debug!(%genre, artist = %artist.name, "discovered artist");
                    found.push(artist.id);
                    if found.len() >= MAX_GENRE_DISCOVERIES {
                        return found;
                    }
                }
            }
        }

        found
    }

    async fn collect_discovery(
        &self,
        artists: &[String],
        per_artist: usize,
        pool: &mut CandidatePool<'_>,
    ) {
        for artist_id in artists {
            let tracks = self
                .api
                .artist_top_tracks(artist_id)
                .await
                .unwrap_or_else(|e| {
                    warn!(artist = %artist_id, error = %e, "top tracks unavailable");
                    Vec::new()
                });
            let mut taken = 0;
            for track in tracks.into_iter().take(TOP_TRACKS_PER_ARTIST) {
                if taken >= per_artist {
                    break;
                }
                if pool.offer(track) {
                    taken += 1;
                }
            }
        }
    }

    /// Platform-native genres of every candidate's primary artist.
    async fn primary_artist_genres(&self, candidates: &[Track]) -> HashMap<String, Vec<String>> {
        let ids = utils::dedup_preserving_order(
            candidates
                .iter()
                .filter_map(|t| t.primary_artist_id())
                .map(str::to_string),
        );

        let mut genres = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_ARTISTS_PER_CALL) {
            match self.api.artists(chunk).await {
                Ok(artists) => genres.extend(artists.into_iter().map(|a| (a.id, a.genres))),
                Err(e) => warn!(error = %e, "artist genres unavailable for scoring"),
            }
        }
        genres
    }

    async fn enrich(&self, candidates: &[Track]) -> HashMap<String, Enrichment> {
        let Some(enricher) = self.enricher else {
            return HashMap::new();
        };

        let mut seen = HashSet::new();
        let artists: Vec<(String, String)> = candidates
            .iter()
            .flat_map(|t| t.artists.iter())
            .filter_map(|a| Some((a.id.clone()?, a.name.clone())))
            .filter(|(id, _)| seen.insert(id.clone()))
            .collect();

        enrichment::batch_enrich(enricher, &artists, self.settings.max_new_enrichments).await
    }
}

/// Scores candidates in discovery order and sorts them by descending score.
/// Equal scores keep discovery order.
pub fn rank_candidates(
    candidates: Vec<Track>,
    ctx: &ScoringContext,
    rng: &mut StdRng,
) -> Vec<ScoredCandidate> {
    let mut seen_albums = HashSet::new();
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|track| {
            let score = score_track(&track, ctx, &seen_albums, rng);
            if let Some(album) = &track.album_id {
                seen_albums.insert(album.clone());
            }
            ScoredCandidate { track, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}
