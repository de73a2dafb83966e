use std::{collections::HashSet, future::Future, time::Duration};

use rand::Rng;
use tracing::{debug, warn};

use crate::{
    config::AnalysisOptions,
    error::{AnalysisError, ApiError},
    spotify::{MAX_PAGE_SIZE, MusicApi},
    types::{Artist, Track},
    utils,
};

use super::{
    AudioProfile, Budget, RankedArtist, Stage, StageReason, StageReport, StageResult,
    TasteProfile, average_features, rank_artists, sample_ids, tally_genres,
};

const MAX_ATTEMPTS: usize = 2;
const TOP_ARTISTS: usize = 10;
const TOP_GENRES: usize = 10;
const GENRE_SEEDS: usize = 5;

const PLAYLISTS_GATE: f64 = 0.3;
const GENRES_GATE: f64 = 0.5;
const AUDIO_FEATURES_GATE: f64 = 0.6;

/// Runs `call` again after a short pause when it fails with a transient error, up
/// to [`MAX_ATTEMPTS`] attempts in total. Network errors return immediately.
pub(crate) async fn with_retry<T, F, Fut>(stage: Stage, mut call: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!(%stage, attempt, error = %e, "transient API error, retrying");
                tokio::time::sleep(e.backoff()).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Staged, budgeted analysis of one user's library.
///
/// Holds no state between calls; every [`TasteAnalyzer::analyze`] starts a fresh
/// budget.
pub struct TasteAnalyzer<'a> {
    api: &'a dyn MusicApi,
    options: AnalysisOptions,
}

/// Convenience wrapper around [`TasteAnalyzer`].
pub async fn analyze(
    api: &dyn MusicApi,
    options: &AnalysisOptions,
) -> Result<TasteProfile, AnalysisError> {
    TasteAnalyzer::new(api, options.clone()).analyze().await
}

impl<'a> TasteAnalyzer<'a> {
    pub fn new(api: &'a dyn MusicApi, options: AnalysisOptions) -> Self {
        Self { api, options }
    }

    pub async fn analyze(&self) -> Result<TasteProfile, AnalysisError> {
        let budget = Budget::start(self.options.max_analysis_time);
        let mut reports = Vec::new();

        // 1. exclusion set
        let exclusion = self.fetch_exclusion_ids().await;
        record(&mut reports, Stage::Exclusion, &exclusion, &budget);

        // 2. liked songs, the only mandatory stage
        let liked = match self.fetch_liked_songs().await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(stage = %Stage::LikedSongs, error = %e, "liked songs fetch failed");
                return Err(AnalysisError::LikedSongs(e));
            }
        };
        let elapsed = budget.elapsed();
        if elapsed > self.options.liked_songs_ceiling {
            warn!(
                stage = %Stage::LikedSongs,
                elapsed_secs = elapsed.as_secs_f64(),
                "liked songs fetch too slow, aborting analysis"
            );
            return Err(AnalysisError::Timeout {
                elapsed,
                ceiling: self.options.liked_songs_ceiling,
            });
        }
        if liked.is_empty() {
            warn!(stage = %Stage::LikedSongs, "no liked songs to analyze");
            return Err(AnalysisError::NoTracks);
        }
        tracing::info!(
            stage = %Stage::LikedSongs,
            tracks = liked.len(),
            elapsed_secs = elapsed.as_secs_f64(),
            "fetched liked songs"
        );
        record(
            &mut reports,
            Stage::LikedSongs,
            &StageResult::complete(()),
            &budget,
        );

        // 3. playlists
        let playlists = if !self.options.include_playlists || self.options.playlist_limit == 0 {
            StageResult::skipped(StageReason::Disabled)
        } else if budget.exceeded(PLAYLISTS_GATE) {
            StageResult::skipped(budget_reason(&budget, PLAYLISTS_GATE))
        } else {
            self.fetch_playlist_tracks().await
        };
        record(&mut reports, Stage::Playlists, &playlists, &budget);

        // 4. dedup
        let liked_ids: Vec<String> = liked.iter().map(|t| t.id.clone()).collect();
        let mut tracks = liked;
        tracks.extend(playlists.data);
        utils::remove_duplicate_tracks(&mut tracks);
        record(
            &mut reports,
            Stage::Dedup,
            &StageResult::complete(()),
            &budget,
        );
        debug!(stage = %Stage::Dedup, unique_tracks = tracks.len());

        // 5. artist ranking
        let unique_artist_count = tracks
            .iter()
            .flat_map(|t| t.artist_ids())
            .collect::<HashSet<_>>()
            .len();
        let top_artists = rank_artists(&tracks, TOP_ARTISTS);
        record(
            &mut reports,
            Stage::Artists,
            &StageResult::complete(()),
            &budget,
        );

        // 6. genres
        let genres = if budget.exceeded(GENRES_GATE) {
            StageResult::skipped(budget_reason(&budget, GENRES_GATE))
        } else {
            self.fetch_genres(&top_artists).await
        };
        record(&mut reports, Stage::Genres, &genres, &budget);

        // 7. audio features
        let track_ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let audio = if budget.exceeded(AUDIO_FEATURES_GATE) {
            StageResult::skipped(budget_reason(&budget, AUDIO_FEATURES_GATE))
        } else {
            self.fetch_audio_features(&track_ids).await
        };
        record(&mut reports, Stage::AudioFeatures, &audio, &budget);

        let mut excluded_track_ids: HashSet<String> = exclusion.data.into_iter().collect();
        excluded_track_ids.extend(liked_ids);
        if !exclusion.completed {
            excluded_track_ids.extend(track_ids.iter().cloned());
        }

        let top_genres = genres.data;
        let genre_seeds = top_genres
            .iter()
            .take(GENRE_SEEDS)
            .map(|(g, _)| g.clone())
            .collect();

        let analysis_time = budget.elapsed();
        if analysis_time > budget.total() {
            warn!(
                elapsed_secs = analysis_time.as_secs_f64(),
                budget_secs = budget.total().as_secs_f64(),
                "analysis overran its budget"
            );
        }
        tracing::info!(
            tracks = tracks.len(),
            excluded = excluded_track_ids.len(),
            elapsed_secs = analysis_time.as_secs_f64(),
            "analysis complete"
        );

        Ok(TasteProfile {
            track_count: tracks.len(),
            unique_artist_count,
            track_ids,
            top_genres,
            genre_seeds,
            top_artists,
            audio_features: audio.data,
            excluded_track_ids,
            analysis_time_secs: analysis_time.as_secs_f64(),
            stages: reports,
        })
    }

    /// Walks the saved tracks forward, page by page, up to the exclusion limit.
    async fn fetch_exclusion_ids(&self) -> StageResult<Vec<String>> {
        let limit = self.options.exclusion_limit;
        let api = self.api;
        let mut ids = Vec::new();
        let mut offset = 0;

        while ids.len() < limit && offset < limit {
            let page = match with_retry(Stage::Exclusion, move || {
                api.liked_tracks(MAX_PAGE_SIZE, offset)
            })
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(stage = %Stage::Exclusion, offset, error = %e, "using partial exclusion list");
                    let collected = ids.len();
                    return StageResult::interrupted(ids, collected, e);
                }
            };

            if page.raw_count == 0 {
                break;
            }
            ids.extend(page.items.into_iter().map(|t| t.id));
            offset += page.raw_count;
            if !page.has_more {
                break;
            }
        }

        ids.truncate(limit);
        debug!(stage = %Stage::Exclusion, ids = ids.len(), "exclusion ids fetched");
        StageResult::complete(ids)
    }

    /// One page of liked songs at a random offset, falling back to the start of the
    /// library when the offset lands past the end.
    async fn fetch_liked_songs(&self) -> Result<Vec<Track>, ApiError> {
        let limit = self.options.liked_songs_limit.min(MAX_PAGE_SIZE);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let api = self.api;
        let offset = rand::rng().random_range(0..=self.options.liked_offset_max);
        debug!(stage = %Stage::LikedSongs, offset, "fetching liked songs");

        let mut page = with_retry(Stage::LikedSongs, move || api.liked_tracks(limit, offset)).await?;
        if page.raw_count == 0 && offset > 0 {
            debug!(stage = %Stage::LikedSongs, offset, "no liked songs at offset, retrying from 0");
            page = with_retry(Stage::LikedSongs, move || api.liked_tracks(limit, 0)).await?;
        }

        let mut tracks = page.items;
        tracks.truncate(self.options.liked_songs_limit);
        Ok(tracks)
    }

    async fn fetch_playlist_tracks(&self) -> StageResult<Vec<Track>> {
        let api = self.api;
        let playlist_limit = self.options.playlist_limit;
        let per_playlist = self.options.tracks_per_playlist;
        let mut tracks = Vec::new();

        let mut playlists = Vec::new();
        let mut offset = 0;
        while playlists.len() < playlist_limit {
            let want = (playlist_limit - playlists.len()).min(MAX_PAGE_SIZE);
            match with_retry(Stage::Playlists, move || api.user_playlists(want, offset)).await {
                Ok(page) => {
                    let consumed = page.raw_count;
                    playlists.extend(page.items);
                    if consumed == 0 || !page.has_more {
                        break;
                    }
                    offset += consumed;
                }
                Err(e) => {
                    warn!(stage = %Stage::Playlists, error = %e, "playlist listing failed");
                    return StageResult::interrupted(tracks, 0, e);
                }
            }
        }
        playlists.truncate(playlist_limit);

        for playlist in &playlists {
            let id = playlist.id.as_str();
            let mut collected = 0;
            let mut offset = 0;
            while collected < per_playlist {
                let want = (per_playlist - collected).min(100);
                match with_retry(Stage::Playlists, move || api.playlist_tracks(id, want, offset))
                    .await
                {
                    Ok(page) => {
                        let consumed = page.raw_count;
                        let valid: Vec<Track> = page.items.into_iter().take(want).collect();
                        collected += valid.len();
                        tracks.extend(valid);
                        if consumed == 0 || !page.has_more {
                            break;
                        }
                        offset += consumed;
                    }
                    Err(e) => {
                        warn!(stage = %Stage::Playlists, playlist = %playlist.name, error = %e, "playlist tracks fetch failed");
                        let collected = tracks.len();
                        return StageResult::interrupted(tracks, collected, e);
                    }
                }
            }
        }

        tracing::info!(stage = %Stage::Playlists, playlists = playlists.len(), tracks = tracks.len(), "added playlist tracks");
        StageResult::complete(tracks)
    }

    async fn fetch_genres(&self, top_artists: &[RankedArtist]) -> StageResult<Vec<(String, usize)>> {
        if top_artists.is_empty() {
            return StageResult::complete(Vec::new());
        }
        let api = self.api;
        let ids: Vec<String> = top_artists.iter().map(|a| a.id.clone()).collect();
        let ids = ids.as_slice();

        let artists: Vec<Artist> = match with_retry(Stage::Genres, move || api.artists(ids)).await {
            Ok(artists) => artists,
            Err(e) => {
                warn!(stage = %Stage::Genres, error = %e, "genre lookup failed");
                return StageResult::interrupted(Vec::new(), 0, e);
            }
        };

        let genres = tally_genres(top_artists, &artists, TOP_GENRES);
        debug!(stage = %Stage::Genres, genres = genres.len());
        StageResult::complete(genres)
    }

    async fn fetch_audio_features(&self, track_ids: &[String]) -> StageResult<AudioProfile> {
        let sample = sample_ids(
            track_ids,
            self.options.audio_sample_size,
            self.options.audio_sample_seed,
        );
        if sample.is_empty() {
            return StageResult::complete(AudioProfile::new());
        }
        let api = self.api;
        let ids = sample.as_slice();

        match with_retry(Stage::AudioFeatures, move || api.audio_features(ids)).await {
            Ok(features) => {
                let averages = average_features(features.values());
                debug!(stage = %Stage::AudioFeatures, sampled = sample.len(), reported = features.len());
                StageResult::complete(averages)
            }
            Err(e) => {
                warn!(stage = %Stage::AudioFeatures, error = %e, "audio features unavailable");
                StageResult::interrupted(AudioProfile::new(), 0, e)
            }
        }
    }
}

fn budget_reason(budget: &Budget, fraction: f64) -> StageReason {
    StageReason::BudgetExceeded {
        elapsed: budget.elapsed(),
        threshold: budget.threshold(fraction),
    }
}

fn record<T>(reports: &mut Vec<StageReport>, stage: Stage, result: &StageResult<T>, budget: &Budget) {
    if let Some(reason) = &result.reason {
        match reason {
            StageReason::Disabled => debug!(%stage, "stage disabled"),
            reason => warn!(%stage, %reason, "stage incomplete"),
        }
    }
    reports.push(StageReport {
        stage,
        completed: result.completed,
        reason: result.reason.as_ref().map(|r| r.to_string()),
        finished_at_secs: round_secs(budget.elapsed()),
    });
}

fn round_secs(d: Duration) -> f64 {
    (d.as_secs_f64() * 100.0).round() / 100.0
}
