use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::{enrichment::Enrichment, types::Track};

use super::{Era, Mood, UserPreferences};

const USER_ARTIST: f64 = 40.0;
const OTHER_ARTIST: f64 = 25.0;
const NATIVE_GENRE_PER_MATCH: f64 = 8.0;
const NATIVE_GENRE_CAP: f64 = 25.0;
const ENRICHED_GENRE_PER_MATCH: f64 = 5.0;
const ENRICHED_GENRE_CAP: f64 = 20.0;
const TAG_PER_TAG: f64 = 3.0;
const TAGS_COUNTED: usize = 5;
const TAG_CAP: f64 = 15.0;
const MOOD_MATCH: f64 = 10.0;
const RATING_MAX: f64 = 5.0;
const ERA_MATCH: f64 = 30.0;
const ERA_MISMATCH: f64 = -20.0;
const NEW_RELEASE: f64 = 5.0;
const RECENT_RELEASE: f64 = 3.0;
const ALBUM_REPEAT_FACTOR: f64 = 0.85;
const DISCOVERY_MAX: f64 = 10.0;

/// Everything the score of a candidate depends on besides the candidate itself.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    target_genres: HashSet<String>,
    user_artist_ids: HashSet<String>,
    /// Platform-native genres by artist id, lowercased.
    artist_genres: HashMap<String, Vec<String>>,
    enrichment: HashMap<String, Enrichment>,
    preferences: UserPreferences,
    current_year: i32,
    jitter: f64,
}

impl ScoringContext {
    pub fn new(
        target_genres: &[String],
        user_artist_ids: impl IntoIterator<Item = String>,
        preferences: UserPreferences,
        current_year: i32,
    ) -> Self {
        Self {
            target_genres: target_genres.iter().map(|g| g.to_lowercase()).collect(),
            user_artist_ids: user_artist_ids.into_iter().collect(),
            artist_genres: HashMap::new(),
            enrichment: HashMap::new(),
            preferences,
            current_year,
            jitter: 0.0,
        }
    }

    pub fn with_artist_genres(mut self, artist_genres: HashMap<String, Vec<String>>) -> Self {
        self.artist_genres = artist_genres
            .into_iter()
            .map(|(id, genres)| (id, genres.iter().map(|g| g.to_lowercase()).collect()))
            .collect();
        self
    }

    pub fn with_enrichment(mut self, enrichment: HashMap<String, Enrichment>) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// Half-width of the uniform random term. Non-positive disables it.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    fn is_user_artist(&self, track: &Track) -> bool {
        track.artist_ids().any(|id| self.user_artist_ids.contains(id))
    }

    fn genre_matches<'g>(&self, genres: impl IntoIterator<Item = &'g String>) -> usize {
        genres
            .into_iter()
            .filter(|g| self.target_genres.contains(&g.to_lowercase()))
            .count()
    }
}

fn popularity_score(popularity: u8) -> f64 {
    match popularity {
        40..=80 => 10.0,
        81.. => 7.0,
        20..=39 => 5.0,
        _ => 2.0,
    }
}

fn enrichment_score(enrichment: &Enrichment, ctx: &ScoringContext) -> f64 {
    let mut score = 0.0;

    let genre_matches = ctx.genre_matches(&enrichment.genres);
    if genre_matches > 0 {
        score += (genre_matches as f64 * ENRICHED_GENRE_PER_MATCH).min(ENRICHED_GENRE_CAP);
    }

    if !enrichment.tags.is_empty() {
        let counted = enrichment.tags.len().min(TAGS_COUNTED);
        score += (counted as f64 * TAG_PER_TAG).min(TAG_CAP);

        let mood_tags = ctx.preferences.mood.tags();
        if ctx.preferences.mood != Mood::Any
            && enrichment
                .tags
                .iter()
                .any(|t| mood_tags.contains(&t.to_lowercase().as_str()))
        {
            score += MOOD_MATCH;
        }
    }

    if enrichment.rating > 0.0 {
        score += enrichment.rating.min(100.0) / 100.0 * RATING_MAX;
    }

    score
}

fn era_score(year: i32, era: Era, current_year: i32) -> f64 {
    match era {
        Era::Any if year >= current_year - 1 => NEW_RELEASE,
        Era::Any if year >= current_year - 3 => RECENT_RELEASE,
        Era::Any => 0.0,
        era if era.matches(year) => ERA_MATCH,
        _ => ERA_MISMATCH,
    }
}

/// Additive heuristic score of one candidate.
///
/// `seen_albums` holds the albums of the candidates scored earlier in the same
/// pass; a repeat multiplies the running score by 0.85 before the discovery and
/// random terms are added.
pub fn score_track<R: Rng>(
    track: &Track,
    ctx: &ScoringContext,
    seen_albums: &HashSet<String>,
    rng: &mut R,
) -> f64 {
    let is_user_artist = ctx.is_user_artist(track);
    let primary = track.primary_artist_id();

    let mut score = if is_user_artist {
        USER_ARTIST
    } else {
        OTHER_ARTIST
    };

    if let Some(genres) = primary.and_then(|id| ctx.artist_genres.get(id)) {
        let matches = ctx.genre_matches(genres);
        if matches > 0 {
            score += (matches as f64 * NATIVE_GENRE_PER_MATCH).min(NATIVE_GENRE_CAP);
        }
    }

    score += popularity_score(track.popularity);

    if let Some(enrichment) = primary.and_then(|id| ctx.enrichment.get(id)) {
        score += enrichment_score(enrichment, ctx);
    }

    if let Some(year) = track.release_year() {
        score += era_score(year, ctx.preferences.era, ctx.current_year);
    }

    if track
        .album_id
        .as_ref()
        .is_some_and(|album| seen_albums.contains(album))
    {
        score *= ALBUM_REPEAT_FACTOR;
    }

    let discovery = ctx.preferences.discovery() as f64;
    if discovery > 50.0 && !is_user_artist {
        score += (discovery - 50.0) / 50.0 * DISCOVERY_MAX;
    } else if discovery < 50.0 && is_user_artist {
        score += (50.0 - discovery) / 50.0 * DISCOVERY_MAX;
    }

    if ctx.jitter > 0.0 {
        score += rng.random_range(-ctx.jitter..=ctx.jitter);
    }

    score
}
