use std::collections::{BTreeMap, HashMap, HashSet};

use rand::{SeedableRng, rngs::StdRng, seq::index};
use serde::Serialize;

use crate::types::{Artist, AudioFeatures, Track};

use super::StageReport;

/// Averaged audio features by dimension name. Dimensions without any sample are
/// absent rather than zero.
pub type AudioProfile = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedArtist {
    pub id: String,
    pub name: String,
    /// Number of analyzed tracks crediting the artist.
    pub count: usize,
}

/// Result of a taste analysis. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TasteProfile {
    pub track_count: usize,
    pub unique_artist_count: usize,
    /// Analyzed track ids, unique, in collection order.
    pub track_ids: Vec<String>,
    /// Genre and weighted frequency, descending, at most 10.
    pub top_genres: Vec<(String, usize)>,
    /// The first five of `top_genres`.
    pub genre_seeds: Vec<String>,
    /// At most 10, by frequency, ties in first-seen order.
    pub top_artists: Vec<RankedArtist>,
    pub audio_features: AudioProfile,
    /// Track ids that must never be recommended.
    pub excluded_track_ids: HashSet<String>,
    pub analysis_time_secs: f64,
    pub stages: Vec<StageReport>,
}

impl TasteProfile {
    pub fn top_artist_ids(&self) -> Vec<String> {
        self.top_artists.iter().map(|a| a.id.clone()).collect()
    }

    pub fn has_audio_features(&self) -> bool {
        !self.audio_features.is_empty()
    }

    pub fn completed_stages(&self) -> usize {
        self.stages.iter().filter(|s| s.completed).count()
    }

    pub fn is_excluded(&self, track_id: &str) -> bool {
        self.excluded_track_ids.contains(track_id)
    }
}

/// Counts artist credits across `tracks` and ranks them by frequency.
///
/// The sort is stable over first-seen order, so equal counts keep the order in
/// which the artists first appeared.
pub fn rank_artists(tracks: &[Track], limit: usize) -> Vec<RankedArtist> {
    let mut order: Vec<RankedArtist> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for track in tracks {
        for credit in &track.artists {
            let Some(id) = credit.id.as_deref() else {
                continue;
            };
            match position.get(id) {
                Some(&i) => order[i].count += 1,
                None => {
                    position.insert(id, order.len());
                    order.push(RankedArtist {
                        id: id.to_string(),
                        name: credit.name.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(limit);
    order
}

/// Tallies genres of `ranked` artists, each genre weighted by how many analyzed
/// tracks credit the artist. Equal counts keep first-seen order.
pub fn tally_genres(
    ranked: &[RankedArtist],
    artists: &[Artist],
    limit: usize,
) -> Vec<(String, usize)> {
    let genres_by_id: HashMap<&str, &Vec<String>> =
        artists.iter().map(|a| (a.id.as_str(), &a.genres)).collect();

    let mut tally: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for artist in ranked {
        let Some(genres) = genres_by_id.get(artist.id.as_str()) else {
            continue;
        };
        for genre in genres.iter() {
            match position.get(genre) {
                Some(&i) => tally[i].1 += artist.count,
                None => {
                    position.insert(genre.clone(), tally.len());
                    tally.push((genre.clone(), artist.count));
                }
            }
        }
    }

    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally.truncate(limit);
    tally
}

/// Per-dimension mean over the tracks that report a value for that dimension.
pub fn average_features<'a>(features: impl IntoIterator<Item = &'a AudioFeatures>) -> AudioProfile {
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];

    for f in features {
        for (i, value) in f.values().into_iter().enumerate() {
            if let Some(v) = value {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }

    AudioFeatures::DIMENSIONS
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, name)| (name.to_string(), sums[i] / counts[i] as f64))
        .collect()
}

/// Up to `amount` ids, uniformly sampled with a fixed seed when there are more.
pub fn sample_ids(ids: &[String], amount: usize, seed: u64) -> Vec<String> {
    if ids.len() <= amount {
        return ids.to_vec();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, ids.len(), amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| ids[i].clone()).collect()
}
