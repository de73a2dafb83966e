use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// Raw token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Wire records. Everything the API may omit or null out is optional here; the
// conversion into domain records below is where required fields are enforced.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRefObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRefObject>,
    pub album: Option<AlbumObject>,
    pub popularity: Option<u8>,
    /// `"track"` or `"episode"` for playlist items.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTracksPage {
    #[serde(default)]
    pub items: Vec<SavedTrackItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsPage {
    #[serde(default)]
    pub items: Vec<Option<PlaylistObject>>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<SavedTrackItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ArtistObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistItemsPage {
    #[serde(default)]
    pub items: Vec<ArtistObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArtistsResponse {
    pub artists: Option<ArtistItemsPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumsPage {
    #[serde(default)]
    pub items: Vec<AlbumObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumTracksPage {
    #[serde(default)]
    pub items: Vec<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesObject {
    pub id: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeaturesObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

// ---------------------------------------------------------------------------
// Domain records.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub id: Option<String>,
    pub name: String,
}

/// A validated track. Tracks without an id never make it this far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<ArtistCredit>,
    pub album_id: Option<String>,
    pub release_date: Option<String>,
    pub popularity: u8,
}

impl Track {
    pub fn artist_ids(&self) -> impl Iterator<Item = &str> {
        self.artists.iter().filter_map(|a| a.id.as_deref())
    }

    pub fn primary_artist_id(&self) -> Option<&str> {
        self.artist_ids().next()
    }

    pub fn primary_artist_name(&self) -> &str {
        self.artists
            .first()
            .map(|a| a.name.as_str())
            .unwrap_or("Unknown")
    }

    /// Four-digit year prefix of the album release date, if parseable.
    pub fn release_year(&self) -> Option<i32> {
        crate::utils::release_year(self.release_date.as_deref()?)
    }
}

impl TrackObject {
    /// Validates the record. Episodes, local files without id and null entries are
    /// dropped here instead of deep in the scoring logic.
    pub fn into_track(self) -> Option<Track> {
        if matches!(self.kind.as_deref(), Some(kind) if kind != "track") {
            return None;
        }
        let id = self.id.filter(|id| !id.is_empty())?;
        let uri = self
            .uri
            .filter(|uri| !uri.is_empty())
            .unwrap_or_else(|| format!("spotify:track:{}", id));
        let (album_id, release_date) = match self.album {
            Some(album) => (album.id, album.release_date),
            None => (None, None),
        };

        Some(Track {
            id,
            uri,
            name: self.name,
            artists: self
                .artists
                .into_iter()
                .map(|a| ArtistCredit {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
            album_id,
            release_date,
            popularity: self.popularity.unwrap_or(0).min(100),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
}

impl ArtistObject {
    pub fn into_artist(self) -> Option<Artist> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Artist {
            id,
            name: self.name,
            genres: self.genres,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub release_date: Option<String>,
}

impl AlbumObject {
    pub fn into_album(self) -> Option<Album> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Album {
            id,
            name: self.name,
            release_date: self.release_date,
        })
    }
}

/// Per-track audio characteristics. Any dimension may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
}

impl AudioFeatures {
    pub const DIMENSIONS: [&'static str; 7] = [
        "danceability",
        "energy",
        "valence",
        "acousticness",
        "instrumentalness",
        "speechiness",
        "tempo",
    ];

    /// Values in [`Self::DIMENSIONS`] order.
    pub fn values(&self) -> [Option<f64>; 7] {
        [
            self.danceability,
            self.energy,
            self.valence,
            self.acousticness,
            self.instrumentalness,
            self.speechiness,
            self.tempo,
        ]
    }
}

impl From<AudioFeaturesObject> for AudioFeatures {
    fn from(o: AudioFeaturesObject) -> Self {
        AudioFeatures {
            danceability: o.danceability,
            energy: o.energy,
            valence: o.valence,
            acousticness: o.acousticness,
            instrumentalness: o.instrumentalness,
            speechiness: o.speechiness,
            tempo: o.tempo,
        }
    }
}

/// One page of a paginated listing.
///
/// `items` only holds the entries that passed validation. `raw_count` is the
/// number of listing slots the page covered, including dropped episodes, local
/// files and null entries; the next page starts that many slots further.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub raw_count: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self {
            raw_count: items.len(),
            items,
            has_more,
        }
    }

    pub fn with_raw_count(mut self, raw_count: usize) -> Self {
        self.raw_count = raw_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Table rows for console output.
// ---------------------------------------------------------------------------

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub rank: usize,
    pub name: String,
    pub tracks: usize,
}

#[derive(Tabled)]
pub struct GenreTableRow {
    pub rank: usize,
    pub genre: String,
    pub count: usize,
}

#[derive(Tabled)]
pub struct StageTableRow {
    pub stage: String,
    pub completed: bool,
    pub note: String,
}

#[derive(Tabled)]
pub struct RecommendationTableRow {
    pub rank: usize,
    pub score: String,
    pub name: String,
    pub artist: String,
    pub released: String,
}
