//! # Spotify Integration Module
//!
//! The boundary between tastemix and the Spotify Web API.
//!
//! ```text
//! Analysis / Recommendation / Mirror
//!          ↓
//!     MusicApi (trait)
//!          ↓
//!     SpotifyClient (reqwest, JSON)
//!          ↓
//!     Spotify Web API
//! ```
//!
//! [`MusicApi`] lists exactly the operations the core needs. Implementations hand
//! back validated domain records from [`crate::types`] and classify every failure
//! into [`ApiError`]; they do not retry; retry policy belongs to the caller.
//!
//! [`auth`] implements the OAuth 2.0 PKCE flow that supplies the access token.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    types::{Album, Artist, AudioFeatures, CreatedPlaylist, Page, PlaylistRef, TimeRange, Track},
};

pub mod auth;
mod client;

pub use client::SpotifyClient;

/// Maximum ids per `GET /artists` call.
pub const MAX_ARTISTS_PER_CALL: usize = 50;
/// Maximum ids per `GET /audio-features` call.
pub const MAX_AUDIO_FEATURES_PER_CALL: usize = 100;
/// Maximum uris per add-items call, a platform constraint.
pub const MAX_TRACKS_PER_ADD: usize = 100;
/// Maximum page size of the saved-tracks and playlists listings.
pub const MAX_PAGE_SIZE: usize = 50;

/// The operations tastemix consumes from the music streaming service.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Id of the user the credential belongs to.
    async fn current_user_id(&self) -> Result<String, ApiError>;

    async fn liked_tracks(&self, limit: usize, offset: usize) -> Result<Page<Track>, ApiError>;

    async fn user_playlists(&self, limit: usize, offset: usize)
    -> Result<Page<PlaylistRef>, ApiError>;

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Track>, ApiError>;

    /// Artist records with their platform-native genres, at most 50 ids per call.
    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError>;

    /// Audio features keyed by track id, at most 100 ids per call. Tracks without
    /// features are simply absent from the map.
    async fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, ApiError>;

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>, ApiError>;

    /// May be permanently unavailable for the application; callers treat failure
    /// and emptiness alike.
    async fn related_artists(&self, artist_id: &str) -> Result<Vec<Artist>, ApiError>;

    /// Albums and singles, newest first.
    async fn artist_albums(&self, artist_id: &str, limit: usize) -> Result<Vec<Album>, ApiError>;

    /// Album tracks. The listing carries no album metadata or popularity.
    async fn album_tracks(&self, album_id: &str, limit: usize) -> Result<Vec<Track>, ApiError>;

    async fn user_top_artists(
        &self,
        limit: usize,
        time_range: TimeRange,
    ) -> Result<Vec<Artist>, ApiError>;

    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Artist>, ApiError>;

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<CreatedPlaylist, ApiError>;

    /// At most [`MAX_TRACKS_PER_ADD`] uris per call.
    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String])
    -> Result<(), ApiError>;
}
