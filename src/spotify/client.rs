use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, header::RETRY_AFTER};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    config,
    error::ApiError,
    types::{
        AddTrackToPlaylistRequest, Album, AlbumTracksPage, AlbumsPage, Artist, ArtistItemsPage,
        ArtistsResponse, AudioFeatures, AudioFeaturesResponse, CreatePlaylistRequest,
        CreatePlaylistResponse, CreatedPlaylist, Page, PlaylistItemsPage, PlaylistRef,
        PlaylistsPage, SavedTracksPage, SearchArtistsResponse, TimeRange, TopTracksResponse,
        Track, UserProfile,
    },
};

use super::{MAX_ARTISTS_PER_CALL, MAX_AUDIO_FEATURES_PER_CALL, MAX_PAGE_SIZE, MusicApi};

/// reqwest-backed [`MusicApi`].
///
/// Every call is bounded by the per-call timeout configured on the HTTP client;
/// that is the only preemption there is.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    /// Client against the configured API url and request timeout.
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(config::spotify_apiurl(), token, config::request_timeout())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turns non-success responses into the error taxonomy.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    Err(ApiError::from_status(status, retry_after, message))
}

fn tracks_of(items: impl IntoIterator<Item = crate::types::SavedTrackItem>) -> Vec<Track> {
    items
        .into_iter()
        .filter_map(|item| item.track)
        .filter_map(|track| track.into_track())
        .collect()
}

#[async_trait]
impl MusicApi for SpotifyClient {
    async fn current_user_id(&self) -> Result<String, ApiError> {
        let profile: UserProfile = self.get("me", &[]).await?;
        Ok(profile.id)
    }

    async fn liked_tracks(&self, limit: usize, offset: usize) -> Result<Page<Track>, ApiError> {
        let page: SavedTracksPage = self
            .get(
                "me/tracks",
                &[
                    ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        let has_more = page.next.is_some();
        let raw_count = page.items.len();
        Ok(Page::new(tracks_of(page.items), has_more).with_raw_count(raw_count))
    }

    async fn user_playlists(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlaylistRef>, ApiError> {
        let page: PlaylistsPage = self
            .get(
                "me/playlists",
                &[
                    ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        let has_more = page.next.is_some();
        let raw_count = page.items.len();
        let playlists = page
            .items
            .into_iter()
            .flatten()
            .filter_map(|p| {
                Some(PlaylistRef {
                    id: p.id.filter(|id| !id.is_empty())?,
                    name: p.name,
                })
            })
            .collect();
        Ok(Page::new(playlists, has_more).with_raw_count(raw_count))
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Track>, ApiError> {
        let page: PlaylistItemsPage = self
            .get(
                &format!("playlists/{}/tracks", playlist_id),
                &[
                    ("limit", limit.clamp(1, 100).to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        let has_more = page.next.is_some();
        let raw_count = page.items.len();
        Ok(Page::new(tracks_of(page.items), has_more).with_raw_count(raw_count))
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        let mut artists = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_ARTISTS_PER_CALL) {
            let response: ArtistsResponse =
                self.get("artists", &[("ids", chunk.join(","))]).await?;
            artists.extend(
                response
                    .artists
                    .into_iter()
                    .flatten()
                    .filter_map(|a| a.into_artist()),
            );
        }
        Ok(artists)
    }

    async fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, ApiError> {
        let mut features = HashMap::with_capacity(track_ids.len());
        for chunk in track_ids.chunks(MAX_AUDIO_FEATURES_PER_CALL) {
            let response: AudioFeaturesResponse = self
                .get("audio-features", &[("ids", chunk.join(","))])
                .await?;
            for entry in response.audio_features.into_iter().flatten() {
                if let Some(id) = entry.id.clone() {
                    features.insert(id, AudioFeatures::from(entry));
                }
            }
        }
        Ok(features)
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>, ApiError> {
        let response: TopTracksResponse = self
            .get(
                &format!("artists/{}/top-tracks", artist_id),
                &[("market", "from_token".to_string())],
            )
            .await?;
        Ok(response
            .tracks
            .into_iter()
            .filter_map(|t| t.into_track())
            .collect())
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Vec<Artist>, ApiError> {
        let response: ArtistsResponse = self
            .get(&format!("artists/{}/related-artists", artist_id), &[])
            .await?;
        Ok(response
            .artists
            .into_iter()
            .flatten()
            .filter_map(|a| a.into_artist())
            .collect())
    }

    async fn artist_albums(&self, artist_id: &str, limit: usize) -> Result<Vec<Album>, ApiError> {
        let page: AlbumsPage = self
            .get(
                &format!("artists/{}/albums", artist_id),
                &[
                    ("include_groups", "album,single".to_string()),
                    ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
                ],
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|a| a.into_album())
            .collect())
    }

    async fn album_tracks(&self, album_id: &str, limit: usize) -> Result<Vec<Track>, ApiError> {
        let page: AlbumTracksPage = self
            .get(
                &format!("albums/{}/tracks", album_id),
                &[("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string())],
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|t| t.into_track())
            .collect())
    }

    async fn user_top_artists(
        &self,
        limit: usize,
        time_range: TimeRange,
    ) -> Result<Vec<Artist>, ApiError> {
        let page: ArtistItemsPage = self
            .get(
                "me/top/artists",
                &[
                    ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
                    ("time_range", time_range.to_string()),
                ],
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|a| a.into_artist())
            .collect())
    }

    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Artist>, ApiError> {
        let response: SearchArtistsResponse = self
            .get(
                "search",
                &[
                    ("q", format!("genre:\"{}\"", genre)),
                    ("type", "artist".to_string()),
                    ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
                ],
            )
            .await?;
        Ok(response
            .artists
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.into_artist())
            .collect())
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<CreatedPlaylist, ApiError> {
        let request = CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public,
        };
        let response: CreatePlaylistResponse = self
            .post(&format!("users/{}/playlists", owner_id), &request)
            .await?;
        Ok(CreatedPlaylist {
            id: response.id,
            url: response.external_urls.spotify,
        })
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), ApiError> {
        let request = AddTrackToPlaylistRequest {
            uris: uris.to_vec(),
        };
        let _: Value = self
            .post(&format!("playlists/{}/tracks", playlist_id), &request)
            .await?;
        Ok(())
    }
}
