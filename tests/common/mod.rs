//! Scripted in-memory music service for the integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tastemix::{
    error::ApiError,
    spotify::MusicApi,
    types::{
        Album, Artist, ArtistCredit, AudioFeatures, CreatedPlaylist, Page, PlaylistRef, TimeRange,
        Track,
    },
};

pub const PLAYLIST_ID: &str = "created-playlist";
pub const PLAYLIST_URL: &str = "https://open.spotify.com/playlist/created-playlist";

#[derive(Default)]
pub struct FakeApi {
    pub user_id: String,
    pub liked: Vec<Track>,
    pub playlists: Vec<PlaylistRef>,
    pub playlist_tracks: HashMap<String, Vec<Track>>,
    pub artists: HashMap<String, Artist>,
    pub audio_features: HashMap<String, AudioFeatures>,
    pub top_tracks: HashMap<String, Vec<Track>>,
    pub related: HashMap<String, Vec<Artist>>,
    pub albums: HashMap<String, Vec<Album>>,
    pub album_tracks: HashMap<String, Vec<Track>>,
    pub top_artists: Vec<Artist>,
    pub genre_search: HashMap<String, Vec<Artist>>,
    /// Fail the add call with this (zero-based) index.
    pub fail_add_call: Option<usize>,
    /// Track ids that take a listing slot but never come back as tracks, like
    /// podcast episodes or local files.
    pub unplayable: HashSet<String>,
    latency: HashMap<&'static str, Duration>,
    always_fail: HashMap<&'static str, ApiError>,
    fail_next: Mutex<HashMap<&'static str, VecDeque<ApiError>>>,
    fail_at: HashMap<&'static str, (usize, ApiError)>,
    calls: Mutex<Vec<(&'static str, String)>>,
    added: Mutex<Vec<Vec<String>>>,
    created: Mutex<Vec<(String, String, bool, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            user_id: "user-1".to_string(),
            ..Default::default()
        }
    }

    pub fn with_liked(mut self, liked: Vec<Track>) -> Self {
        self.liked = liked;
        self
    }

    pub fn with_artist(mut self, id: &str, genres: &[&str]) -> Self {
        self.artists.insert(id.to_string(), artist(id, genres));
        self
    }

    /// Every call of `op` takes `latency` on the tokio clock.
    pub fn with_latency(mut self, op: &'static str, latency: Duration) -> Self {
        self.latency.insert(op, latency);
        self
    }

    /// Every call of `op` fails with `err`.
    pub fn failing(mut self, op: &'static str, err: ApiError) -> Self {
        self.always_fail.insert(op, err);
        self
    }

    /// The next call of `op` fails with `err`, later ones follow the script.
    pub fn fail_once(self, op: &'static str, err: ApiError) -> Self {
        self.fail_next
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(err);
        self
    }

    /// The call of `op` with this (zero-based) index fails with `err`.
    pub fn fail_nth(mut self, op: &'static str, index: usize, err: ApiError) -> Self {
        self.fail_at.insert(op, (index, err));
        self
    }

    pub fn calls(&self, op: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls(op).len()
    }

    pub fn added_batches(&self) -> Vec<Vec<String>> {
        self.added.lock().unwrap().clone()
    }

    pub fn added_uris(&self) -> Vec<String> {
        self.added_batches().into_iter().flatten().collect()
    }

    pub fn created_playlists(&self) -> Vec<(String, String, bool, String)> {
        self.created.lock().unwrap().clone()
    }

    async fn enter(&self, op: &'static str, args: String) -> Result<(), ApiError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((op, args));
            calls.iter().filter(|(o, _)| *o == op).count() - 1
        };
        if let Some(latency) = self.latency.get(op) {
            tokio::time::sleep(*latency).await;
        }
        let scripted = self
            .fail_next
            .lock()
            .unwrap()
            .get_mut(op)
            .and_then(|q| q.pop_front());
        if let Some(err) = scripted {
            return Err(err);
        }
        if let Some((_, err)) = self.fail_at.get(op).filter(|(n, _)| *n == index) {
            return Err(err.clone());
        }
        match self.always_fail.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn page<T: Clone>(items: &[T], limit: usize, offset: usize) -> Page<T> {
    let start = offset.min(items.len());
    let end = (offset + limit).min(items.len());
    Page::new(items[start..end].to_vec(), end < items.len())
}

impl FakeApi {
    fn track_page(&self, tracks: &[Track], limit: usize, offset: usize) -> Page<Track> {
        let raw = page(tracks, limit, offset);
        let raw_count = raw.items.len();
        let playable = raw
            .items
            .into_iter()
            .filter(|t| !self.unplayable.contains(&t.id))
            .collect();
        Page::new(playable, raw.has_more).with_raw_count(raw_count)
    }
}

#[async_trait]
impl MusicApi for FakeApi {
    async fn current_user_id(&self) -> Result<String, ApiError> {
        self.enter("current_user_id", String::new()).await?;
        Ok(self.user_id.clone())
    }

    async fn liked_tracks(&self, limit: usize, offset: usize) -> Result<Page<Track>, ApiError> {
        self.enter("liked_tracks", format!("{}:{}", limit, offset))
            .await?;
        Ok(self.track_page(&self.liked, limit, offset))
    }

    async fn user_playlists(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<PlaylistRef>, ApiError> {
        self.enter("user_playlists", format!("{}:{}", limit, offset))
            .await?;
        Ok(page(&self.playlists, limit, offset))
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Track>, ApiError> {
        self.enter("playlist_tracks", format!("{}:{}:{}", playlist_id, limit, offset))
            .await?;
        let tracks = self
            .playlist_tracks
            .get(playlist_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.track_page(&tracks, limit, offset))
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        self.enter("artists", ids.join(",")).await?;
        Ok(ids
            .iter()
            .filter_map(|id| self.artists.get(id).cloned())
            .collect())
    }

    async fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, ApiError> {
        self.enter("audio_features", track_ids.join(",")).await?;
        Ok(track_ids
            .iter()
            .filter_map(|id| {
                self.audio_features
                    .get(id)
                    .map(|f| (id.clone(), f.clone()))
            })
            .collect())
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>, ApiError> {
        self.enter("artist_top_tracks", artist_id.to_string())
            .await?;
        Ok(self.top_tracks.get(artist_id).cloned().unwrap_or_default())
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Vec<Artist>, ApiError> {
        self.enter("related_artists", artist_id.to_string()).await?;
        Ok(self.related.get(artist_id).cloned().unwrap_or_default())
    }

    async fn artist_albums(&self, artist_id: &str, limit: usize) -> Result<Vec<Album>, ApiError> {
        self.enter("artist_albums", artist_id.to_string()).await?;
        Ok(self
            .albums
            .get(artist_id)
            .map(|a| a.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn album_tracks(&self, album_id: &str, limit: usize) -> Result<Vec<Track>, ApiError> {
        self.enter("album_tracks", album_id.to_string()).await?;
        Ok(self
            .album_tracks
            .get(album_id)
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn user_top_artists(
        &self,
        limit: usize,
        _time_range: TimeRange,
    ) -> Result<Vec<Artist>, ApiError> {
        self.enter("user_top_artists", limit.to_string()).await?;
        Ok(self.top_artists.iter().take(limit).cloned().collect())
    }

    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<Artist>, ApiError> {
        self.enter("search_artists_by_genre", genre.to_string())
            .await?;
        Ok(self
            .genre_search
            .get(genre)
            .map(|a| a.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<CreatedPlaylist, ApiError> {
        self.enter("create_playlist", name.to_string()).await?;
        self.created.lock().unwrap().push((
            owner_id.to_string(),
            name.to_string(),
            public,
            description.to_string(),
        ));
        Ok(CreatedPlaylist {
            id: PLAYLIST_ID.to_string(),
            url: Some(PLAYLIST_URL.to_string()),
        })
    }

    async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), ApiError> {
        let index = self.call_count("add_tracks_to_playlist");
        self.enter("add_tracks_to_playlist", playlist_id.to_string())
            .await?;
        assert!(uris.len() <= 100, "batch of {} uris", uris.len());
        if self.fail_add_call == Some(index) {
            return Err(ApiError::Server {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        self.added.lock().unwrap().push(uris.to_vec());
        Ok(())
    }
}

pub fn artist(id: &str, genres: &[&str]) -> Artist {
    Artist {
        id: id.to_string(),
        name: format!("Artist {}", id),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn track(id: &str, artist_id: &str) -> Track {
    Track {
        id: id.to_string(),
        uri: format!("spotify:track:{}", id),
        name: format!("Track {}", id),
        artists: vec![ArtistCredit {
            id: Some(artist_id.to_string()),
            name: format!("Artist {}", artist_id),
        }],
        album_id: Some(format!("album-{}", id)),
        release_date: None,
        popularity: 50,
    }
}

pub fn dated_track(id: &str, artist_id: &str, release_date: &str) -> Track {
    Track {
        release_date: Some(release_date.to_string()),
        ..track(id, artist_id)
    }
}

/// `count` tracks `<prefix>-0 ..` by `artist_id`.
pub fn tracks_by(prefix: &str, artist_id: &str, count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| track(&format!("{}-{}", prefix, i), artist_id))
        .collect()
}

pub fn features(energy: f64, valence: f64) -> AudioFeatures {
    AudioFeatures {
        energy: Some(energy),
        valence: Some(valence),
        ..Default::default()
    }
}
