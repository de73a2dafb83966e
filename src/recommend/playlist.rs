use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::PlaylistError,
    spotify::{MAX_TRACKS_PER_ADD, MusicApi},
    types::{CreatedPlaylist, Track},
    utils,
};

pub const DEFAULT_PLAYLIST_DESCRIPTION: &str =
    "Personalized recommendations based on your music taste";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistOutcome {
    pub playlist_id: String,
    pub url: Option<String>,
    pub name: String,
    pub track_count: usize,
}

/// Adds `uris` in order, at most 100 per call. `on_batch` receives the running
/// total after every successful batch.
///
/// A failing batch aborts the remaining ones. Batches that already landed stay in
/// the playlist.
pub async fn add_tracks_in_batches(
    api: &dyn MusicApi,
    playlist: &CreatedPlaylist,
    uris: &[String],
    mut on_batch: impl FnMut(usize),
) -> Result<usize, PlaylistError> {
    let mut added = 0;

    for chunk in uris.chunks(MAX_TRACKS_PER_ADD) {
        if let Err(source) = api.add_tracks_to_playlist(&playlist.id, chunk).await {
            warn!(playlist = %playlist.id, added, error = %source, "adding tracks failed");
            return Err(PlaylistError::PartialAdd {
                playlist_id: playlist.id.clone(),
                url: playlist.url.clone(),
                added,
                source,
            });
        }
        added += chunk.len();
        debug!(playlist = %playlist.id, added, "batch added");
        on_batch(added);
    }

    Ok(added)
}

/// Creates a playlist owned by `user_id` and fills it with `tracks` in order.
///
/// `name` defaults to "Recommended Tracks - <today>". Nothing is created for an
/// empty track list.
pub async fn create_recommendation_playlist(
    api: &dyn MusicApi,
    user_id: &str,
    tracks: &[Track],
    name: Option<&str>,
    description: Option<&str>,
    public: bool,
) -> Result<PlaylistOutcome, PlaylistError> {
    if tracks.is_empty() {
        return Err(PlaylistError::Empty);
    }

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| utils::default_recommendation_playlist_name(utils::today()));
    let description = description.unwrap_or(DEFAULT_PLAYLIST_DESCRIPTION);

    let playlist = api
        .create_playlist(user_id, &name, public, description)
        .await
        .map_err(PlaylistError::Create)?;
    tracing::info!(playlist = %playlist.id, %name, "playlist created");

    let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
    let track_count = add_tracks_in_batches(api, &playlist, &uris, |_| {}).await?;

    Ok(PlaylistOutcome {
        playlist_id: playlist.id,
        url: playlist.url,
        name,
        track_count,
    })
}
