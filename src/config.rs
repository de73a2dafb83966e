//! Configuration management for tastemix.
//!
//! Values come from environment variables, optionally pre-populated from a `.env`
//! file in the local data directory. Everything except the client id has a
//! sensible default, so a fresh install only needs `SPOTIFY_API_AUTH_CLIENT_ID`.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults
//!
//! The tuning records [`AnalysisOptions`] and [`EngineSettings`] live here as well.
//! They are plain values handed to the analyzer and the recommendation engine, so
//! the core never reads the environment itself.

use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
const DEFAULT_SCOPE: &str =
    "user-library-read playlist-read-private playlist-modify-public playlist-modify-private user-top-read user-read-private";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 2;
const DEFAULT_MUSICBRAINZ_URL: &str = "https://musicbrainz.org/ws/2";

/// Root of everything tastemix keeps on disk.
///
/// - Linux: `~/.local/share/tastemix`
/// - macOS: `~/Library/Application Support/tastemix`
/// - Windows: `%LOCALAPPDATA%/tastemix`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tastemix");
    path
}

/// Loads environment variables from `<data_dir>/.env`.
///
/// Creates the data directory if needed. A missing `.env` file is fine, the
/// process environment and the defaults below still apply.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file exists
/// but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| e.to_string())?;

    let path = dir.join(".env");
    if !path.exists() {
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Address the local OAuth callback server binds to.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Client id of the registered Spotify application.
///
/// # Errors
///
/// This is the one setting without a default.
pub fn spotify_client_id() -> Result<String, String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            format!(
                "SPOTIFY_API_AUTH_CLIENT_ID must be set (environment or {})",
                data_dir().join(".env").display()
            )
        })
}

/// Must match the redirect URI registered with the Spotify application.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Space separated OAuth scopes. The default covers reading the library and top
/// artists plus modifying playlists.
pub fn spotify_scope() -> String {
    var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

pub fn spotify_apiauth_url() -> String {
    var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn spotify_apitoken_url() -> String {
    var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Base URL of the Web API, without trailing slash.
pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
        .trim_end_matches('/')
        .to_string()
}

/// Per-call network timeout of the API client.
///
/// The analysis budget only gates when a stage may start, so this is what bounds
/// a single slow call.
pub fn request_timeout() -> Duration {
    let secs = env::var("TASTEMIX_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

pub fn musicbrainz_apiurl() -> String {
    var_or("MUSICBRAINZ_API_URL", DEFAULT_MUSICBRAINZ_URL)
        .trim_end_matches('/')
        .to_string()
}

/// MusicBrainz rejects anonymous clients, so a contact-bearing agent is always sent.
pub fn musicbrainz_user_agent() -> String {
    let default = format!(
        "{}/{} ( https://github.com/tastemix )",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    var_or("MUSICBRAINZ_USER_AGENT", &default)
}

/// Inputs of a taste analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub include_playlists: bool,
    pub playlist_limit: usize,
    pub tracks_per_playlist: usize,
    pub liked_songs_limit: usize,
    /// Upper bound of the random page offset used for the liked-songs sample.
    /// `0` always reads from the start of the library.
    pub liked_offset_max: usize,
    /// Wall-clock budget that gates when optional stages may start.
    pub max_analysis_time: Duration,
    /// Absolute ceiling for the mandatory liked-songs stage, independent of the budget.
    pub liked_songs_ceiling: Duration,
    /// How many liked track ids to collect for the exclusion set.
    pub exclusion_limit: usize,
    pub audio_sample_size: usize,
    /// Seed of the audio-feature sample, so that one sub-step is reproducible.
    pub audio_sample_seed: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_playlists: false,
            playlist_limit: 0,
            tracks_per_playlist: 3,
            liked_songs_limit: 15,
            liked_offset_max: 150,
            max_analysis_time: Duration::from_secs(20),
            liked_songs_ceiling: Duration::from_secs(10),
            exclusion_limit: 200,
            audio_sample_size: 15,
            audio_sample_seed: 42,
        }
    }
}

/// Knobs of the recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Size of the artist working set for the familiar pool.
    pub working_artists: usize,
    /// Half-width of the uniform score jitter. `0.0` makes scoring deterministic.
    pub jitter: f64,
    /// Seed for artist sub-sampling, discovery shuffling and jitter. `None` draws
    /// fresh entropy per request.
    pub shuffle_seed: Option<u64>,
    /// Upper bound of enrichment lookups that miss the cache, per request.
    pub max_new_enrichments: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            working_artists: 5,
            jitter: 5.0,
            shuffle_seed: None,
            max_new_enrichments: 5,
        }
    }
}
