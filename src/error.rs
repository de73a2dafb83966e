//! Typed errors shared by the analysis, recommendation and playlist layers.
//!
//! Upstream failures are classified exactly once, at the API client boundary, into
//! [`ApiError`]. Callers only look at the category: rate limiting means "retry
//! later", authorization problems mean "re-consent", network problems mean "check
//! the connection".

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::analysis::Stage;

/// A classified failure of a call against the music streaming API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("rate limited by the API (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("access token rejected: {0}")]
    Unauthorized(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: StatusCode, retry_after: Option<u64>, message: String) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after },
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::PermissionDenied(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Status {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Connection failures and timeouts. These never retry.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Failures worth one more attempt after a short pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Server { .. })
    }

    /// Suggested pause before retrying a transient failure.
    pub fn backoff(&self) -> Duration {
        match self {
            ApiError::RateLimited {
                retry_after: Some(secs),
            } => Duration::from_secs((*secs).min(2)),
            _ => Duration::from_millis(500),
        }
    }

    /// What the user should do about it.
    pub fn guidance(&self) -> &'static str {
        match self {
            ApiError::RateLimited { .. } => {
                "Rate limit exceeded. Please wait a moment and try again."
            }
            ApiError::Unauthorized(_) => "Your session expired. Please run `tastemix auth` again.",
            ApiError::PermissionDenied(_) => {
                "Permission denied. Re-run `tastemix auth` to grant the required scopes and make sure your account is on the app's allow list in the developer dashboard."
            }
            ApiError::Network(_) => {
                "Network error or timeout. Please check your connection and try again."
            }
            ApiError::NotFound(_)
            | ApiError::Server { .. }
            | ApiError::Status { .. }
            | ApiError::Decode(_) => "The music API returned an unexpected response.",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return ApiError::Network(err.to_string());
        }
        if err.is_decode() || err.is_body() {
            return ApiError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => ApiError::from_status(status, None, err.to_string()),
            None => ApiError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// The fatal outcomes of a taste analysis. Every other stage failure degrades
/// into an empty or partial stage result instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(
        "no tracks found to analyze; please make sure you have liked songs in your library"
    )]
    NoTracks,

    #[error("fetching liked songs took {elapsed:.1?}, exceeding the {ceiling:?} ceiling")]
    Timeout { elapsed: Duration, ceiling: Duration },

    #[error("failed to fetch liked songs: {0}")]
    LikedSongs(#[source] ApiError),
}

impl AnalysisError {
    /// Fatal analyses never carry a partial profile.
    pub fn track_count(&self) -> usize {
        0
    }

    /// The stage the analysis stopped at.
    pub fn stage(&self) -> Stage {
        Stage::LikedSongs
    }
}

/// Failures while materializing a playlist.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("no tracks to add to the playlist")]
    Empty,

    #[error("failed to create playlist: {0}")]
    Create(#[source] ApiError),

    /// Some batches may have landed already; they are not rolled back.
    #[error("playlist {playlist_id} created but adding tracks failed after {added} tracks: {source}")]
    PartialAdd {
        playlist_id: String,
        url: Option<String>,
        added: usize,
        #[source]
        source: ApiError,
    },
}

impl PlaylistError {
    pub fn guidance(&self) -> &'static str {
        match self {
            PlaylistError::Empty => "Nothing to add. Try different settings.",
            PlaylistError::Create(e) | PlaylistError::PartialAdd { source: e, .. } => {
                e.guidance()
            }
        }
    }
}

/// Failures of the metadata enrichment collaborator. Callers treat all of them as
/// "no enrichment for this artist".
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("http error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(e: reqwest::Error) -> Self {
        EnrichmentError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for EnrichmentError {
    fn from(e: serde_json::Error) -> Self {
        EnrichmentError::Parse(e.to_string())
    }
}

/// Failures of the liked-songs mirror job.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("token belongs to {actual}, expected {expected}; refusing to write to another account")]
    UserMismatch { expected: String, actual: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Playlist(#[from] PlaylistError),
}

impl MirrorError {
    pub fn guidance(&self) -> &'static str {
        match self {
            MirrorError::UserMismatch { .. } => "Run `tastemix auth` again with the right account.",
            MirrorError::Api(e) => e.guidance(),
            MirrorError::Playlist(e) => e.guidance(),
        }
    }
}
