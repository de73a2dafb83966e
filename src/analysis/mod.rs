//! Taste analysis.
//!
//! [`TasteAnalyzer`] runs a fixed sequence of stages against a wall-clock
//! [`Budget`]. Optional stages are gated on how much of the budget is already used
//! and are skipped entirely once their threshold has passed. Only the liked-songs
//! stage can fail the analysis; every other stage degrades into an empty or
//! partial [`StageResult`].
//!
//! | Stage | Gate (budget used) | On failure |
//! |---|---|---|
//! | exclusion | none | partial id list |
//! | liked songs | absolute ceiling | fatal |
//! | playlists | 30% | whatever was collected |
//! | dedup, artists | none | cannot fail |
//! | genres | 50% | empty |
//! | audio features | 60% | empty |

use std::{fmt, time::Duration};

use serde::Serialize;

use crate::error::ApiError;

mod analyzer;
mod budget;
mod profile;

pub use analyzer::{TasteAnalyzer, analyze};
pub use budget::Budget;
pub use profile::{
    AudioProfile, RankedArtist, TasteProfile, average_features, rank_artists, sample_ids,
    tally_genres,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Exclusion,
    LikedSongs,
    Playlists,
    Dedup,
    Artists,
    Genres,
    AudioFeatures,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Exclusion => "exclusion",
            Stage::LikedSongs => "liked_songs",
            Stage::Playlists => "playlists",
            Stage::Dedup => "dedup",
            Stage::Artists => "artists",
            Stage::Genres => "genres",
            Stage::AudioFeatures => "audio_features",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage did not complete.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReason {
    /// Skipped: the stage's share of the budget was already used up.
    BudgetExceeded { elapsed: Duration, threshold: Duration },
    /// Skipped: turned off by the options.
    Disabled,
    /// Ran and failed before collecting anything.
    Failed(ApiError),
    /// Ran, collected some data, then failed.
    Partial(ApiError),
}

impl fmt::Display for StageReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageReason::BudgetExceeded { elapsed, threshold } => write!(
                f,
                "skipped, {:.1}s elapsed exceeds {:.1}s",
                elapsed.as_secs_f64(),
                threshold.as_secs_f64()
            ),
            StageReason::Disabled => f.write_str("disabled"),
            StageReason::Failed(e) => write!(f, "failed: {}", e),
            StageReason::Partial(e) => write!(f, "partial: {}", e),
        }
    }
}

/// Outcome of one analysis stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult<T> {
    pub data: T,
    pub completed: bool,
    pub reason: Option<StageReason>,
}

impl<T> StageResult<T> {
    pub fn complete(data: T) -> Self {
        Self {
            data,
            completed: true,
            reason: None,
        }
    }

    pub fn incomplete(data: T, reason: StageReason) -> Self {
        Self {
            data,
            completed: false,
            reason: Some(reason),
        }
    }

    /// Partial when something was collected before `error`, failed otherwise.
    pub fn interrupted(data: T, collected: usize, error: ApiError) -> Self {
        let reason = if collected > 0 {
            StageReason::Partial(error)
        } else {
            StageReason::Failed(error)
        };
        Self::incomplete(data, reason)
    }
}

impl<T: Default> StageResult<T> {
    pub fn skipped(reason: StageReason) -> Self {
        Self::incomplete(T::default(), reason)
    }
}

/// Per-stage record kept in the profile for observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub completed: bool,
    pub reason: Option<String>,
    /// Budget clock when the stage finished, in seconds.
    pub finished_at_secs: f64,
}
