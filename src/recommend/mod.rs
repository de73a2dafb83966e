//! Recommendation engine.
//!
//! Builds a candidate pool from the artists a user already listens to (familiar
//! pool) and from artists new to them (discovery pool), scores every candidate
//! with an additive heuristic and returns the best ones. Tracks in the profile's
//! exclusion set never make it into the pool.
//!
//! The discovery level (0..=100) shifts both the per-artist track quota and a
//! score bonus between the two pools. [`create_recommendation_playlist`] turns
//! a result into a playlist.

mod engine;
mod playlist;
mod preferences;
mod scoring;

pub use engine::{CandidatePool, RecommendationEngine, ScoredCandidate, rank_candidates};
pub use playlist::{
    DEFAULT_PLAYLIST_DESCRIPTION, PlaylistOutcome, add_tracks_in_batches,
    create_recommendation_playlist,
};
pub use preferences::{DEFAULT_DISCOVERY, Era, Mood, TrackQuota, UserPreferences};
pub use scoring::{ScoringContext, score_track};
