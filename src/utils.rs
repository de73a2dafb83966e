use std::collections::HashSet;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Local, NaiveDate};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::Track;

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Short random identifier for background jobs.
pub fn generate_job_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn default_recommendation_playlist_name(date: NaiveDate) -> String {
    format!("Recommended Tracks - {}", date.format("%Y-%m-%d"))
}

pub fn default_mirror_playlist_name(date: NaiveDate) -> String {
    format!("Liked Songs - {}", date.format("%Y-%m-%d"))
}

/// Parses the year out of `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
pub fn release_year(release_date: &str) -> Option<i32> {
    let year = release_date.get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

/// Keeps the first occurrence of every track id, preserving order.
pub fn remove_duplicate_tracks(tracks: &mut Vec<Track>) {
    let mut seen_ids = HashSet::new();
    tracks.retain(|track| seen_ids.insert(track.id.clone()));
}

/// Order-preserving de-duplication of plain strings (artist ids, uris).
pub fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
