//! Liked-songs mirror job.
//!
//! Copies every liked track into a new playlist, once per uri, in library order.
//! Progress goes through a [`JobStore`] so a caller on another task can poll it.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    error::{MirrorError, PlaylistError},
    recommend::add_tracks_in_batches,
    spotify::{MAX_PAGE_SIZE, MusicApi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Working,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Working => "working",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: usize,
    /// Unknown until the job is done.
    pub total: Option<usize>,
    pub playlist_url: Option<String>,
    pub playlist_name: Option<String>,
    pub message: Option<String>,
    pub user_id: Option<String>,
}

impl Job {
    pub fn pending(id: impl Into<String>) -> Self {
        Job {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Keyed job records shared between a worker and whoever polls it.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job);

    /// Applies `update` to the job with `id`. Returns `false` for unknown ids.
    fn update(&self, id: &str, update: &mut dyn FnMut(&mut Job)) -> bool;

    fn get(&self, id: &str) -> Option<Job>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.id.clone(), job);
    }

    fn update(&self, id: &str, update: &mut dyn FnMut(&mut Job)) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(id) {
            Some(job) => {
                update(job);
                true
            }
            None => false,
        }
    }

    fn get(&self, id: &str) -> Option<Job> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }
}

/// Runs the mirror job `job_id`, which must already be in `store`.
///
/// Refuses to write anything when the credential belongs to someone other than
/// `expected_user_id`. On failure the job ends in [`JobStatus::Error`] with a
/// message; tracks added before the failure stay in the playlist.
pub async fn mirror_liked_songs(
    api: &dyn MusicApi,
    store: &dyn JobStore,
    job_id: &str,
    expected_user_id: &str,
    playlist_name: &str,
    public: bool,
) -> Result<usize, MirrorError> {
    store.update(job_id, &mut |job| job.status = JobStatus::Working);

    match run(api, store, job_id, expected_user_id, playlist_name, public).await {
        Ok(added) => {
            store.update(job_id, &mut |job| {
                job.total = Some(added);
                job.status = JobStatus::Done;
            });
            tracing::info!(job = job_id, added, "mirror finished");
            Ok(added)
        }
        Err(e) => {
            error!(job = job_id, error = %e, "mirror failed");
            let message = format!("{}. {}", e, e.guidance());
            store.update(job_id, &mut |job| {
                job.status = JobStatus::Error;
                job.message = Some(message.clone());
            });
            Err(e)
        }
    }
}

async fn run(
    api: &dyn MusicApi,
    store: &dyn JobStore,
    job_id: &str,
    expected_user_id: &str,
    playlist_name: &str,
    public: bool,
) -> Result<usize, MirrorError> {
    let actual = api.current_user_id().await?;
    if actual != expected_user_id {
        return Err(MirrorError::UserMismatch {
            expected: expected_user_id.to_string(),
            actual,
        });
    }
    store.update(job_id, &mut |job| job.user_id = Some(actual.clone()));

    let playlist = api
        .create_playlist(&actual, playlist_name, public, "")
        .await?;
    store.update(job_id, &mut |job| {
        job.playlist_url = playlist.url.clone();
        job.playlist_name = Some(playlist_name.to_string());
    });

    let mut seen = HashSet::new();
    let mut added = 0;
    let mut offset = 0;

    loop {
        let page = api.liked_tracks(MAX_PAGE_SIZE, offset).await?;
        if page.raw_count == 0 {
            break;
        }

        let uris: Vec<String> = page
            .items
            .iter()
            .filter(|t| seen.insert(t.uri.clone()))
            .map(|t| t.uri.clone())
            .collect();
        debug!(job = job_id, offset, new = uris.len(), "liked page");

        let base = added;
        added += add_tracks_in_batches(api, &playlist, &uris, |n| {
            store.update(job_id, &mut |job| job.progress = base + n);
        })
        .await
        .map_err(|e| match e {
            PlaylistError::PartialAdd {
                playlist_id,
                url,
                added,
                source,
            } => PlaylistError::PartialAdd {
                playlist_id,
                url,
                added: base + added,
                source,
            },
            other => other,
        })?;

        if !page.has_more {
            break;
        }
        offset += page.raw_count;
    }

    Ok(added)
}
