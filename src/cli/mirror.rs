use std::{sync::Arc, time::Duration};

use crate::{
    error, info,
    mirror::{InMemoryJobStore, Job, JobStatus, JobStore, mirror_liked_songs},
    spotify::MusicApi,
    success, utils,
};

use super::{connect, spinner};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Copies all liked songs into a new playlist on a background task and polls it.
pub async fn mirror(name: Option<String>, public: bool) {
    let api = Arc::new(connect().await);

    let user_id = match api.current_user_id().await {
        Ok(id) => id,
        Err(e) => error!("Failed to fetch user profile: {}. {}", e, e.guidance()),
    };
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| utils::default_mirror_playlist_name(utils::today()));

    let store = Arc::new(InMemoryJobStore::new());
    let job_id = utils::generate_job_id();
    store.insert(Job::pending(&job_id));

    let worker = {
        let api = Arc::clone(&api);
        let store = Arc::clone(&store);
        let job_id = job_id.clone();
        let name = name.clone();
        tokio::spawn(async move {
            mirror_liked_songs(
                api.as_ref(),
                store.as_ref(),
                &job_id,
                &user_id,
                &name,
                public,
            )
            .await
        })
    };

    let pb = spinner(format!("Mirroring liked songs into '{}'...", name));
    let job = loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let Some(job) = store.get(&job_id) else {
            pb.finish_and_clear();
            error!("Mirror job {} disappeared", job_id);
        };
        if job.status.is_finished() || worker.is_finished() {
            break job;
        }
        if job.status == JobStatus::Working {
            pb.set_message(format!("Added {} tracks to '{}'...", job.progress, name));
        }
    };
    pb.finish_and_clear();

    if let Err(e) = worker.await {
        error!("Mirror task failed: {}", e);
    }

    let job = store.get(&job_id).unwrap_or(job);
    match job.status {
        JobStatus::Done => {
            success!(
                "Playlist '{}' created with {} tracks",
                name,
                job.total.unwrap_or(job.progress)
            );
            if let Some(url) = job.playlist_url {
                info!("{}", url);
            }
        }
        _ => error!(
            "{}",
            job.message
                .unwrap_or_else(|| "Mirror job failed for an unknown reason".to_string())
        ),
    }
}
