mod common;

use std::time::Duration;

use common::{FakeApi, features, track, tracks_by};
use tastemix::{
    analysis::{Stage, TasteAnalyzer, TasteProfile, analyze, rank_artists},
    config::AnalysisOptions,
    error::{AnalysisError, ApiError},
    types::PlaylistRef,
};

fn options() -> AnalysisOptions {
    AnalysisOptions {
        liked_offset_max: 0,
        ..Default::default()
    }
}

fn stage(profile: &TasteProfile, stage: Stage) -> &tastemix::analysis::StageReport {
    profile
        .stages
        .iter()
        .find(|s| s.stage == stage)
        .expect("stage reported")
}

// 15 liked tracks: artist c (2), b (5), a (8), in that order of first appearance
fn small_library() -> FakeApi {
    let mut liked = tracks_by("c", "c", 2);
    liked.extend(tracks_by("b", "b", 5));
    liked.extend(tracks_by("a", "a", 8));
    FakeApi::new()
        .with_liked(liked)
        .with_artist("a", &["rock"])
        .with_artist("b", &["jazz"])
        .with_artist("c", &["rock"])
}

#[tokio::test(start_paused = true)]
async fn test_empty_library_is_an_error() {
    let api = FakeApi::new();

    let err = analyze(&api, &options()).await.unwrap_err();

    assert!(matches!(err, AnalysisError::NoTracks));
    assert_eq!(err.track_count(), 0);
    assert_eq!(err.stage(), Stage::LikedSongs);
}

#[tokio::test(start_paused = true)]
async fn test_small_library_scenario() {
    let api = small_library();

    let profile = analyze(&api, &options()).await.unwrap();

    assert_eq!(profile.track_count, 15);
    assert_eq!(profile.unique_artist_count, 3);
    assert_eq!(profile.top_artist_ids(), vec!["a", "b", "c"]);
    assert_eq!(profile.top_artists[0].count, 8);
    assert_eq!(
        profile.top_genres,
        vec![("rock".to_string(), 10), ("jazz".to_string(), 5)]
    );
    assert_eq!(profile.genre_seeds, vec!["rock", "jazz"]);
}

#[tokio::test(start_paused = true)]
async fn test_liked_songs_are_excluded() {
    let api = small_library();

    let profile = analyze(&api, &options()).await.unwrap();

    for id in &profile.track_ids {
        assert!(profile.is_excluded(id));
    }
}

#[tokio::test(start_paused = true)]
async fn test_dedup_across_liked_and_playlists() {
    let mut api = FakeApi::new().with_liked(tracks_by("liked", "a", 3));
    api.playlists = vec![PlaylistRef {
        id: "p1".to_string(),
        name: "Mix".to_string(),
    }];
    api.playlist_tracks.insert(
        "p1".to_string(),
        vec![track("liked-1", "a"), track("extra", "b")],
    );

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 1,
        tracks_per_playlist: 3,
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    assert_eq!(profile.track_count, 4);
    assert_eq!(
        profile.track_ids,
        vec!["liked-0", "liked-1", "liked-2", "extra"]
    );
    assert!(stage(&profile, Stage::Playlists).completed);

    // The playlist-only track was never liked
    assert!(!profile.is_excluded("extra"));
}

#[tokio::test(start_paused = true)]
async fn test_playlists_disabled_by_default() {
    let api = small_library();

    let profile = analyze(&api, &options()).await.unwrap();

    let report = stage(&profile, Stage::Playlists);
    assert!(!report.completed);
    assert_eq!(report.reason.as_deref(), Some("disabled"));
    assert_eq!(api.call_count("user_playlists"), 0);
}

fn playlist(id: &str) -> PlaylistRef {
    PlaylistRef {
        id: id.to_string(),
        name: format!("Playlist {}", id),
    }
}

#[tokio::test(start_paused = true)]
async fn test_playlist_pages_advance_past_unplayable_entries() {
    let mut api = FakeApi::new().with_liked(vec![track("l1", "a")]);
    api.playlists = vec![playlist("p1")];
    let mut items = vec![track("ep", "podcast")];
    items.extend(["x1", "x2", "x3", "x4"].map(|id| track(id, "b")));
    api.playlist_tracks.insert("p1".to_string(), items);
    api.unplayable.insert("ep".to_string());

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 1,
        tracks_per_playlist: 2,
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    // The episode still takes a slot, so the second page starts after x1
    assert_eq!(api.calls("playlist_tracks"), vec!["p1:2:0", "p1:1:2"]);
    assert_eq!(profile.track_ids, vec!["l1", "x1", "x2"]);
    assert!(stage(&profile, Stage::Playlists).completed);
}

#[tokio::test(start_paused = true)]
async fn test_playlist_listing_failure_is_swallowed() {
    let mut api = small_library().failing(
        "user_playlists",
        ApiError::PermissionDenied("missing scope".to_string()),
    );
    api.playlists = vec![playlist("p1")];

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 1,
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    let report = stage(&profile, Stage::Playlists);
    assert!(!report.completed);
    assert!(report.reason.as_deref().unwrap().starts_with("failed"));
    assert_eq!(api.call_count("playlist_tracks"), 0);
    assert_eq!(profile.track_count, 15);
    assert!(stage(&profile, Stage::Genres).completed);
}

#[tokio::test(start_paused = true)]
async fn test_playlist_tracks_failure_keeps_collected_tracks() {
    let mut api = FakeApi::new()
        .with_liked(vec![track("l1", "a")])
        .fail_nth(
            "playlist_tracks",
            1,
            ApiError::NotFound("playlist gone".to_string()),
        );
    api.playlists = vec![playlist("p1"), playlist("p2")];
    api.playlist_tracks
        .insert("p1".to_string(), vec![track("x1", "b")]);
    api.playlist_tracks
        .insert("p2".to_string(), vec![track("y1", "c")]);

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 2,
        tracks_per_playlist: 3,
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    let report = stage(&profile, Stage::Playlists);
    assert!(!report.completed);
    assert!(report.reason.as_deref().unwrap().starts_with("partial"));
    assert_eq!(profile.track_ids, vec!["l1", "x1"]);
}

#[test]
fn test_top_artist_ties_keep_first_seen_order() {
    let mut tracks = tracks_by("x", "x", 2);
    tracks.extend(tracks_by("y", "y", 3));
    tracks.extend(tracks_by("z", "z", 2));

    let ranked = rank_artists(&tracks, 10);
    let ids: Vec<&str> = ranked.iter().map(|a| a.id.as_str()).collect();

    // y is strictly more frequent; x and z tie and keep first-seen order
    assert_eq!(ids, vec!["y", "x", "z"]);
}

#[tokio::test(start_paused = true)]
async fn test_budget_skips_late_stages() {
    let api = small_library()
        .with_latency("liked_tracks", Duration::from_secs(1))
        .with_latency("artists", Duration::from_secs(5));

    let opts = AnalysisOptions {
        max_analysis_time: Duration::from_secs(10),
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    // genres start at 2s (gate 5s) and finish at 7s, past the audio gate at 6s
    assert!(stage(&profile, Stage::Genres).completed);
    let audio = stage(&profile, Stage::AudioFeatures);
    assert!(!audio.completed);
    assert!(audio.reason.as_deref().unwrap().starts_with("skipped"));
    assert_eq!(api.call_count("audio_features"), 0);
    assert!(profile.audio_features.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_liked_songs_skip_every_gated_stage() {
    let api = small_library().with_latency("liked_tracks", Duration::from_secs(3));

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 2,
        max_analysis_time: Duration::from_secs(10),
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    // 6s elapsed after liked songs: past 30%, 50% and 60% of 10s
    assert!(!stage(&profile, Stage::Playlists).completed);
    assert!(!stage(&profile, Stage::Genres).completed);
    assert!(!stage(&profile, Stage::AudioFeatures).completed);
    assert_eq!(api.call_count("user_playlists"), 0);
    assert_eq!(api.call_count("artists"), 0);
    assert!(profile.genre_seeds.is_empty());

    // The profile itself is still usable
    assert_eq!(profile.track_count, 15);
    assert_eq!(profile.top_artist_ids()[0], "a");
}

#[tokio::test(start_paused = true)]
async fn test_budget_monotonicity() {
    let api = small_library()
        .with_latency("liked_tracks", Duration::from_secs(1))
        .with_latency("artists", Duration::from_secs(1))
        .with_latency("audio_features", Duration::from_secs(1));

    let mut previous = 0;
    for secs in [1, 2, 3, 4, 6, 8, 12, 30] {
        let opts = AnalysisOptions {
            max_analysis_time: Duration::from_secs(secs),
            ..options()
        };
        let completed = analyze(&api, &opts).await.unwrap().completed_stages();
        assert!(
            completed >= previous,
            "budget {}s completed {} stages, fewer than {}",
            secs,
            completed,
            previous
        );
        previous = completed;
    }

    // Everything except the disabled playlist stage
    assert_eq!(previous, 6);
}

#[tokio::test(start_paused = true)]
async fn test_liked_songs_ceiling_aborts() {
    let api = small_library().with_latency("liked_tracks", Duration::from_secs(6));

    let err = analyze(&api, &options()).await.unwrap_err();

    assert!(matches!(err, AnalysisError::Timeout { .. }));
    assert_eq!(err.track_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_liked_songs_failure_is_fatal() {
    let api = small_library().failing(
        "liked_tracks",
        ApiError::Unauthorized("token expired".to_string()),
    );

    let err = analyze(&api, &options()).await.unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::LikedSongs(ApiError::Unauthorized(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_exclusion_falls_back_to_analyzed_tracks() {
    // The first liked_tracks call is the exclusion walk
    let mut api = small_library().fail_once(
        "liked_tracks",
        ApiError::Network("connection reset".to_string()),
    );
    api.playlists = vec![PlaylistRef {
        id: "p1".to_string(),
        name: "Mix".to_string(),
    }];
    api.playlist_tracks
        .insert("p1".to_string(), vec![track("extra", "b")]);

    let opts = AnalysisOptions {
        include_playlists: true,
        playlist_limit: 1,
        ..options()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    let exclusion = stage(&profile, Stage::Exclusion);
    assert!(!exclusion.completed);
    assert!(exclusion.reason.as_deref().unwrap().starts_with("failed"));
    assert!(profile.is_excluded("extra"));
    assert!(profile.is_excluded("a-0"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_retried() {
    let api = small_library().fail_once(
        "artists",
        ApiError::RateLimited {
            retry_after: Some(1),
        },
    );

    let profile = analyze(&api, &options()).await.unwrap();

    assert!(stage(&profile, Stage::Genres).completed);
    assert_eq!(api.call_count("artists"), 2);
    assert_eq!(profile.genre_seeds, vec!["rock", "jazz"]);
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_are_not_retried() {
    let api = small_library().fail_once("artists", ApiError::Network("timeout".to_string()));

    let profile = analyze(&api, &options()).await.unwrap();

    let genres = stage(&profile, Stage::Genres);
    assert!(!genres.completed);
    assert_eq!(api.call_count("artists"), 1);
    assert!(profile.top_genres.is_empty());

    // Later stages still run
    assert!(stage(&profile, Stage::AudioFeatures).completed);
}

#[tokio::test(start_paused = true)]
async fn test_audio_features_average_omits_missing_dimensions() {
    let mut api = small_library();
    api.audio_features.insert("a-0".to_string(), features(0.2, 0.4));
    api.audio_features.insert("a-1".to_string(), features(0.6, 0.8));

    let profile = analyze(&api, &options()).await.unwrap();

    assert!(profile.has_audio_features());
    assert!((profile.audio_features["energy"] - 0.4).abs() < 1e-9);
    assert!((profile.audio_features["valence"] - 0.6).abs() < 1e-9);
    assert!(!profile.audio_features.contains_key("danceability"));
    assert!(!profile.audio_features.contains_key("tempo"));
}

#[tokio::test(start_paused = true)]
async fn test_audio_sample_is_bounded_and_seeded() {
    let api = FakeApi::new()
        .with_liked(tracks_by("t", "a", 40))
        .with_artist("a", &["rock"]);

    let opts = AnalysisOptions {
        liked_songs_limit: 40,
        ..options()
    };
    TasteAnalyzer::new(&api, opts.clone()).analyze().await.unwrap();
    TasteAnalyzer::new(&api, opts).analyze().await.unwrap();

    let calls = api.calls("audio_features");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].split(',').count(), 15);
    assert_eq!(calls[0], calls[1]);
}

#[tokio::test(start_paused = true)]
async fn test_random_offset_past_the_end_falls_back_to_start() {
    let api = FakeApi::new().with_liked(tracks_by("t", "a", 3));

    let opts = AnalysisOptions {
        liked_offset_max: 150,
        ..Default::default()
    };
    let profile = analyze(&api, &opts).await.unwrap();

    assert!(profile.track_count > 0);
}

#[tokio::test(start_paused = true)]
async fn test_audio_features_failure_leaves_empty_profile() {
    let mut api = small_library().failing(
        "audio_features",
        ApiError::Server {
            status: 503,
            message: "unavailable".to_string(),
        },
    );
    api.audio_features.insert("a-0".to_string(), features(0.2, 0.4));

    let profile = analyze(&api, &options()).await.unwrap();

    let audio = stage(&profile, Stage::AudioFeatures);
    assert!(!audio.completed);
    assert!(audio.reason.as_deref().unwrap().starts_with("failed"));
    assert!(!profile.has_audio_features());
    // One retry, then the stage gives up
    assert_eq!(api.call_count("audio_features"), 2);
    assert_eq!(profile.genre_seeds, vec!["rock", "jazz"]);
}

#[tokio::test(start_paused = true)]
async fn test_retries_stop_after_two_attempts() {
    let api = small_library()
        .fail_once(
            "liked_tracks",
            ApiError::RateLimited {
                retry_after: Some(1),
            },
        )
        .fail_once(
            "liked_tracks",
            ApiError::Server {
                status: 502,
                message: "bad gateway".to_string(),
            },
        );

    let profile = analyze(&api, &options()).await.unwrap();

    // Two attempts at the first exclusion page, then the liked-songs stage
    assert_eq!(api.calls("liked_tracks"), vec!["50:0", "50:0", "15:0"]);
    let exclusion = stage(&profile, Stage::Exclusion);
    assert!(!exclusion.completed);
    assert!(exclusion.reason.as_deref().unwrap().starts_with("failed"));
    assert_eq!(profile.track_count, 15);
}
