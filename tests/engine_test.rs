mod common;

use std::collections::{BTreeMap, HashSet};

use common::{FakeApi, artist, track, tracks_by};
use tastemix::{
    analysis::{RankedArtist, TasteProfile},
    config::EngineSettings,
    error::ApiError,
    recommend::{CandidatePool, Era, Mood, RecommendationEngine, UserPreferences},
    types::{Album, Track},
};

fn settings() -> EngineSettings {
    EngineSettings {
        jitter: 0.0,
        shuffle_seed: Some(7),
        ..Default::default()
    }
}

fn profile(top_artists: &[&str], genre_seeds: &[&str], excluded: &[&str]) -> TasteProfile {
    TasteProfile {
        track_count: 10,
        unique_artist_count: top_artists.len(),
        track_ids: Vec::new(),
        top_genres: genre_seeds.iter().map(|g| (g.to_string(), 1)).collect(),
        genre_seeds: genre_seeds.iter().map(|g| g.to_string()).collect(),
        top_artists: top_artists
            .iter()
            .map(|id| RankedArtist {
                id: id.to_string(),
                name: id.to_string(),
                count: 1,
            })
            .collect(),
        audio_features: BTreeMap::new(),
        excluded_track_ids: excluded.iter().map(|id| id.to_string()).collect(),
        analysis_time_secs: 1.0,
        stages: Vec::new(),
    }
}

fn preferences(discovery: i64) -> UserPreferences {
    UserPreferences::new(Mood::Any, Era::Any, discovery)
}

fn ids(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.id.as_str()).collect()
}

fn bare_track(id: &str, artist_id: &str) -> Track {
    Track {
        album_id: None,
        ..track(id, artist_id)
    }
}

#[tokio::test]
async fn test_excluded_tracks_are_never_recommended() {
    let mut api = FakeApi::new();
    api.top_artists = vec![artist("a1", &[])];
    api.top_tracks.insert("a1".to_string(), tracks_by("t", "a1", 5));
    api.albums.insert(
        "a1".to_string(),
        vec![Album {
            id: "alb".to_string(),
            name: "Latest".to_string(),
            release_date: Some("2024-05-01".to_string()),
        }],
    );
    api.album_tracks.insert(
        "alb".to_string(),
        vec![bare_track("t-1", "a1"), bare_track("new-1", "a1")],
    );
    api.related.insert("a1".to_string(), vec![artist("r1", &[])]);
    let mut related_tracks = vec![track("liked-9", "r1")];
    related_tracks.extend(tracks_by("r", "r1", 2));
    api.top_tracks.insert("r1".to_string(), related_tracks);

    let excluded = ["t-1", "t-3", "liked-9"];
    let profile = profile(&["a1"], &[], &excluded);

    let recommendations = RecommendationEngine::new(&api, settings())
        .generate_recommendations(&profile, 20, false, &preferences(50))
        .await;

    for id in excluded {
        assert!(!ids(&recommendations).contains(&id), "{} recommended", id);
    }
    let got: HashSet<&str> = ids(&recommendations).into_iter().collect();
    let expected: HashSet<&str> = ["t-0", "t-2", "t-4", "new-1", "r-0", "r-1"]
        .into_iter()
        .collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn test_familiar_quota_and_album_tracks() {
    let mut api = FakeApi::new();
    api.top_artists = vec![artist("a1", &[])];
    api.top_tracks.insert("a1".to_string(), tracks_by("top", "a1", 6));
    api.albums.insert(
        "a1".to_string(),
        vec![Album {
            id: "alb".to_string(),
            name: "Latest".to_string(),
            release_date: Some("2020-01-01".to_string()),
        }],
    );
    api.album_tracks.insert(
        "alb".to_string(),
        vec![
            bare_track("alb-0", "a1"),
            bare_track("alb-1", "a1"),
            bare_track("alb-2", "a1"),
            bare_track("alb-3", "a1"),
        ],
    );
    api.related.insert("a1".to_string(), vec![artist("r1", &[])]);

    let profile = profile(&["a1"], &[], &[]);
    let recommendations = RecommendationEngine::new(&api, settings())
        .generate_recommendations(&profile, 20, false, &preferences(0))
        .await;

    // discovery 0: 8 familiar tracks per artist, 5 top tracks and 3 album tracks
    assert_eq!(recommendations.len(), 8);
    assert!(!ids(&recommendations).contains(&"top-5"));
    assert!(!ids(&recommendations).contains(&"alb-3"));

    let album_track = recommendations.iter().find(|t| t.id == "alb-0").unwrap();
    assert_eq!(album_track.album_id.as_deref(), Some("alb"));
    assert_eq!(album_track.release_date.as_deref(), Some("2020-01-01"));

    // no discovery pool at or below 20
    assert_eq!(api.call_count("related_artists"), 0);
    assert_eq!(api.call_count("search_artists_by_genre"), 0);
}

#[tokio::test]
async fn test_working_set_is_subsampled_reproducibly() {
    let build = || {
        let mut api = FakeApi::new();
        for i in 0..10 {
            let id = format!("w{}", i);
            api.top_artists.push(artist(&id, &[]));
            api.top_tracks
                .insert(id.clone(), vec![track(&format!("{}-t", id), &id)]);
        }
        api
    };
    let profile = profile(&["p1"], &[], &[]);

    let first = build();
    RecommendationEngine::new(&first, settings())
        .generate_recommendations(&profile, 20, false, &preferences(0))
        .await;
    let second = build();
    RecommendationEngine::new(&second, settings())
        .generate_recommendations(&profile, 20, false, &preferences(0))
        .await;

    let calls = first.calls("artist_top_tracks");
    assert_eq!(calls.len(), 5);
    assert_eq!(calls.iter().collect::<HashSet<_>>().len(), 5);
    assert!(calls.iter().all(|id| id.starts_with('w')));
    assert_eq!(calls, second.calls("artist_top_tracks"));
}

#[tokio::test]
async fn test_falls_back_to_profile_artists() {
    let mut api = FakeApi::new().failing(
        "user_top_artists",
        ApiError::PermissionDenied("missing scope".to_string()),
    );
    api.top_tracks.insert("p1".to_string(), tracks_by("p1", "p1", 2));
    api.top_tracks.insert("p2".to_string(), tracks_by("p2", "p2", 2));

    let profile = profile(&["p1", "p2"], &[], &[]);
    let recommendations = RecommendationEngine::new(&api, settings())
        .generate_recommendations(&profile, 20, false, &preferences(0))
        .await;

    assert_eq!(api.calls("artist_top_tracks"), vec!["p1", "p2"]);
    assert_eq!(recommendations.len(), 4);
}

#[tokio::test]
async fn test_genre_search_when_related_artists_are_unavailable() {
    let mut api = FakeApi::new().failing(
        "related_artists",
        ApiError::NotFound("gone".to_string()),
    );
    api.top_artists = vec![artist("a1", &["rock"])];
    api.top_tracks.insert("a1".to_string(), tracks_by("a1", "a1", 5));
    api.genre_search.insert(
        "rock".to_string(),
        vec![artist("a1", &["rock"]), artist("g1", &["rock"]), artist("g2", &["rock"])],
    );
    api.top_tracks.insert("g1".to_string(), tracks_by("g1", "g1", 10));
    api.top_tracks.insert("g2".to_string(), tracks_by("g2", "g2", 10));

    let profile = profile(&["a1"], &["rock"], &[]);
    let recommendations = RecommendationEngine::new(&api, settings())
        .generate_recommendations(&profile, 100, false, &preferences(100))
        .await;

    // discovery 100: 3 familiar and up to 7 discovery tracks, top tracks capped at 5
    let from = |artist: &str| {
        recommendations
            .iter()
            .filter(|t| t.primary_artist_id() == Some(artist))
            .count()
    };
    assert_eq!(from("a1"), 3);
    assert_eq!(from("g1"), 5);
    assert_eq!(from("g2"), 5);

    assert_eq!(api.calls("search_artists_by_genre"), vec!["rock"]);
    let top_calls = api.calls("artist_top_tracks");
    assert_eq!(top_calls.iter().filter(|id| *id == "a1").count(), 1);
}

#[tokio::test]
async fn test_results_are_limited_and_sorted() {
    let mut api = FakeApi::new();
    api.top_artists = vec![artist("a1", &[]), artist("a2", &[])];
    let mut popular = tracks_by("a1", "a1", 5);
    for (i, t) in popular.iter_mut().enumerate() {
        t.popularity = [90, 50, 10, 30, 60][i];
    }
    api.top_tracks.insert("a1".to_string(), popular);
    api.top_tracks.insert("a2".to_string(), tracks_by("a2", "a2", 5));

    let profile = profile(&["a1", "a2"], &[], &[]);
    let engine = RecommendationEngine::new(&api, settings());
    let scored = engine
        .generate_scored(&profile, 4, false, &preferences(0))
        .await;

    assert_eq!(scored.len(), 4);
    assert!(scored.windows(2).all(|w| w[0].score >= w[1].score));

    let limited = engine
        .generate_recommendations(&profile, 1, false, &preferences(0))
        .await;
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_no_artists_means_no_recommendations() {
    let api = FakeApi::new();
    let profile = profile(&[], &[], &[]);

    let recommendations = RecommendationEngine::new(&api, settings())
        .generate_recommendations(&profile, 20, true, &preferences(50))
        .await;

    assert!(recommendations.is_empty());
    assert_eq!(api.call_count("artist_top_tracks"), 0);
}

#[test]
fn test_candidate_pool_rejects_excluded_and_duplicates() {
    let excluded: HashSet<String> = ["liked".to_string()].into_iter().collect();
    let mut pool = CandidatePool::new(&excluded);

    assert!(pool.offer(track("new", "a")));
    assert!(!pool.offer(track("new", "b")));
    assert!(!pool.offer(track("liked", "a")));
    assert!(!pool.offer(track("liked", "a")));

    assert_eq!(pool.len(), 1);
    assert_eq!(pool.excluded_hits(), 2);
    assert_eq!(ids(&pool.into_tracks()), vec!["new"]);
}
