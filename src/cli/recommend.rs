use std::sync::Arc;

use tabled::Table;

use crate::{
    analysis,
    config::{AnalysisOptions, EngineSettings},
    enrichment::{EnrichmentCache, MusicBrainzEnricher},
    error,
    error::PlaylistError,
    info,
    recommend::{RecommendationEngine, UserPreferences, create_recommendation_playlist},
    spotify::MusicApi,
    success,
    types::RecommendationTableRow,
    warning,
};

use super::{connect, spinner};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct RecommendArgs {
    pub limit: usize,
    pub preferences: UserPreferences,
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: bool,
    pub include_audio_targets: bool,
    pub enrichment: bool,
    pub jitter: bool,
    pub dry_run: bool,
}

impl Default for RecommendArgs {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            preferences: UserPreferences::default(),
            name: None,
            description: None,
            public: true,
            include_audio_targets: true,
            enrichment: true,
            jitter: true,
            dry_run: false,
        }
    }
}

/// Analyzes the library, ranks recommendations and, unless this is a dry run,
/// saves them as a new playlist.
pub async fn recommend(args: RecommendArgs) {
    let api = connect().await;
    let limit = args.limit.clamp(1, MAX_LIMIT);

    let pb = spinner("Analyzing your library...");
    let result = analysis::analyze(&api, &AnalysisOptions::default()).await;
    pb.finish_and_clear();

    let profile = match result {
        Ok(profile) => profile,
        Err(e) => error!("Analysis failed at stage '{}': {}", e.stage(), e),
    };
    success!(
        "Analyzed {} tracks, {} of {} stages completed",
        profile.track_count,
        profile.completed_stages(),
        profile.stages.len()
    );

    let mut settings = EngineSettings::default();
    if !args.jitter {
        settings.jitter = 0.0;
    }

    let enricher = if args.enrichment {
        match EnrichmentCache::open_default().await {
            Ok(cache) => match MusicBrainzEnricher::new(Arc::new(cache)) {
                Ok(enricher) => Some(enricher),
                Err(e) => {
                    warning!("Enrichment disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                warning!("Enrichment cache unavailable, enrichment disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut engine = RecommendationEngine::new(&api, settings);
    if let Some(enricher) = &enricher {
        engine = engine.with_enricher(enricher);
    }

    info!(
        "Mood: {}, era: {}, discovery: {}",
        args.preferences.mood,
        args.preferences.era,
        args.preferences.discovery()
    );
    let pb = spinner("Finding recommendations...");
    let ranked = engine
        .generate_scored(&profile, limit, args.include_audio_targets, &args.preferences)
        .await;
    pb.finish_and_clear();

    if ranked.is_empty() {
        warning!("No recommendations found. Try a different discovery level or era.");
        return;
    }

    let rows: Vec<RecommendationTableRow> = ranked
        .iter()
        .enumerate()
        .map(|(i, c)| RecommendationTableRow {
            rank: i + 1,
            score: format!("{:.1}", c.score),
            name: c.track.name.clone(),
            artist: c.track.primary_artist_name().to_string(),
            released: c.track.release_date.clone().unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(rows));

    if args.dry_run {
        info!("Dry run, no playlist created");
        return;
    }

    let user_id = match api.current_user_id().await {
        Ok(id) => id,
        Err(e) => error!("Failed to fetch user profile: {}. {}", e, e.guidance()),
    };

    let tracks: Vec<_> = ranked.into_iter().map(|c| c.track).collect();
    let pb = spinner("Creating playlist...");
    let outcome = create_recommendation_playlist(
        &api,
        &user_id,
        &tracks,
        args.name.as_deref(),
        args.description.as_deref(),
        args.public,
    )
    .await;
    pb.finish_and_clear();

    match outcome {
        Ok(outcome) => {
            success!(
                "Playlist '{}' created with {} tracks",
                outcome.name,
                outcome.track_count
            );
            if let Some(url) = outcome.url {
                info!("{}", url);
            }
        }
        Err(PlaylistError::PartialAdd {
            url, added, source, ..
        }) => {
            warning!(
                "Playlist created but only {} tracks were added: {}",
                added,
                source
            );
            if let Some(url) = url {
                info!("{}", url);
            }
            error!("{}", source.guidance());
        }
        Err(e) => error!("{}. {}", e, e.guidance()),
    }
}
