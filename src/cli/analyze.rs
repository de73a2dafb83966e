use tabled::Table;

use crate::{
    analysis::{TasteProfile, analyze as analyze_taste},
    config::AnalysisOptions,
    error, info, success,
    types::{ArtistTableRow, GenreTableRow, StageTableRow},
    warning,
};

use super::{connect, spinner};

/// Runs a taste analysis and prints the profile, or dumps it as JSON.
pub async fn analyze(options: AnalysisOptions, json: bool) {
    let api = connect().await;

    let pb = spinner("Analyzing your library...");
    let result = analyze_taste(&api, &options).await;
    pb.finish_and_clear();

    let profile = match result {
        Ok(profile) => profile,
        Err(e) => error!("Analysis failed at stage '{}': {}", e.stage(), e),
    };

    if json {
        match serde_json::to_string_pretty(&profile) {
            Ok(out) => println!("{}", out),
            Err(e) => error!("Failed to serialize profile: {}", e),
        }
        return;
    }

    print_profile(&profile);
}

pub(crate) fn print_profile(profile: &TasteProfile) {
    success!(
        "Analyzed {} tracks from {} artists in {:.1}s",
        profile.track_count,
        profile.unique_artist_count,
        profile.analysis_time_secs
    );

    if !profile.top_artists.is_empty() {
        info!("Top artists");
        let rows: Vec<ArtistTableRow> = profile
            .top_artists
            .iter()
            .enumerate()
            .map(|(i, a)| ArtistTableRow {
                rank: i + 1,
                name: a.name.clone(),
                tracks: a.count,
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    if profile.top_genres.is_empty() {
        warning!("No genres available");
    } else {
        info!("Top genres");
        let rows: Vec<GenreTableRow> = profile
            .top_genres
            .iter()
            .enumerate()
            .map(|(i, (genre, count))| GenreTableRow {
                rank: i + 1,
                genre: genre.clone(),
                count: *count,
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    if profile.has_audio_features() {
        info!("Audio profile");
        for (dimension, value) in &profile.audio_features {
            println!("  {:<18}{:.3}", dimension, value);
        }
    }

    let rows: Vec<StageTableRow> = profile
        .stages
        .iter()
        .map(|s| StageTableRow {
            stage: s.stage.to_string(),
            completed: s.completed,
            note: s.reason.clone().unwrap_or_default(),
        })
        .collect();
    info!(
        "Stages ({} of {} completed)",
        profile.completed_stages(),
        profile.stages.len()
    );
    println!("{}", Table::new(rows));
}
