use std::{sync::Arc, time::Duration};

use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use tastemix::{
    cli,
    config::{self, AnalysisOptions},
    error, logging,
    recommend::{DEFAULT_DISCOVERY, Era, Mood, UserPreferences},
    types::PkceToken,
};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Analyze your listening taste
    Analyze(AnalyzeOptions),

    /// Create a playlist of recommended tracks
    Recommend(RecommendOptions),

    /// Copy all liked songs into a new playlist
    Mirror(MirrorOptions),

    /// Show enrichment cache statistics
    Cache,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeOptions {
    /// Also sample tracks from your playlists
    #[clap(long)]
    include_playlists: bool,

    /// Number of playlists to sample
    #[clap(long, default_value_t = 5)]
    playlist_limit: usize,

    /// Tracks taken from each sampled playlist
    #[clap(long, default_value_t = 3)]
    tracks_per_playlist: usize,

    /// Liked songs to analyze
    #[clap(long, default_value_t = 15)]
    liked_songs_limit: usize,

    /// Time budget in seconds
    #[clap(long, default_value_t = 20)]
    max_analysis_time: u64,

    /// Print the profile as JSON
    #[clap(long)]
    json: bool,
}

impl AnalyzeOptions {
    fn into_options(self) -> AnalysisOptions {
        AnalysisOptions {
            include_playlists: self.include_playlists,
            playlist_limit: self.playlist_limit,
            tracks_per_playlist: self.tracks_per_playlist,
            liked_songs_limit: self.liked_songs_limit,
            max_analysis_time: Duration::from_secs(self.max_analysis_time),
            ..Default::default()
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RecommendOptions {
    /// Number of tracks (1-100)
    #[clap(long, default_value_t = cli::DEFAULT_LIMIT)]
    limit: usize,

    #[clap(long, default_value = "any")]
    mood: Mood,

    #[clap(long, default_value = "any")]
    era: Era,

    /// 0 keeps to your artists, 100 goes for new ones
    #[clap(long, default_value_t = DEFAULT_DISCOVERY as i64, allow_negative_numbers = true)]
    discovery: i64,

    /// Playlist name (default "Recommended Tracks - <date>")
    #[clap(long)]
    name: Option<String>,

    #[clap(long)]
    description: Option<String>,

    /// Create a private playlist
    #[clap(long)]
    private: bool,

    #[clap(long)]
    no_audio_targets: bool,

    /// Skip community metadata lookups
    #[clap(long)]
    no_enrichment: bool,

    /// Deterministic scoring
    #[clap(long)]
    no_jitter: bool,

    /// Print recommendations without creating a playlist
    #[clap(long)]
    dry_run: bool,
}

impl RecommendOptions {
    fn into_args(self) -> cli::RecommendArgs {
        cli::RecommendArgs {
            limit: self.limit,
            preferences: UserPreferences::new(self.mood, self.era, self.discovery),
            name: self.name,
            description: self.description,
            public: !self.private,
            include_audio_targets: !self.no_audio_targets,
            enrichment: !self.no_enrichment,
            jitter: !self.no_jitter,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct MirrorOptions {
    /// Playlist name (default "Liked Songs - <date>")
    #[clap(long)]
    name: Option<String>,

    /// Create a private playlist
    #[clap(long)]
    private: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }
        Command::Analyze(opt) => {
            let json = opt.json;
            cli::analyze(opt.into_options(), json).await
        }
        Command::Recommend(opt) => cli::recommend(opt.into_args()).await,
        Command::Mirror(opt) => cli::mirror(opt.name, !opt.private).await,
        Command::Cache => cli::cache().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
