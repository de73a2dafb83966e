//! tastemix library
//!
//! Turns a user's saved tracks into a taste profile and the taste profile into a
//! ranked list of recommended tracks, then materializes playlists from either.
//! Everything that talks to the music service goes through the
//! [`spotify::MusicApi`] trait, so the analysis and recommendation core can be
//! driven by any implementation of it.
//!
//! # Modules
//!
//! - `analysis` - Budgeted, staged taste analysis producing a `TasteProfile`
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Environment configuration and tuning records
//! - `enrichment` - Optional community metadata (genres, tags, ratings) with a local cache
//! - `error` - Typed error taxonomy
//! - `logging` - Diagnostic logging setup
//! - `management` - Token persistence
//! - `mirror` - Liked-songs mirror job and job store
//! - `recommend` - Candidate collection, scoring and playlist materialization
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Web API client and OAuth flow
//! - `types` - Wire and domain records
//! - `utils` - Utility functions and helpers

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod management;
pub mod mirror;
pub mod recommend;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for the CLI layer.
///
/// The library core returns typed errors from [`error`]; this boxed alias is what
/// the command implementations use to bubble anything up to the user.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Analyzing your library...");
/// info!("Found {} liked songs", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal errors in the CLI layer. The library core never calls this.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
