//! # CLI Module
//!
//! User-facing subcommands. Each one loads the stored credential, builds a
//! [`SpotifyClient`] and hands it to the library core as a `&dyn MusicApi`.
//! Console output goes through the crate's colored macros and `indicatif`
//! spinners; diagnostics go through `tracing` and only show up with `-v`.
//!
//! ```text
//! CLI Layer (User Interface)
//!     ↓
//! Core (analysis / recommend / mirror)
//!     ↓
//! MusicApi (SpotifyClient)
//!     ↓
//! Network Layer (HTTP Requests)
//! ```
//!
//! ## Usage Patterns
//!
//! ```bash
//! tastemix auth                          # Authenticate with Spotify
//! tastemix analyze --include-playlists   # Show the taste profile
//! tastemix recommend --mood chill        # Create a recommendation playlist
//! tastemix mirror                        # Copy liked songs into a playlist
//! tastemix cache                         # Enrichment cache statistics
//! ```

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{error, management::TokenManager, spotify::SpotifyClient};

mod analyze;
mod auth;
mod cache;
mod mirror;
mod recommend;

pub use analyze::analyze;
pub use auth::auth;
pub use cache::cache;
pub use mirror::mirror;
pub use recommend::{DEFAULT_LIMIT, MAX_LIMIT, RecommendArgs, recommend};

fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

/// Client for the stored credential. Terminates the process when there is none.
async fn connect() -> SpotifyClient {
    let mut token_mgr = match TokenManager::load().await {
        Ok(t) => t,
        Err(e) => error!("Failed to load token. Please run tastemix auth\n Error: {}", e),
    };

    let token = match token_mgr.get_valid_token().await {
        Ok(t) => t,
        Err(e) => error!("Failed to refresh token. Please run tastemix auth\n Error: {}", e),
    };

    match SpotifyClient::new(token) {
        Ok(client) => client,
        Err(e) => error!("Failed to build API client: {}", e),
    }
}
