use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{Res, config, spotify, types::Token};

/// Seconds before the nominal expiry at which a token is already treated as stale.
const EXPIRY_MARGIN_SECS: u64 = 240;

/// Owns the persisted OAuth token and refreshes it on demand.
pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager {
            token,
            path: Self::token_path(),
        }
    }

    /// Manager persisting to a custom location.
    pub fn with_path(token: Token, path: PathBuf) -> Self {
        TokenManager { token, path }
    }

    pub async fn load() -> Res<Self> {
        Self::load_from(Self::token_path()).await
    }

    pub async fn load_from(path: PathBuf) -> Res<Self> {
        let content = async_fs::read_to_string(&path).await.map_err(|e| {
            format!(
                "no stored credentials at {} ({}). Run `tastemix auth` first.",
                path.display(),
                e
            )
        })?;
        let token: Token = serde_json::from_str(&content)?;
        Ok(Self { token, path })
    }

    pub async fn persist(&self) -> Res<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Access token, refreshed first if it is about to expire.
    pub async fn get_valid_token(&mut self) -> Res<String> {
        if self.is_expired() {
            debug!("access token expired, refreshing");
            let new_token = spotify::auth::refresh_token(&self.token.refresh_token).await?;
            self.token = new_token;
            if let Err(e) = self.persist().await {
                warn!(error = %e, "failed to persist refreshed token");
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache").join("token.json")
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}
