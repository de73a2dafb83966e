use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{error, management::TokenManager, spotify, success, types::PkceToken};

pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    let token = match spotify::auth::authorize(shared_state).await {
        Ok(token) => token,
        Err(e) => error!("Authentication failed: {}", e),
    };

    let token_mgr = TokenManager::new(token);
    if let Err(e) = token_mgr.persist().await {
        error!("Failed to store token: {}", e);
    }

    success!("Authenticated. Token stored.");
}
