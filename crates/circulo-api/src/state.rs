use std::sync::Arc;

use circulo_db::Database;

use crate::error::AppError;
use crate::render::Templates;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub templates: Templates,
    pub session: SessionSettings,
    /// Upper bound on comments shown on the home feed.
    pub feed_limit: u32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub ttl_days: i64,
    /// Adds the `Secure` attribute to the session cookie (HTTPS deployments).
    pub secure_cookies: bool,
}

/// Run a blocking database call off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
    Ok(result?)
}
