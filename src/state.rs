use sqlx::PgPool;

use crate::chat::ChatRegistry;
use crate::config::Config;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub http: reqwest::Client,
    pub chat: ChatRegistry,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config,
            http: reqwest::Client::new(),
            chat: ChatRegistry::default(),
        }
    }
}
