use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::tokens::TokenIssuer;
use crate::config::Config;
use crate::media::MediaStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: TokenIssuer,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config, media: Arc<dyn MediaStore>) -> Self {
        let tokens = TokenIssuer::new(&config.auth);
        Self {
            db,
            config,
            tokens,
            media,
        }
    }
}
