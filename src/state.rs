use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;
use crate::tracking::{ProjectReader, ProjectStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub store: Arc<dyn ProjectStore>,
    pub reader: ProjectReader,
    pub login_limiter: LoginRateLimiter,
}
