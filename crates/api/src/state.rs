use std::sync::Arc;

use db::DbPool;
use engine::ProgressBus;
use queue::{JobQueue, Scheduler};

use crate::config::ApiConfig;

/// Shared state handed to every `axum` handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub queue: Arc<JobQueue>,
    pub scheduler: Arc<Scheduler>,
    pub progress: Arc<ProgressBus>,
    pub config: ApiConfig,
}
