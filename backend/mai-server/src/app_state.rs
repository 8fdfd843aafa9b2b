use mai_config::Config;
use mai_engine::EngineSupervisor;

use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: EngineSupervisor,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(supervisor: EngineSupervisor) -> Self {
        let config = Arc::new(supervisor.config().clone());
        Self { supervisor, config }
    }
}
