use std::sync::Arc;

use crate::config::ServerConfig;
use crate::resolver::UpdateResolver;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<UpdateResolver>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(resolver: Arc<UpdateResolver>, config: Arc<ServerConfig>) -> Self {
        Self { resolver, config }
    }
}
