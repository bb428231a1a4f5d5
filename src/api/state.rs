//! Application state shared by handlers

use std::sync::Arc;

use crate::domain::{HealthProber, SemanticCache};
use crate::infrastructure::services::ChatGatewayService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGatewayService>,
}

impl AppState {
    pub fn new(gateway: ChatGatewayService) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }

    pub fn prober(&self) -> &HealthProber {
        self.gateway.prober()
    }

    pub fn cache(&self) -> &Arc<dyn SemanticCache> {
        self.gateway.cache()
    }
}
