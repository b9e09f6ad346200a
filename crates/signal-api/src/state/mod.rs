//! API application state

use std::sync::Arc;

use signal_common::AppConfig;
use signal_service::ServiceContext;

/// Shared state for the admin API
#[derive(Clone)]
pub struct AppState {
    service_context: ServiceContext,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new API state
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        Self {
            service_context,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
