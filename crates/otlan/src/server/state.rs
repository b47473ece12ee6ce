//! Server Application State
//!
//! Shared state accessible by all HTTP handlers.

use std::sync::Arc;

use crate::bacnet::BacnetService;
use crate::config::GatewayConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Gateway core, holding the stack handle and the address cache
    service: BacnetService,

    /// Effective configuration
    config: GatewayConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(service: BacnetService, config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service, config }),
        }
    }

    pub fn service(&self) -> &BacnetService {
        &self.inner.service
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }
}
