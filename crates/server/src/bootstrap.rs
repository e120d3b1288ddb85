use std::sync::Arc;

use axum::Router;
use parley_core::config::{AppConfig, ConfigError};
use parley_core::ActionRegistry;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{health, webhook};

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<ActionRegistry>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no actions are registered; the server would answer every request with 404")]
    NoActions,
}

pub fn bootstrap_with_config(
    config: AppConfig,
    registry: ActionRegistry,
) -> Result<Application, BootstrapError> {
    if registry.is_empty() {
        return Err(BootstrapError::NoActions);
    }

    info!(
        event_name = "system.bootstrap.actions_loaded",
        correlation_id = "bootstrap",
        actions = ?registry.names(),
        "the following actions are loaded"
    );

    Ok(Application { config, registry: Arc::new(registry) })
}

impl Application {
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(Arc::clone(&self.registry)))
            .merge(webhook::router(Arc::clone(&self.registry), self.config.server.max_body_bytes))
            .layer(TraceLayer::new_for_http())
    }
}
