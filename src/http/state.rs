use std::sync::Arc;

use crate::config::Config;
use crate::sink::SinkBuilder;

/// Shared application state for HTTP handlers
///
/// Sessions share nothing mutable; each connection builds its own
/// transcriber and sink from this.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sinks: SinkBuilder,
}

impl AppState {
    pub fn new(config: Config, sinks: SinkBuilder) -> Self {
        Self {
            config: Arc::new(config),
            sinks,
        }
    }
}
