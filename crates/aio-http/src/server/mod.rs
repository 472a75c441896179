//! Server configuration referenced by every session.
//!
//! A [`Server`] bundles the request [`Handler`] and the [`SessionConfig`].
//! Sessions only hold a weak reference to it; dropping the last `Arc<Server>`
//! makes live sessions close at their next dispatch.

mod config;

pub use config::SessionConfig;

use std::sync::Arc;

use crate::handler::Handler;

#[derive(Clone)]
pub struct Server {
    handler: Option<Arc<dyn Handler>>,
    config: SessionConfig,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("has_handler", &self.handler.is_some()).field("config", &self.config).finish()
    }
}

impl Server {
    /// A server without handler: requests are parsed and dropped unanswered.
    pub fn new(config: SessionConfig) -> Self {
        Self { handler: None, config }
    }

    pub fn with_handler<H>(config: SessionConfig, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Self { handler: Some(Arc::new(handler)), config }
    }

    pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
        self.handler.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
