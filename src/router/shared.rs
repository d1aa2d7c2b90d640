use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use super::{ConfigError, Router, RouterConfig};

/// Hands out snapshots of the current [`Router`] and swaps in rebuilt ones.
///
/// Readers clone the inner `Arc` and then route without holding any lock; a
/// rebuild is fully constructed before it replaces the pointer.
#[derive(Debug, Default)]
pub struct SharedRouter {
    current: RwLock<Arc<Router>>,
}

impl SharedRouter {
    pub fn new(router: Router) -> Self {
        Self {
            current: RwLock::new(Arc::new(router)),
        }
    }

    pub fn load(&self) -> Arc<Router> {
        Arc::clone(&self.current.read())
    }

    pub fn publish(&self, router: Router) {
        *self.current.write() = Arc::new(router);
        info!("published new router");
    }

    /// Builds a router from `cfg` and publishes it. On error the current
    /// router stays in place.
    pub fn rebuild(&self, cfg: &RouterConfig) -> Result<(), ConfigError> {
        let router = Router::new(cfg)?;
        self.publish(router);
        Ok(())
    }
}
