//! Shared application state
//!
//! One `AppState` is built at startup and cloned into every request.

use std::sync::Arc;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::middleware::rate_limit::AuthRateLimiter;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub settings: Arc<Settings>,
    pub auth_limiter: AuthRateLimiter,
}

impl AppState {
    pub fn new(settings: Settings, services: ServiceFactory) -> Self {
        let auth_limiter = AuthRateLimiter::new(&settings.rate_limit);
        Self {
            services,
            settings: Arc::new(settings),
            auth_limiter,
        }
    }

    /// Build services over `db` and wrap them. The email worker runs detached.
    pub fn build(settings: Settings, db: DatabaseService) -> Result<Self> {
        let (services, _worker) = ServiceFactory::new(&settings, db)?;
        Ok(Self::new(settings, services))
    }
}
