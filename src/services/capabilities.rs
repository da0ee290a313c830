//! Capability resolution
//!
//! Role grants are resolved once per user and cached until the user signs in
//! or out, or a grant changes. Every admin check goes through [`Session`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::RoleStore;
use crate::models::AppRole;
use crate::services::redis::RedisService;
use crate::utils::errors::{EventHubError, Result};

/// The authenticated caller and the capabilities resolved for them
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub capabilities: BTreeSet<AppRole>,
}

impl Session {
    pub fn has(&self, role: AppRole) -> bool {
        self.capabilities.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has(AppRole::Admin)
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, "Admin capability required");
            Err(EventHubError::PermissionDenied(
                "Administrator access required".to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone)]
struct CachedCapabilities {
    roles: BTreeSet<AppRole>,
    resolved_at: Instant,
}

#[derive(Clone)]
pub struct CapabilityResolver {
    roles: Arc<dyn RoleStore>,
    redis: Option<RedisService>,
    cache: Arc<RwLock<HashMap<Uuid, CachedCapabilities>>>,
    ttl: Duration,
    store_lookups: Arc<AtomicU64>,
}

impl CapabilityResolver {
    pub fn new(roles: Arc<dyn RoleStore>, redis: Option<RedisService>, ttl: Duration) -> Self {
        Self {
            roles,
            redis,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            store_lookups: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Capabilities for a user: local cache, then Redis, then the role store
    pub async fn resolve(&self, user_id: Uuid) -> Result<BTreeSet<AppRole>> {
        if let Some(cached) = self.cache.read().await.get(&user_id) {
            if cached.resolved_at.elapsed() < self.ttl {
                return Ok(cached.roles.clone());
            }
        }

        if let Some(redis) = &self.redis {
            match redis.get_capabilities(user_id).await {
                Ok(Some(roles)) => {
                    let roles: BTreeSet<AppRole> = roles.into_iter().collect();
                    self.remember(user_id, roles.clone()).await;
                    return Ok(roles);
                }
                Ok(None) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "Capability cache read failed"),
            }
        }

        self.store_lookups.fetch_add(1, Ordering::Relaxed);
        let roles: BTreeSet<AppRole> = self.roles.roles_for(user_id).await?.into_iter().collect();
        debug!(user_id = %user_id, roles = ?roles, "Capabilities resolved");

        if let Some(redis) = &self.redis {
            let list: Vec<AppRole> = roles.iter().copied().collect();
            if let Err(e) = redis.cache_capabilities(user_id, &list).await {
                warn!(user_id = %user_id, error = %e, "Capability cache write failed");
            }
        }
        self.remember(user_id, roles.clone()).await;

        Ok(roles)
    }

    /// Build a session for an authenticated identity
    pub async fn session(&self, user_id: Uuid, email: String) -> Result<Session> {
        let capabilities = self.resolve(user_id).await?;
        Ok(Session {
            user_id,
            email,
            capabilities,
        })
    }

    /// Drop any cached capabilities for a user
    pub async fn invalidate(&self, user_id: Uuid) {
        self.cache.write().await.remove(&user_id);
        if let Some(redis) = &self.redis {
            if let Err(e) = redis.invalidate_capabilities(user_id).await {
                warn!(user_id = %user_id, error = %e, "Capability cache invalidation failed");
            }
        }
        debug!(user_id = %user_id, "Capabilities invalidated");
    }

    pub async fn is_cached(&self, user_id: Uuid) -> bool {
        self.cache.read().await.contains_key(&user_id)
    }

    /// How many times the role store was consulted
    pub fn store_lookups(&self) -> u64 {
        self.store_lookups.load(Ordering::Relaxed)
    }

    async fn remember(&self, user_id: Uuid, roles: BTreeSet<AppRole>) {
        self.cache.write().await.insert(
            user_id,
            CachedCapabilities {
                roles,
                resolved_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::NewAccount;
    use crate::database::AccountStore;

    async fn student(store: &MemoryStore) -> Uuid {
        store
            .create_account(NewAccount {
                email: "kiran@college.edu".to_string(),
                password_hash: None,
                name: "Kiran".to_string(),
                mobile: None,
                year: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_resolution_is_cached_until_invalidated() {
        let store = Arc::new(MemoryStore::new());
        let user_id = student(&store).await;
        let resolver = CapabilityResolver::new(store.clone(), None, Duration::from_secs(60));

        let roles = resolver.resolve(user_id).await.unwrap();
        assert!(roles.contains(&AppRole::Student));
        resolver.resolve(user_id).await.unwrap();
        assert_eq!(resolver.store_lookups(), 1);

        store.grant(user_id, AppRole::Admin).await.unwrap();
        assert!(!resolver.resolve(user_id).await.unwrap().contains(&AppRole::Admin));

        resolver.invalidate(user_id).await;
        assert!(resolver.resolve(user_id).await.unwrap().contains(&AppRole::Admin));
        assert_eq!(resolver.store_lookups(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refreshed() {
        let store = Arc::new(MemoryStore::new());
        let user_id = student(&store).await;
        let resolver = CapabilityResolver::new(store, None, Duration::ZERO);

        resolver.resolve(user_id).await.unwrap();
        resolver.resolve(user_id).await.unwrap();
        assert_eq!(resolver.store_lookups(), 2);
    }

    #[test]
    fn test_require_admin() {
        let mut session = Session {
            user_id: Uuid::new_v4(),
            email: "a@b.co".to_string(),
            capabilities: BTreeSet::from([AppRole::Student]),
        };
        assert!(matches!(session.require_admin(), Err(EventHubError::PermissionDenied(_))));
        session.capabilities.insert(AppRole::Admin);
        assert!(session.require_admin().is_ok());
    }
}
