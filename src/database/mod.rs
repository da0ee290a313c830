//! Database module
//!
//! This module handles database connections, the storage traits and their
//! Postgres and in-memory implementations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool, PoolConfig};
pub use memory::MemoryStore;
pub use repositories::{
    AccountRepository, AnnouncementRepository, DiscussionRepository, EventRepository,
    ProfileRepository, RegistrationRepository, RoleRepository,
};
pub use service::DatabaseService;
pub use store::{
    AccountStore, AnnouncementStore, DiscussionStore, EventStore, ProfileStore, RegistrationStore,
    RoleStore,
};
