//! Database repositories module
//!
//! Postgres implementations of the storage traits in [`crate::database::store`]

pub mod account;
pub mod announcement;
pub mod discussion;
pub mod event;
pub mod profile;
pub mod registration;
pub mod role;

// Re-export repositories
pub use account::AccountRepository;
pub use announcement::AnnouncementRepository;
pub use discussion::DiscussionRepository;
pub use event::EventRepository;
pub use profile::ProfileRepository;
pub use registration::RegistrationRepository;
pub use role::RoleRepository;
