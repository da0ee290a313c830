//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod account;
pub mod admin;
pub mod announcement;
pub mod discussion;
pub mod event;
pub mod profile;
pub mod registration;
pub mod role;

// Re-export commonly used models
pub use account::{
    Account, NewAccount, PasswordResetConfirmation, PasswordResetRequest, PasswordResetToken,
    SignInRequest, SignUpRequest,
};
pub use admin::AdminAnalytics;
pub use announcement::{Announcement, AnnouncementDraft, AnnouncementInput, EventOption};
pub use discussion::{
    CreateDiscussionRequest, CreateReplyRequest, Discussion, DiscussionReply, DiscussionStatus,
    DiscussionWithAuthor, LikeOutcome, LikeToggle,
};
pub use event::{CategoryCount, CreateEventRequest, Event, EventCategory, EventFilter, EventStatus, UpdateEventRequest};
pub use profile::{CreateProfileRequest, Profile, ProfileCompletion, UpdateProfileRequest, UserWithRoles};
pub use registration::{
    MyRegistrations, Registration, RegistrationAffordance, RegistrationOutcome, RosterEntry,
    UnregistrationOutcome, UserRegistration,
};
pub use role::{AppRole, RoleGrant};
