//! Administrative read models

use serde::{Deserialize, Serialize};

/// Dashboard counters shown to administrators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAnalytics {
    pub upcoming_events: i64,
    pub total_registrations: i64,
    pub pending_discussions: i64,
    pub total_users: i64,
}
