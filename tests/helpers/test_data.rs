//! Test data helpers for creating requests and fixtures

use EventHub::models::*;

pub const TEST_PASSWORD: &str = "campus2024";

pub fn sign_up_request(email: &str, name: &str) -> SignUpRequest {
    SignUpRequest {
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
        name: name.to_string(),
        mobile: "9876543210".to_string(),
        year: "SE".to_string(),
    }
}

pub fn event_request(title: &str, max_attendees: i32) -> CreateEventRequest {
    CreateEventRequest {
        title: title.to_string(),
        description: format!("{} for all branches", title),
        date: "2026-11-20".to_string(),
        time: "10:00".to_string(),
        location: "Seminar Hall 2".to_string(),
        category: EventCategory::Technical,
        max_attendees,
        status: None,
        featured: None,
        registration_open: None,
    }
}

pub fn announcement_input(title: &str) -> AnnouncementInput {
    AnnouncementInput {
        title: title.to_string(),
        message: format!("{} details are on the notice board", title),
        link: None,
        event_id: None,
        is_important: false,
    }
}

pub fn discussion_request(title: &str) -> CreateDiscussionRequest {
    CreateDiscussionRequest {
        title: title.to_string(),
        description: "Would love to see this on campus next semester".to_string(),
    }
}
