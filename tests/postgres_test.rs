//! Repository behaviour against a real PostgreSQL server
//!
//! These run the SQL the in-memory store stands in for: row locks, the
//! attendee counter functions, enum mappings and joins.

mod helpers;

use std::collections::HashSet;

use assert_matches::assert_matches;
use helpers::*;
use serial_test::serial;
use uuid::Uuid;

use EventHub::models::*;
use EventHub::EventHubError;

async fn ledger_count(db: &TestDatabase, event_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_pg_last_slot_admits_exactly_one() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let event = db
        .events
        .create(admin.id, event_request("Coding Contest", 3))
        .await
        .unwrap();

    for i in 0..2 {
        let early = create_test_account(&db, &format!("early{}@college.edu", i), "Early").await;
        db.registrations.register(early.id, event.id).await.unwrap();
    }

    let mut late = Vec::new();
    for i in 0..8 {
        late.push(create_test_account(&db, &format!("late{}@college.edu", i), "Late").await);
    }

    let event_id = event.id;
    let handles: Vec<_> = late
        .into_iter()
        .map(|account| {
            let registrations = db.registrations.clone();
            tokio::spawn(async move { registrations.register(account.id, event_id).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                admitted += 1;
                assert_eq!(outcome.event.current_attendees, 3);
            }
            Err(e) => assert_matches!(e, EventHubError::EventFull { .. }),
        }
    }
    assert_eq!(admitted, 1);

    let stored = db.events.find_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(stored.current_attendees, 3);
    assert_eq!(ledger_count(&test_db, event.id).await, 3);
}

#[tokio::test]
#[serial]
async fn test_pg_duplicate_and_closed_registration() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let student = create_test_account(&db, "ira@college.edu", "Ira").await;
    let event = db.events.create(admin.id, event_request("Design Sprint", 10)).await.unwrap();

    db.registrations.register(student.id, event.id).await.unwrap();
    assert_matches!(
        db.registrations.register(student.id, event.id).await,
        Err(EventHubError::AlreadyRegistered { .. })
    );
    assert!(db.registrations.is_registered(student.id, event.id).await.unwrap());

    db.events
        .update(
            event.id,
            UpdateEventRequest {
                status: Some(EventStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let other = create_test_account(&db, "omar@college.edu", "Omar").await;
    assert_matches!(
        db.registrations.register(other.id, event.id).await,
        Err(EventHubError::RegistrationClosed { .. })
    );
    assert_matches!(
        db.registrations.register(other.id, Uuid::new_v4()).await,
        Err(EventHubError::EventNotFound { .. })
    );
}

#[tokio::test]
#[serial]
async fn test_pg_unregister_missing_row_keeps_counter() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let registered = create_test_account(&db, "lata@college.edu", "Lata").await;
    let stranger = create_test_account(&db, "karan@college.edu", "Karan").await;
    let event = db.events.create(admin.id, event_request("Photography Walk", 10)).await.unwrap();

    db.registrations.register(registered.id, event.id).await.unwrap();

    let outcome = db.registrations.unregister(stranger.id, event.id).await.unwrap();
    assert!(outcome.removed.is_none());
    assert_eq!(outcome.event.current_attendees, 1);

    let outcome = db.registrations.unregister(registered.id, event.id).await.unwrap();
    assert_eq!(outcome.removed.map(|r| r.user_id), Some(registered.id));
    assert_eq!(outcome.event.current_attendees, 0);

    let outcome = db.registrations.unregister(registered.id, event.id).await.unwrap();
    assert!(outcome.removed.is_none());
    assert_eq!(outcome.event.current_attendees, 0);
}

#[tokio::test]
#[serial]
async fn test_pg_counter_matches_ledger() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let event = db.events.create(admin.id, event_request("Chess Open", 16)).await.unwrap();

    let mut students = Vec::new();
    for i in 0..6 {
        let student = create_test_account(&db, &format!("player{}@college.edu", i), "Player").await;
        db.registrations.register(student.id, event.id).await.unwrap();
        students.push(student);
    }
    for student in &students[..2] {
        db.registrations.unregister(student.id, event.id).await.unwrap();
    }

    let stored = db.events.find_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(stored.current_attendees, 4);
    assert_eq!(ledger_count(&test_db, event.id).await, 4);
    assert_eq!(db.registrations.count().await.unwrap(), 4);

    test_db
        .execute_sql(&format!("UPDATE events SET current_attendees = 9 WHERE id = '{}'", event.id))
        .await
        .unwrap();
    let repaired = db.registrations.recount(event.id).await.unwrap().unwrap();
    assert_eq!(repaired.current_attendees, 4);
    assert!(db.registrations.recount(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_pg_capacity_cannot_drop_below_attendees() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let event = db.events.create(admin.id, event_request("Startup Pitch", 5)).await.unwrap();
    for i in 0..3 {
        let student = create_test_account(&db, &format!("pitch{}@college.edu", i), "Pitcher").await;
        db.registrations.register(student.id, event.id).await.unwrap();
    }

    let shrink = |max_attendees| UpdateEventRequest {
        max_attendees: Some(max_attendees),
        ..Default::default()
    };
    assert!(db.events.update(event.id, shrink(2)).await.unwrap().is_none());

    let updated = db.events.update(event.id, shrink(3)).await.unwrap().unwrap();
    assert_eq!(updated.max_attendees, 3);
    assert!(updated.is_full());
    // untouched fields survive a partial update
    assert_eq!(updated.title, "Startup Pitch");
    assert_eq!(updated.location, event.location);
    assert_eq!(updated.category, event.category);

    let renamed = db
        .events
        .update(
            event.id,
            UpdateEventRequest {
                title: Some("Startup Pitch Finals".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.title, "Startup Pitch Finals");
    assert_eq!(renamed.max_attendees, 3);
}

#[tokio::test]
#[serial]
async fn test_pg_industrial_visit_category() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let visit = db
        .events
        .create(
            admin.id,
            CreateEventRequest {
                category: EventCategory::IndustrialVisit,
                ..event_request("Plant Visit", 40)
            },
        )
        .await
        .unwrap();
    db.events.create(admin.id, event_request("Tech Talk", 100)).await.unwrap();

    let stored = db.events.find_by_id(visit.id).await.unwrap().unwrap();
    assert_eq!(stored.category, EventCategory::IndustrialVisit);

    let label: String = sqlx::query_scalar("SELECT category::text FROM events WHERE id = $1")
        .bind(visit.id)
        .fetch_one(&test_db.pool)
        .await
        .unwrap();
    assert_eq!(label, "Industrial Visit");

    let filtered = db
        .events
        .list(&EventFilter {
            search: None,
            category: Some(EventCategory::IndustrialVisit),
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, visit.id);

    let searched = db
        .events
        .list(&EventFilter {
            search: Some("plant".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);

    let counts = db.events.category_counts().await.unwrap();
    let count_of = |category| counts.iter().find(|c| c.category == category).map(|c| c.count);
    assert_eq!(count_of(EventCategory::IndustrialVisit), Some(1));
    assert_eq!(count_of(EventCategory::Technical), Some(1));
    assert_eq!(count_of(EventCategory::Cultural), Some(0));
}

#[tokio::test]
#[serial]
async fn test_pg_discussion_listing_and_likes() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let author = create_test_account(&db, "asha@college.edu", "Asha").await;
    let fan = create_test_account(&db, "vikram@college.edu", "Vikram").await;
    let discussion = db
        .discussions
        .create(
            author.id,
            "Music jam session".to_string(),
            "Would love to see this on campus".to_string(),
        )
        .await
        .unwrap();

    let liked = db.discussions.toggle_like(discussion.id, author.id).await.unwrap().unwrap();
    assert!(liked.liked);
    assert_eq!(liked.discussion.likes, 1);
    let liked = db.discussions.toggle_like(discussion.id, fan.id).await.unwrap().unwrap();
    assert_eq!(liked.outcome(), LikeOutcome { liked: true, likes: 2 });
    let unliked = db.discussions.toggle_like(discussion.id, author.id).await.unwrap().unwrap();
    assert_eq!(unliked.outcome(), LikeOutcome { liked: false, likes: 1 });
    assert_eq!(unliked.discussion.title, "Music jam session");
    assert!(db.discussions.toggle_like(Uuid::new_v4(), fan.id).await.unwrap().is_none());

    let listed = db.discussions.list(None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].discussion.id, discussion.id);
    assert_eq!(listed[0].discussion.likes, 1);
    assert_eq!(listed[0].discussion.status, DiscussionStatus::Pending);
    assert_eq!(listed[0].author_name.as_deref(), Some("Asha"));
    assert_eq!(listed[0].author_year.as_deref(), Some("SE"));

    db.discussions
        .set_status(discussion.id, DiscussionStatus::UnderReview)
        .await
        .unwrap();
    assert!(db.discussions.list(Some(DiscussionStatus::Pending)).await.unwrap().is_empty());
    assert_eq!(
        db.discussions.count_by_status(DiscussionStatus::UnderReview).await.unwrap(),
        1
    );
}

#[tokio::test]
#[serial]
async fn test_pg_delete_event_returns_cascaded_registrations() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let admin = create_test_account(&db, "admin@college.edu", "Event Cell").await;
    let event = db.events.create(admin.id, event_request("Cancelled Trek", 12)).await.unwrap();

    let mut expected = HashSet::new();
    for name in ["yash", "neel"] {
        let student = create_test_account(&db, &format!("{}@college.edu", name), name).await;
        let outcome = db.registrations.register(student.id, event.id).await.unwrap();
        expected.insert(outcome.registration.id);
    }

    let removed = db.events.delete(event.id).await.unwrap().unwrap();
    let removed: HashSet<Uuid> = removed.into_iter().map(|r| r.id).collect();
    assert_eq!(removed, expected);
    assert!(db.events.find_by_id(event.id).await.unwrap().is_none());
    assert_eq!(test_db.count_records("event_registrations").await.unwrap(), 0);
    assert!(db.events.delete(event.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_pg_profile_fields_clear_and_keep() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let account = create_test_account(&db, "kiran@college.edu", "Kiran").await;

    let profile = db
        .profiles
        .update(
            account.id,
            UpdateProfileRequest {
                mobile: Some(None),
                semester: Some(Some("5".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.mobile, None);
    assert_eq!(profile.semester.as_deref(), Some("5"));
    assert_eq!(profile.year.as_deref(), Some("SE"));
    assert_eq!(profile.name, "Kiran");
}

#[tokio::test]
#[serial]
async fn test_pg_role_grants() {
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let db = test_db.service();
    let account = create_test_account(&db, "priya@college.edu", "Priya").await;

    assert_eq!(db.roles.roles_for(account.id).await.unwrap(), vec![AppRole::Student]);
    assert!(!db.roles.has_role(account.id, AppRole::Admin).await.unwrap());

    assert!(db.roles.grant(account.id, AppRole::Admin).await.unwrap());
    assert!(!db.roles.grant(account.id, AppRole::Admin).await.unwrap());
    assert!(db.roles.has_role(account.id, AppRole::Admin).await.unwrap());
    assert_eq!(
        db.roles.roles_for(account.id).await.unwrap(),
        vec![AppRole::Admin, AppRole::Student]
    );

    assert_matches!(
        db.accounts
            .create_account(NewAccount {
                email: "priya@college.edu".to_string(),
                password_hash: None,
                name: "Duplicate".to_string(),
                mobile: None,
                year: None,
            })
            .await,
        Err(EventHubError::InvalidInput(_))
    );
}
