//! Email delivery, password reset and capability cache behaviour

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use regex::Regex;

use EventHub::models::*;
use EventHub::services::notification::EmailKind;
use EventHub::EventHubError;

fn extract_reset_token(html: &str) -> String {
    let pattern = Regex::new(r"reset_token=([A-Za-z0-9]+)").unwrap();
    pattern
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .expect("reset link missing from email")
}

#[tokio::test]
async fn test_registration_sends_confirmation() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let student = ctx.student("neha@college.edu", "Neha Patil").await;
    let event = ctx.create_event(&admin.session, "Robotics Workshop", 30).await;

    ctx.services.registrations.register(&student.session, event.id).await.unwrap();
    ctx.settle_email().await;

    let sent = ctx.email.sent_emails().await;
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email.to, vec!["neha@college.edu".to_string()]);
    assert_eq!(email.subject, "Registration Confirmed: Robotics Workshop");
    assert!(email.html.contains("Neha Patil"));
    assert!(email.html.contains("Seminar Hall 2"));

    let stats = ctx.services.notifications.stats();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_provider_failure_is_dead_lettered() {
    let ctx = TestContext::new_with_config(TestConfig {
        email_succeeds: false,
        max_attempts: 3,
        ..TestConfig::default()
    })
    .await;
    let admin = ctx.admin().await;
    let student = ctx.student("rohit@college.edu", "Rohit").await;
    let event = ctx.create_event(&admin.session, "Cultural Night", 300).await;

    // registration succeeds regardless of the mail provider
    let outcome = ctx.services.registrations.register(&student.session, event.id).await.unwrap();
    assert_eq!(outcome.event.current_attendees, 1);

    ctx.settle_email().await;

    assert_eq!(ctx.email.request_count().await, 3);
    let dead = ctx.services.notifications.dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].kind, EmailKind::RegistrationConfirmation);
    assert_eq!(dead[0].recipient, "rohit@college.edu");
    assert_eq!(dead[0].attempts, 3);
    assert!(!dead[0].last_error.is_empty());

    let stats = ctx.services.notifications.stats();
    assert_eq!(stats.sent, 0);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retries, 2);
}

#[tokio::test]
async fn test_disabled_email_skips_provider() {
    let ctx = TestContext::new_with_config(TestConfig {
        email_enabled: false,
        ..TestConfig::default()
    })
    .await;
    let admin = ctx.admin().await;
    let student = ctx.student("sana@college.edu", "Sana").await;
    let event = ctx.create_event(&admin.session, "Quiz Bowl", 40).await;

    ctx.services.registrations.register(&student.session, event.id).await.unwrap();

    assert!(!ctx.services.notifications.is_enabled());
    assert_eq!(ctx.email.request_count().await, 0);
    assert!(ctx.services.notifications.dead_letters().await.is_empty());
}

#[tokio::test]
async fn test_reset_for_unknown_email_sends_nothing() {
    let ctx = TestContext::new().await;

    ctx.services
        .auth
        .request_password_reset(PasswordResetRequest {
            email: "ghost@college.edu".to_string(),
        })
        .await
        .unwrap();
    ctx.settle_email().await;
    assert_eq!(ctx.email.request_count().await, 0);

    assert_matches!(
        ctx.services
            .auth
            .request_password_reset(PasswordResetRequest {
                email: "not-an-email".to_string(),
            })
            .await,
        Err(EventHubError::InvalidInput(_))
    );
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let ctx = TestContext::new().await;
    ctx.student("aditi@college.edu", "Aditi").await;

    ctx.services
        .auth
        .request_password_reset(PasswordResetRequest {
            email: "Aditi@College.edu".to_string(),
        })
        .await
        .unwrap();
    ctx.settle_email().await;

    let sent = ctx.email.sent_emails().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["aditi@college.edu".to_string()]);
    assert!(sent[0].subject.starts_with("Reset Your Password"));
    assert!(sent[0].html.contains("http://campus.test/auth?reset_token="));
    let token = extract_reset_token(&sent[0].html);

    ctx.services
        .auth
        .confirm_password_reset(PasswordResetConfirmation {
            token: token.clone(),
            password: "newcampus99".to_string(),
        })
        .await
        .unwrap();

    // single use
    assert_matches!(
        ctx.services
            .auth
            .confirm_password_reset(PasswordResetConfirmation {
                token,
                password: "another123".to_string(),
            })
            .await,
        Err(EventHubError::InvalidInput(m)) if m == "Invalid or expired reset token"
    );

    assert_matches!(
        ctx.services
            .auth
            .sign_in(SignInRequest {
                email: "aditi@college.edu".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await,
        Err(EventHubError::Authentication(_))
    );
    let signed_in = ctx
        .services
        .auth
        .sign_in(SignInRequest {
            email: "aditi@college.edu".to_string(),
            password: "newcampus99".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(signed_in.session.email, "aditi@college.edu");
}

#[tokio::test]
async fn test_sign_out_clears_cached_capabilities() {
    let ctx = TestContext::new().await;
    let student = ctx.student("dev@college.edu", "Dev").await;
    let user_id = student.session.user_id;

    ctx.services.auth.authenticate(&student.token).await.unwrap();
    assert!(ctx.services.capabilities.is_cached(user_id).await);

    ctx.services.auth.sign_out(&student.session).await;
    assert!(!ctx.services.capabilities.is_cached(user_id).await);
}

#[tokio::test]
async fn test_granted_admin_applies_to_next_request() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let student = ctx.student("priya@college.edu", "Priya").await;
    let user_id = student.session.user_id;

    let before = ctx.services.auth.authenticate(&student.token).await.unwrap();
    assert!(!before.is_admin());
    assert!(ctx.services.capabilities.is_cached(user_id).await);

    assert!(ctx.services.profiles.grant_admin(&admin.session, user_id).await.unwrap());
    assert!(!ctx.services.capabilities.is_cached(user_id).await);
    assert!(!ctx.services.profiles.grant_admin(&admin.session, user_id).await.unwrap());

    // same token, fresh capabilities
    let after = ctx.services.auth.authenticate(&student.token).await.unwrap();
    assert!(after.is_admin());
    assert!(after.has(AppRole::Student));

    assert_matches!(
        ctx.services.profiles.grant_admin(&student.session, admin.session.user_id).await,
        Err(EventHubError::PermissionDenied(_))
    );
}
