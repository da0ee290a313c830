//! Configuration loading from the environment

use serial_test::serial;

use EventHub::config::Settings;
use EventHub::EventHubError;

const OVERRIDES: [(&str, &str); 5] = [
    ("EVENTHUB__SERVER__PORT", "9090"),
    ("EVENTHUB__SERVER__CORS_ORIGINS", "http://localhost:5173,https://events.college.edu"),
    ("EVENTHUB__AUTH__JWT_SECRET", "an-environment-secret-of-enough-length"),
    ("EVENTHUB__DATABASE__URL", "memory"),
    ("EVENTHUB__EMAIL__MAX_ATTEMPTS", "5"),
];

fn clear_overrides() {
    for (key, _) in OVERRIDES {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    for (key, value) in OVERRIDES {
        std::env::set_var(key, value);
    }

    let settings = Settings::new().expect("settings should load");
    clear_overrides();

    assert_eq!(settings.server.port, 9090);
    assert_eq!(
        settings.server.cors_origins,
        vec![
            "http://localhost:5173".to_string(),
            "https://events.college.edu".to_string()
        ]
    );
    assert_eq!(settings.database.url, "memory");
    assert_eq!(settings.email.max_attempts, 5);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_missing_secret_fails_validation() {
    clear_overrides();

    let settings = Settings::new().expect("defaults should load");
    assert!(settings.auth.jwt_secret.is_empty());
    match settings.validate() {
        Err(EventHubError::Config(message)) => assert!(message.contains("JWT secret")),
        other => panic!("expected config error, got {:?}", other),
    }
}
