//! Test context for unified test setup
//!
//! Wires the full service graph over the in-memory store, with email going to
//! a wiremock provider. `spawn_server` runs the real router on a local port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use EventHub::config::Settings;
use EventHub::database::{DatabaseService, MemoryStore, RoleStore};
use EventHub::models::*;
use EventHub::services::{AuthResponse, ServiceFactory, Session};
use EventHub::state::AppState;

use super::email_mock::{EmailMockServer, TEST_EMAIL_API_KEY};
use super::test_data::{event_request, sign_up_request};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Knobs for a test context
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub email_enabled: bool,
    pub email_succeeds: bool,
    pub max_attempts: u32,
    pub auth_requests_per_minute: u32,
    pub auth_burst: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            email_enabled: true,
            email_succeeds: true,
            max_attempts: 3,
            auth_requests_per_minute: 600,
            auth_burst: 100,
        }
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub services: ServiceFactory,
    pub state: AppState,
    pub settings: Settings,
    pub email: EmailMockServer,
    pub temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::new_with_config(TestConfig::default()).await
    }

    pub async fn new_with_config(config: TestConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("EventHub=debug")
            .with_test_writer()
            .try_init();

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let email = EmailMockServer::new().await;
        if config.email_succeeds {
            email.mock_accept_all().await;
        } else {
            email.mock_failure(500).await;
        }

        let settings = Self::create_test_settings(&config, &email, &temp_dir);
        let store = Arc::new(MemoryStore::new());
        let (services, _worker) = ServiceFactory::new(&settings, DatabaseService::from_memory(store.clone()))
            .expect("Failed to build services");
        let state = AppState::new(settings.clone(), services.clone());

        Self {
            store,
            services,
            state,
            settings,
            email,
            temp_dir,
        }
    }

    fn create_test_settings(config: &TestConfig, email: &EmailMockServer, temp_dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.server.site_url = "http://campus.test".to_string();
        settings.database.url = "memory".to_string();
        settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
        settings.email.api_url = email.api_url();
        settings.email.api_key = TEST_EMAIL_API_KEY.to_string();
        settings.email.max_attempts = config.max_attempts;
        settings.email.retry_base_ms = 5;
        settings.email.timeout_seconds = 5;
        settings.features.email_notifications = config.email_enabled;
        settings.rate_limit.auth_requests_per_minute = config.auth_requests_per_minute;
        settings.rate_limit.auth_burst = config.auth_burst;
        settings.realtime.keep_alive_seconds = 1;
        settings.logging.file_path = Some(temp_dir.path().to_string_lossy().into_owned());
        settings
    }

    /// Sign up a student account
    pub async fn student(&self, email: &str, name: &str) -> AuthResponse {
        self.services
            .auth
            .sign_up(sign_up_request(email, name))
            .await
            .expect("Failed to sign up student")
    }

    /// Sign up an account and grant it the admin role
    pub async fn admin(&self) -> AuthResponse {
        let mut response = self.student("admin@college.edu", "Event Cell").await;
        self.store
            .grant(response.session.user_id, AppRole::Admin)
            .await
            .expect("Failed to grant admin");
        self.services.capabilities.invalidate(response.session.user_id).await;
        response.session = self
            .services
            .capabilities
            .session(response.session.user_id, response.session.email.clone())
            .await
            .expect("Failed to resolve admin session");
        response
    }

    pub async fn create_event(&self, admin: &Session, title: &str, max_attendees: i32) -> Event {
        self.services
            .events
            .create(admin, event_request(title, max_attendees))
            .await
            .expect("Failed to create event")
    }

    /// Wait for the email worker to drain its queue
    pub async fn settle_email(&self) {
        assert!(
            self.services.notifications.wait_idle(Duration::from_secs(5)).await,
            "email queue did not drain"
        );
    }

    pub async fn spawn_server(&self) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr: SocketAddr = listener.local_addr().expect("No local address");
        let (shutdown, signal) = oneshot::channel::<()>();

        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            EventHub::serve(listener, state, async {
                let _ = signal.await;
            })
            .await
            .expect("Server failed");
        });

        TestServer {
            base_url: format!("http://{}", addr),
            client: Client::new(),
            shutdown: Some(shutdown),
            handle,
        }
    }
}

/// A running server bound to a random local port
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), &mut self.handle).await;
    }
}
