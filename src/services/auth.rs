//! Authentication service
//!
//! Password accounts, signed session tokens, password reset and OAuth sign-in.
//! Every successful sign-in drops the cached capabilities so the new session
//! sees current role grants.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{AuthConfig, OAuthProviderConfig, Settings};
use crate::database::{AccountStore, DatabaseService};
use crate::models::*;
use crate::services::capabilities::{CapabilityResolver, Session};
use crate::services::notification::NotificationService;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{
    generate_random_string, is_valid_email, is_valid_mobile, require_text, sha256_hex,
    validate_password,
};
use crate::utils::logging::{log_api_error, log_user_action};

const RESET_TOKEN_LENGTH: usize = 48;
const OAUTH_STATE_LENGTH: usize = 32;
const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);
const OAUTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: Session,
}

#[derive(Debug, Clone)]
struct PendingOAuth {
    provider: String,
    issued_at: Instant,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthUserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    capabilities: CapabilityResolver,
    notifications: NotificationService,
    config: AuthConfig,
    site_url: String,
    oauth_enabled: bool,
    http: Client,
    pending_oauth: Arc<Mutex<HashMap<String, PendingOAuth>>>,
}

impl AuthService {
    pub fn new(
        db: &DatabaseService,
        capabilities: CapabilityResolver,
        notifications: NotificationService,
        settings: &Settings,
    ) -> Result<Self> {
        let http = Client::builder().timeout(OAUTH_TIMEOUT).build()?;
        Ok(Self {
            accounts: db.accounts.clone(),
            capabilities,
            notifications,
            config: settings.auth.clone(),
            site_url: settings.server.site_url.trim_end_matches('/').to_string(),
            oauth_enabled: settings.features.oauth,
            http,
            pending_oauth: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Open a password account with its profile and `student` role
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AuthResponse> {
        let email = normalize_email(&request.email)?;
        let name = require_text(&request.name, "Name")?;
        let mobile = require_text(&request.mobile, "Mobile number")?;
        let year = require_text(&request.year, "Year")?;
        if !is_valid_mobile(&mobile) {
            return Err(EventHubError::InvalidInput(
                "Please enter a valid mobile number".to_string(),
            ));
        }
        validate_password(&request.password)?;

        let password_hash = hash_password_blocking(request.password).await?;
        let account = self
            .accounts
            .create_account(NewAccount {
                email,
                password_hash: Some(password_hash),
                name,
                mobile: Some(mobile),
                year: Some(year),
            })
            .await?;

        log_user_action(account.id, "sign_up", None);
        self.start_session(&account).await
    }

    /// Any mismatch is reported the same way so callers cannot enumerate accounts
    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthResponse> {
        let invalid = || EventHubError::Authentication("Invalid login credentials".to_string());

        let email = request.email.trim().to_lowercase();
        let account = self.accounts.find_by_email(&email).await?;
        let Some((account, hash)) = account.and_then(|a| a.password_hash.clone().map(|h| (a, h))) else {
            // pay the same argon2 cost as a real check
            verify_against_dummy_blocking(request.password).await?;
            debug!("Sign-in for unknown or passwordless account");
            return Err(invalid());
        };

        if !verify_password_blocking(request.password, hash).await? {
            warn!(user_id = %account.id, "Sign-in with wrong password");
            return Err(invalid());
        }

        log_user_action(account.id, "sign_in", None);
        self.start_session(&account).await
    }

    pub async fn sign_out(&self, session: &Session) {
        self.capabilities.invalidate(session.user_id).await;
        log_user_action(session.user_id, "sign_out", None);
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    /// Resolve a bearer token into a session with current capabilities
    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        let claims = self.verify_token(token)?;
        self.capabilities.session(claims.sub, claims.email).await
    }

    /// Always succeeds for a well-formed address; mail goes out only when the account exists
    pub async fn request_password_reset(&self, request: PasswordResetRequest) -> Result<()> {
        let email = normalize_email(&request.email)?;
        let Some(account) = self.accounts.find_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self.issue_reset_token(&account).await?;
        let link = format!("{}/auth?reset_token={}", self.site_url, urlencoding::encode(&token));
        if !self.notifications.send_password_reset(&account.email, &link).await {
            warn!(user_id = %account.id, "Password reset email not queued");
        }

        log_user_action(account.id, "request_password_reset", None);
        Ok(())
    }

    /// Store the digest of a fresh reset token and return the token itself
    async fn issue_reset_token(&self, account: &Account) -> Result<String> {
        let token = generate_random_string(RESET_TOKEN_LENGTH);
        let expires_at = Utc::now() + chrono::Duration::minutes(self.config.reset_token_ttl_minutes);
        self.accounts
            .create_reset_token(account.id, &sha256_hex(&token), expires_at)
            .await?;
        Ok(token)
    }

    pub async fn confirm_password_reset(&self, request: PasswordResetConfirmation) -> Result<()> {
        validate_password(&request.password)?;

        let account_id = self
            .accounts
            .consume_reset_token(&sha256_hex(request.token.trim()), Utc::now())
            .await?
            .ok_or_else(|| EventHubError::InvalidInput("Invalid or expired reset token".to_string()))?;

        let password_hash = hash_password_blocking(request.password).await?;
        self.accounts.set_password_hash(account_id, &password_hash).await?;
        self.capabilities.invalidate(account_id).await;

        log_user_action(account_id, "reset_password", None);
        Ok(())
    }

    /// Provider authorize URL carrying a fresh `state` value
    pub async fn oauth_authorize_url(&self, provider: &str) -> Result<String> {
        let config = self.oauth_provider(provider)?;

        let state = generate_random_string(OAUTH_STATE_LENGTH);
        {
            let mut pending = self.pending_oauth.lock().await;
            pending.retain(|_, p| p.issued_at.elapsed() < OAUTH_STATE_TTL);
            pending.insert(
                state.clone(),
                PendingOAuth {
                    provider: provider.to_string(),
                    issued_at: Instant::now(),
                },
            );
        }

        let mut url = Url::parse(&config.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &self.redirect_url(provider, config))
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", &state);
        Ok(url.to_string())
    }

    /// Exchange the authorization code and sign the user in, creating the account on first use
    pub async fn complete_oauth(&self, provider: &str, code: &str, state: &str) -> Result<AuthResponse> {
        let config = self.oauth_provider(provider)?;

        let pending = self.pending_oauth.lock().await.remove(state);
        match pending {
            Some(p) if p.provider == provider && p.issued_at.elapsed() < OAUTH_STATE_TTL => {}
            _ => {
                warn!(provider, "OAuth callback with unknown or expired state");
                return Err(EventHubError::Authentication("Invalid OAuth state".to_string()));
            }
        }

        let access_token = self.exchange_code(provider, config, code).await?;
        let info = self.fetch_user_info(provider, config, &access_token).await?;

        let email = info
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| is_valid_email(e))
            .ok_or_else(|| {
                EventHubError::Authentication("OAuth provider did not return an email address".to_string())
            })?;

        let account = match self.accounts.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                let name = info
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
                let account = self
                    .accounts
                    .create_account(NewAccount {
                        email,
                        password_hash: None,
                        name,
                        mobile: None,
                        year: None,
                    })
                    .await?;
                info!(user_id = %account.id, provider, "Account created through OAuth");
                account
            }
        };

        log_user_action(account.id, "oauth_sign_in", Some(provider));
        self.start_session(&account).await
    }

    fn oauth_provider(&self, provider: &str) -> Result<&OAuthProviderConfig> {
        if !self.oauth_enabled {
            return Err(EventHubError::InvalidInput("OAuth sign-in is not enabled".to_string()));
        }
        self.config
            .oauth
            .get(provider)
            .ok_or_else(|| EventHubError::InvalidInput(format!("Unknown sign-in provider: {}", provider)))
    }

    fn redirect_url(&self, provider: &str, config: &OAuthProviderConfig) -> String {
        config
            .redirect_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/oauth/{}/callback", self.site_url, provider))
    }

    async fn exchange_code(&self, provider: &str, config: &OAuthProviderConfig, code: &str) -> Result<String> {
        let redirect_uri = self.redirect_url(provider, config);
        let response = self
            .http
            .post(&config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            log_api_error(provider, &format!("token exchange returned {}", status), Some("oauth"));
            return Err(EventHubError::Authentication("OAuth sign-in failed".to_string()));
        }

        let token: OAuthTokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, provider: &str, config: &OAuthProviderConfig, access_token: &str) -> Result<OAuthUserInfo> {
        let response = self
            .http
            .get(&config.userinfo_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            log_api_error(provider, &format!("userinfo returned {}", status), Some("oauth"));
            return Err(EventHubError::Authentication("OAuth sign-in failed".to_string()));
        }

        Ok(response.json().await?)
    }

    async fn start_session(&self, account: &Account) -> Result<AuthResponse> {
        self.capabilities.invalidate(account.id).await;
        let session = self.capabilities.session(account.id, account.email.clone()).await?;
        let (token, expires_at) = self.issue_token(account)?;
        Ok(AuthResponse {
            token,
            expires_at,
            session,
        })
    }

    fn issue_token(&self, account: &Account) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.config.session_ttl_hours);
        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?;
        Ok((token, expires_at))
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = require_text(email, "Email")?.to_lowercase();
    if !is_valid_email(&email) {
        return Err(EventHubError::InvalidInput(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(email)
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| EventHubError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EventHubError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| EventHubError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| EventHubError::PasswordHash(e.to_string()))?
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| EventHubError::PasswordHash(e.to_string()))?
}

static DUMMY_PASSWORD_HASH: OnceLock<String> = OnceLock::new();

/// Hash that no submitted password is expected to match, built on first use
fn dummy_password_hash() -> Result<&'static str> {
    if let Some(hash) = DUMMY_PASSWORD_HASH.get() {
        return Ok(hash);
    }
    let hash = hash_password(&generate_random_string(32))?;
    Ok(DUMMY_PASSWORD_HASH.get_or_init(|| hash))
}

async fn verify_against_dummy_blocking(password: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, dummy_password_hash()?))
        .await
        .map_err(|e| EventHubError::PasswordHash(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_with(settings: Settings) -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let db = DatabaseService::from_memory(store.clone());
        let capabilities = CapabilityResolver::new(db.roles.clone(), None, Duration::from_secs(60));
        let notifications = NotificationService::disabled(&settings.email);
        let service = AuthService::new(&db, capabilities, notifications, &settings).unwrap();
        (service, store)
    }

    fn service() -> (AuthService, Arc<MemoryStore>) {
        service_with(Settings::default())
    }

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "campus2024".to_string(),
            name: "Meera Iyer".to_string(),
            mobile: "9876543210".to_string(),
            year: "TE".to_string(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("campus2024").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("campus2024", &hash).unwrap());
        assert!(!verify_password("campus2025", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (auth, _) = service();
        let created = auth.sign_up(sign_up_request(" Meera@College.edu ")).await.unwrap();
        assert_eq!(created.session.email, "meera@college.edu");
        assert!(created.session.has(AppRole::Student));
        assert!(!created.session.is_admin());

        let signed_in = auth
            .sign_in(SignInRequest {
                email: "MEERA@college.edu".to_string(),
                password: "campus2024".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.session.user_id, created.session.user_id);

        let claims = auth.verify_token(&signed_in.token).unwrap();
        assert_eq!(claims.sub, created.session.user_id);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let (auth, _) = service();

        let mut request = sign_up_request("meera@college.edu");
        request.password = "short1".to_string();
        assert_matches!(auth.sign_up(request).await, Err(EventHubError::InvalidInput(_)));

        let mut request = sign_up_request("not-an-email");
        request.name = "Meera".to_string();
        assert_matches!(auth.sign_up(request).await, Err(EventHubError::InvalidInput(m)) if m.contains("email"));

        let mut request = sign_up_request("meera@college.edu");
        request.mobile = "12ab".to_string();
        assert_matches!(auth.sign_up(request).await, Err(EventHubError::InvalidInput(_)));

        auth.sign_up(sign_up_request("meera@college.edu")).await.unwrap();
        assert_matches!(
            auth.sign_up(sign_up_request("MEERA@college.edu")).await,
            Err(EventHubError::InvalidInput(m)) if m.contains("already exists")
        );
    }

    #[tokio::test]
    async fn test_sign_in_failures_look_alike() {
        let (auth, _) = service();
        auth.sign_up(sign_up_request("meera@college.edu")).await.unwrap();

        let wrong_password = auth
            .sign_in(SignInRequest {
                email: "meera@college.edu".to_string(),
                password: "campus2025".to_string(),
            })
            .await
            .unwrap_err();
        let unknown = auth
            .sign_in(SignInRequest {
                email: "nobody@college.edu".to_string(),
                password: "campus2024".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert_matches!(unknown, EventHubError::Authentication(_));
        // the unknown address went through argon2 too
        assert!(DUMMY_PASSWORD_HASH.get().is_some());
    }

    #[tokio::test]
    async fn test_passwordless_account_cannot_sign_in() {
        let (auth, store) = service();
        store
            .create_account(NewAccount {
                email: "oauth@college.edu".to_string(),
                password_hash: None,
                name: "OAuth User".to_string(),
                mobile: None,
                year: None,
            })
            .await
            .unwrap();

        assert_matches!(
            auth.sign_in(SignInRequest {
                email: "oauth@college.edu".to_string(),
                password: "campus2024".to_string(),
            })
            .await,
            Err(EventHubError::Authentication(m)) if m == "Invalid login credentials"
        );
    }

    #[test]
    fn test_dummy_hash_is_stable_and_unmatched() {
        let first = dummy_password_hash().unwrap();
        assert!(first.starts_with("$argon2"));
        assert_eq!(first, dummy_password_hash().unwrap());
        assert!(!verify_password("campus2024", first).unwrap());
    }

    #[tokio::test]
    async fn test_tampered_token_is_rejected() {
        let (auth, _) = service();
        let created = auth.sign_up(sign_up_request("meera@college.edu")).await.unwrap();

        let mut settings = Settings::default();
        settings.auth.jwt_secret = "a-completely-different-secret-value".to_string();
        let (other, _) = service_with(settings);
        assert_matches!(other.verify_token(&created.token), Err(EventHubError::Token(_)));
        assert_matches!(auth.verify_token("not.a.token"), Err(EventHubError::Token(_)));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (auth, store) = service();
        let created = auth.sign_up(sign_up_request("meera@college.edu")).await.unwrap();

        // unknown addresses succeed silently
        auth.request_password_reset(PasswordResetRequest {
            email: "ghost@college.edu".to_string(),
        })
        .await
        .unwrap();

        let account = store.find_by_email("meera@college.edu").await.unwrap().unwrap();
        let token = auth.issue_reset_token(&account).await.unwrap();

        auth.confirm_password_reset(PasswordResetConfirmation {
            token: token.clone(),
            password: "newpass99".to_string(),
        })
        .await
        .unwrap();

        let reused = auth
            .confirm_password_reset(PasswordResetConfirmation {
                token,
                password: "another99".to_string(),
            })
            .await;
        assert_matches!(reused, Err(EventHubError::InvalidInput(m)) if m == "Invalid or expired reset token");

        let signed_in = auth
            .sign_in(SignInRequest {
                email: "meera@college.edu".to_string(),
                password: "newpass99".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.session.user_id, created.session.user_id);
    }

    #[tokio::test]
    async fn test_oauth_round_trip() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "provider-token",
                "token_type": "bearer"
            })))
            .mount(&provider)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer provider-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "Arjun@College.edu",
                "name": "Arjun"
            })))
            .mount(&provider)
            .await;

        let mut settings = Settings::default();
        settings.features.oauth = true;
        settings.auth.oauth.insert(
            "campus".to_string(),
            OAuthProviderConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                authorize_url: format!("{}/authorize", provider.uri()),
                token_url: format!("{}/token", provider.uri()),
                userinfo_url: format!("{}/userinfo", provider.uri()),
                scopes: vec!["openid".to_string(), "email".to_string()],
                redirect_url: None,
            },
        );
        let (auth, _) = service_with(settings);

        let url = Url::parse(&auth.oauth_authorize_url("campus").await.unwrap()).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "scope" && v == "openid email"));

        assert_matches!(
            auth.complete_oauth("campus", "abc123", "forged-state").await,
            Err(EventHubError::Authentication(_))
        );

        let first = auth.complete_oauth("campus", "abc123", &state).await.unwrap();
        assert_eq!(first.session.email, "arjun@college.edu");

        // state is single-use
        assert_matches!(
            auth.complete_oauth("campus", "abc123", &state).await,
            Err(EventHubError::Authentication(_))
        );

        let url = Url::parse(&auth.oauth_authorize_url("campus").await.unwrap()).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let second = auth.complete_oauth("campus", "abc123", &state).await.unwrap();
        assert_eq!(second.session.user_id, first.session.user_id);
    }

    #[tokio::test]
    async fn test_oauth_disabled_or_unknown_provider() {
        let (auth, _) = service();
        assert_matches!(auth.oauth_authorize_url("campus").await, Err(EventHubError::InvalidInput(_)));
    }
}
