//! Profiles and user management

use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::*;
use crate::services::capabilities::{CapabilityResolver, Session};
use crate::services::realtime::{ChangeFeed, ChangeTable};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{is_valid_mobile, optional_text, require_text};
use crate::utils::logging::{log_admin_action, log_user_action};

#[derive(Clone)]
pub struct ProfileService {
    db: DatabaseService,
    capabilities: CapabilityResolver,
    feed: ChangeFeed,
}

impl ProfileService {
    pub fn new(db: DatabaseService, capabilities: CapabilityResolver, feed: ChangeFeed) -> Self {
        Self {
            db,
            capabilities,
            feed,
        }
    }

    /// Own profile, or any profile for an admin
    pub async fn get(&self, session: &Session, user_id: Uuid) -> Result<Profile> {
        if user_id != session.user_id {
            session.require_admin()?;
        }
        self.db
            .profiles
            .find_by_id(user_id)
            .await?
            .ok_or(EventHubError::ProfileNotFound { user_id })
    }

    pub async fn update_own(&self, session: &Session, request: UpdateProfileRequest) -> Result<Profile> {
        let request = validate_update(request)?;
        let profile = self
            .db
            .profiles
            .update(session.user_id, request)
            .await?
            .ok_or(EventHubError::ProfileNotFound { user_id: session.user_id })?;

        log_user_action(session.user_id, "update_profile", None);
        Ok(profile)
    }

    pub async fn completion(&self, session: &Session) -> Result<ProfileCompletion> {
        Ok(self.get(session, session.user_id).await?.completion())
    }

    pub async fn list_users(&self, session: &Session) -> Result<Vec<UserWithRoles>> {
        session.require_admin()?;
        self.db.profiles.list_with_roles().await
    }

    /// Grant the admin role. Granting twice is a no-op.
    pub async fn grant_admin(&self, session: &Session, user_id: Uuid) -> Result<bool> {
        session.require_admin()?;
        if self.db.profiles.find_by_id(user_id).await?.is_none() {
            return Err(EventHubError::ProfileNotFound { user_id });
        }

        let inserted = self.db.roles.grant(user_id, AppRole::Admin).await?;
        self.capabilities.invalidate(user_id).await;

        log_admin_action(
            session.user_id,
            "grant_admin",
            Some(&user_id.to_string()),
            Some(if inserted { "granted" } else { "already admin" }),
        );
        if inserted {
            self.feed.inserted(
                ChangeTable::UserRoles,
                user_id,
                &serde_json::json!({ "user_id": user_id, "role": AppRole::Admin }),
            );
        }
        Ok(inserted)
    }

    pub async fn analytics(&self, session: &Session) -> Result<AdminAnalytics> {
        session.require_admin()?;
        self.db.analytics().await
    }
}

/// Trims every field. A present but blank optional field becomes `Some(None)`,
/// which clears it.
fn validate_update(request: UpdateProfileRequest) -> Result<UpdateProfileRequest> {
    let patch = |value: Option<Option<String>>| value.map(|v| optional_text(v.as_deref()));

    let name = request.name.map(|n| require_text(&n, "Name")).transpose()?;
    let mobile = patch(request.mobile);
    if let Some(Some(mobile)) = &mobile {
        if !is_valid_mobile(mobile) {
            return Err(EventHubError::InvalidInput(
                "Please enter a valid mobile number".to_string(),
            ));
        }
    }

    Ok(UpdateProfileRequest {
        name,
        mobile,
        year: patch(request.year),
        semester: patch(request.semester),
        course: patch(request.course),
    })
}
