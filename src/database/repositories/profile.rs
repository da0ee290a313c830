//! Profile repository implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::ProfileStore;
use crate::models::profile::{Profile, UpdateProfileRequest, UserWithRoles};
use crate::models::role::AppRole;
use crate::utils::errors::EventHubError;

const PROFILE_COLUMNS: &str = "id, name, email, mobile, year, semester, course, created_at, updated_at";

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, EventHubError> {
        let profile = sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Each optional field binds a "set" flag and a value, so a field can be
    /// cleared to NULL as well as left alone.
    async fn update(&self, id: Uuid, request: UpdateProfileRequest) -> Result<Option<Profile>, EventHubError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET name = COALESCE($2, name),
                mobile = CASE WHEN $3 THEN $4 ELSE mobile END,
                year = CASE WHEN $5 THEN $6 ELSE year END,
                semester = CASE WHEN $7 THEN $8 ELSE semester END,
                course = CASE WHEN $9 THEN $10 ELSE course END,
                updated_at = $11
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name)
        .bind(request.mobile.is_some())
        .bind(request.mobile.flatten())
        .bind(request.year.is_some())
        .bind(request.year.flatten())
        .bind(request.semester.is_some())
        .bind(request.semester.flatten())
        .bind(request.course.is_some())
        .bind(request.course.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// All profiles, newest first, each with its granted roles
    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>, EventHubError> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let grants: Vec<(Uuid, AppRole)> = sqlx::query_as("SELECT user_id, role FROM user_roles")
            .fetch_all(&self.pool)
            .await?;

        let mut roles: HashMap<Uuid, Vec<AppRole>> = HashMap::new();
        for (user_id, role) in grants {
            roles.entry(user_id).or_default().push(role);
        }

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let mut user_roles = roles.remove(&profile.id).unwrap_or_default();
                user_roles.sort();
                UserWithRoles { profile, roles: user_roles }
            })
            .collect())
    }

    async fn count(&self) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
