//! Role grant repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::RoleStore;
use crate::models::role::AppRole;
use crate::utils::errors::EventHubError;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<AppRole>, EventHubError> {
        let rows: Vec<(AppRole,)> = sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(role,)| role).collect())
    }

    async fn has_role(&self, user_id: Uuid, role: AppRole) -> Result<bool, EventHubError> {
        let granted: (bool,) = sqlx::query_as("SELECT has_role($1, $2)")
            .bind(user_id)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(granted.0)
    }

    async fn grant(&self, user_id: Uuid, role: AppRole) -> Result<bool, EventHubError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, role) DO NOTHING
            "#
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
