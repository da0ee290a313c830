//! Account and password reset token repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::AccountStore;
use crate::models::account::{Account, NewAccount, PasswordResetToken};
use crate::models::role::AppRole;
use crate::utils::errors::EventHubError;

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create_account(&self, account: NewAccount) -> Result<Account, EventHubError> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, created_at
            "#
        )
        .bind(id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EventHubError::InvalidInput("An account with this email already exists".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, name, email, mobile, year, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#
        )
        .bind(id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.mobile)
        .bind(&account.year)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_roles (id, user_id, role, created_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(AppRole::Student)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, EventHubError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE LOWER(email) = LOWER($1)"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, EventHubError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), EventHubError> {
        sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, EventHubError> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (id, account_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, token_hash, expires_at, used_at, created_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    async fn consume_reset_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>, EventHubError> {
        let account: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE password_reset_tokens
            SET used_at = $2
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
            RETURNING account_id
            "#
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account.map(|(id,)| id))
    }
}
