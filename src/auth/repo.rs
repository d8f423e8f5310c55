use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user already exists")]
    AlreadyExists,
    #[error("user not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for user records. Emails passed in are already normalized.
///
/// The OTP mutations keep `reset_otp` and `otp_expires` in lockstep: both are
/// written by `store_otp` and both are cleared by `mark_otp_verified`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    /// Sets code and expiry, and drops any earlier verification.
    async fn store_otp(&self, id: Uuid, otp: &str, expires: OffsetDateTime) -> StoreResult<()>;
    async fn mark_otp_verified(&self, id: Uuid) -> StoreResult<()>;
    /// Replaces the hash and consumes the verification.
    async fn reset_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    async fn update_contact(&self, id: Uuid, mobile: &str, role: &str) -> StoreResult<User>;
}

const USER_COLUMNS: &str = "id, full_name, email, mobile, role, password_hash, reset_otp, \
                            otp_expires, is_otp_verified, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn affected(rows: u64) -> StoreResult<()> {
    if rows == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (full_name, email, mobile, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.role)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn store_otp(&self, id: Uuid, otp: &str, expires: OffsetDateTime) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_otp = $2, otp_expires = $3, is_otp_verified = FALSE, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires)
        .execute(&self.db)
        .await?;
        affected(res.rows_affected())
    }

    async fn mark_otp_verified(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_otp = NULL, otp_expires = NULL, is_otp_verified = TRUE, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        affected(res.rows_affected())
    }

    async fn reset_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, is_otp_verified = FALSE, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        affected(res.rows_affected())
    }

    async fn update_contact(&self, id: Uuid, mobile: &str, role: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET mobile = $2, role = $3, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(mobile)
        .bind(role)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}
