use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::AssetRef;

const COLUMNS: &str = "id, full_name, email, phone, about_me, password_hash, portfolio_url, \
     github_url, instagram_url, facebook_url, linkedin_url, twitter_url, \
     avatar_id, avatar_url, resume_id, resume_url, \
     reset_token_hash, reset_token_expires_at, created_at";

/// Credential and profile record. Never serialized directly; API responses
/// go through `dto::UserBody`, which carries no password or reset fields.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    pub password_hash: String,
    pub portfolio_url: String,
    pub github_url: Option<String>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub avatar_id: String,
    pub avatar_url: String,
    pub resume_id: String,
    pub resume_url: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub about_me: &'a str,
    pub password_hash: &'a str,
    pub portfolio_url: &'a str,
    pub github_url: Option<&'a str>,
    pub instagram_url: Option<&'a str>,
    pub facebook_url: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub twitter_url: Option<&'a str>,
    pub avatar: &'a AssetRef,
    pub resume: &'a AssetRef,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Default)]
pub struct ProfileChanges<'a> {
    pub full_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub about_me: Option<&'a str>,
    pub portfolio_url: Option<&'a str>,
    pub github_url: Option<&'a str>,
    pub instagram_url: Option<&'a str>,
    pub facebook_url: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub twitter_url: Option<&'a str>,
    pub avatar: Option<&'a AssetRef>,
    pub resume: Option<&'a AssetRef>,
}

impl User {
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> sqlx::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (
                full_name, email, phone, about_me, password_hash, portfolio_url,
                github_url, instagram_url, facebook_url, linkedin_url, twitter_url,
                avatar_id, avatar_url, resume_id, resume_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.full_name)
            .bind(new.email)
            .bind(new.phone)
            .bind(new.about_me)
            .bind(new.password_hash)
            .bind(new.portfolio_url)
            .bind(new.github_url)
            .bind(new.instagram_url)
            .bind(new.facebook_url)
            .bind(new.linkedin_url)
            .bind(new.twitter_url)
            .bind(&new.avatar.id)
            .bind(&new.avatar.url)
            .bind(&new.resume.id)
            .bind(&new.resume.url)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<User> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql).bind(id).fetch_one(db).await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges<'_>,
    ) -> sqlx::Result<User> {
        let sql = format!(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                about_me = COALESCE($5, about_me),
                portfolio_url = COALESCE($6, portfolio_url),
                github_url = CASE WHEN $7 IS NULL THEN github_url ELSE NULLIF($7, '') END,
                instagram_url = CASE WHEN $8 IS NULL THEN instagram_url ELSE NULLIF($8, '') END,
                facebook_url = CASE WHEN $9 IS NULL THEN facebook_url ELSE NULLIF($9, '') END,
                linkedin_url = CASE WHEN $10 IS NULL THEN linkedin_url ELSE NULLIF($10, '') END,
                twitter_url = CASE WHEN $11 IS NULL THEN twitter_url ELSE NULLIF($11, '') END,
                avatar_id = COALESCE($12, avatar_id),
                avatar_url = COALESCE($13, avatar_url),
                resume_id = COALESCE($14, resume_id),
                resume_url = COALESCE($15, resume_url)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.full_name)
            .bind(changes.email)
            .bind(changes.phone)
            .bind(changes.about_me)
            .bind(changes.portfolio_url)
            .bind(changes.github_url)
            .bind(changes.instagram_url)
            .bind(changes.facebook_url)
            .bind(changes.linkedin_url)
            .bind(changes.twitter_url)
            .bind(changes.avatar.map(|a| a.id.as_str()))
            .bind(changes.avatar.map(|a| a.url.as_str()))
            .bind(changes.resume.map(|r| r.id.as_str()))
            .bind(changes.resume.map(|r| r.url.as_str()))
            .fetch_one(db)
            .await
    }

    /// The only write paths touching the hash are `set_password` and
    /// `reset_password`; profile updates cannot re-hash a stored digest.
    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = NULL, reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Matches only a live token: stored hash equal and expiry in the future.
    pub async fn find_by_reset_token(db: &PgPool, token_hash: &str) -> sqlx::Result<Option<User>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE reset_token_hash = $1 AND reset_token_expires_at > now()"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .fetch_optional(db)
            .await
    }

    /// Consumes the reset token in the same statement that sets the new
    /// hash, so a secret can never be replayed after a successful reset.
    pub async fn reset_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, \
             reset_token_hash = NULL, reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}
