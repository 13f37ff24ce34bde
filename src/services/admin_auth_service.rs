use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AdminCredentials, MAX_SESSION_TTL_HOURS};
use crate::database::{admin_sessions_repo, admin_users_repo, format_timestamp};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("Stored admin password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Inserts the configured admin unless that username already exists.
/// Returns `true` when a row was created.
pub async fn seed_admin(pool: &SqlitePool, credentials: &AdminCredentials) -> Result<bool, AppError> {
    if admin_users_repo::load_admin_user(pool, &credentials.username)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let password_hash = hash_password(&credentials.password)?;
    let id = Uuid::new_v4().to_string();
    let created_at = format_timestamp(Utc::now());
    let inserted = admin_users_repo::insert_admin_user(
        pool,
        admin_users_repo::NewAdminUser {
            id: &id,
            username: &credentials.username,
            password_hash: &password_hash,
            created_at: &created_at,
        },
    )
    .await?;

    if inserted > 0 {
        info!(username = %credentials.username, "admin user seeded");
    }
    Ok(inserted > 0)
}

/// `Ok(None)` for unknown users and wrong passwords alike.
pub async fn login(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    ttl: TimeDelta,
) -> Result<Option<AdminSession>, AppError> {
    let username = username.trim();
    let Some(user) = admin_users_repo::load_admin_user(pool, username).await? else {
        warn!(username, "admin login rejected: unknown user");
        return Ok(None);
    };
    if !verify_password(password, &user.password_hash) {
        warn!(username, "admin login rejected: wrong password");
        return Ok(None);
    }

    let now = Utc::now().trunc_subsecs(6);
    let now_stamp = format_timestamp(now);
    let purged = admin_sessions_repo::delete_expired_sessions(pool, &now_stamp).await?;
    if purged > 0 {
        info!(purged, "expired admin sessions purged");
    }

    let token = new_session_token();
    let expires_at = now + ttl.min(TimeDelta::hours(MAX_SESSION_TTL_HOURS));
    admin_sessions_repo::insert_session(
        pool,
        admin_sessions_repo::NewAdminSession {
            token: &token,
            username: &user.username,
            created_at: &now_stamp,
            expires_at: &format_timestamp(expires_at),
        },
    )
    .await?;

    info!(username = %user.username, "admin logged in");
    Ok(Some(AdminSession {
        token,
        username: user.username,
        expires_at,
    }))
}

/// Username behind an unexpired session token.
pub async fn resolve_session(pool: &SqlitePool, token: &str) -> Result<Option<String>, AppError> {
    let now = format_timestamp(Utc::now());
    let session = admin_sessions_repo::load_active_session(pool, token, &now).await?;
    Ok(session.map(|s| s.username))
}

pub async fn logout(pool: &SqlitePool, token: &str) -> Result<bool, AppError> {
    let deleted = admin_sessions_repo::delete_session(pool, token).await?;
    if deleted > 0 {
        info!("admin logged out");
    }
    Ok(deleted > 0)
}

fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
