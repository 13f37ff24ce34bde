use sqlx::SqlitePool;

use crate::models::AdminSessionRow;

const SQL_INSERT_SESSION: &str = r#"
INSERT INTO admin_sessions (
  token,
  username,
  created_at,
  expires_at
) VALUES (?1, ?2, ?3, ?4)
"#;

const SQL_LOAD_ACTIVE_SESSION: &str = r#"
SELECT token, username, created_at, expires_at
FROM admin_sessions
WHERE token = ?1
  AND expires_at > ?2
LIMIT 1
"#;

const SQL_DELETE_SESSION: &str = "DELETE FROM admin_sessions WHERE token = ?1";

const SQL_DELETE_EXPIRED_SESSIONS: &str = "DELETE FROM admin_sessions WHERE expires_at <= ?1";

pub struct NewAdminSession<'a> {
    pub token: &'a str,
    pub username: &'a str,
    pub created_at: &'a str,
    pub expires_at: &'a str,
}

pub async fn insert_session(pool: &SqlitePool, session: NewAdminSession<'_>) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_SESSION)
        .bind(session.token)
        .bind(session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// `now` must use the same text format as the stored timestamps.
pub async fn load_active_session(
    pool: &SqlitePool,
    token: &str,
    now: &str,
) -> sqlx::Result<Option<AdminSessionRow>> {
    sqlx::query_as::<_, AdminSessionRow>(SQL_LOAD_ACTIVE_SESSION)
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_SESSION)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_expired_sessions(pool: &SqlitePool, now: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_EXPIRED_SESSIONS)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
