use sqlx::SqlitePool;

use crate::models::AdminUserRow;

const SQL_LOAD_ADMIN_USER: &str = r#"
SELECT id, username, password_hash, created_at
FROM admin_users
WHERE username = ?1
LIMIT 1
"#;

const SQL_INSERT_ADMIN_USER: &str = r#"
INSERT INTO admin_users (
  id,
  username,
  password_hash,
  created_at
) VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (username) DO NOTHING
"#;

pub struct NewAdminUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub created_at: &'a str,
}

pub async fn load_admin_user(
    pool: &SqlitePool,
    username: &str,
) -> sqlx::Result<Option<AdminUserRow>> {
    sqlx::query_as::<_, AdminUserRow>(SQL_LOAD_ADMIN_USER)
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Returns 0 when the username already exists.
pub async fn insert_admin_user(pool: &SqlitePool, user: NewAdminUser<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_ADMIN_USER)
        .bind(user.id)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.created_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
