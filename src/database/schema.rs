use sqlx::SqlitePool;

const SQL_CREATE_REGISTRANTS: &str = r#"
CREATE TABLE IF NOT EXISTS registrants (
  id TEXT PRIMARY KEY NOT NULL,
  name TEXT NOT NULL,
  email TEXT,
  bib INTEGER NOT NULL UNIQUE CHECK (bib BETWEEN 1 AND 999),
  created_at TEXT NOT NULL,
  payment_status TEXT NOT NULL DEFAULT 'pending'
    CHECK (payment_status IN ('pending', 'confirmed'))
)
"#;

const SQL_CREATE_REGISTRANTS_CREATED_AT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_registrants_created_at
ON registrants (created_at DESC)
"#;

const SQL_CREATE_ADMIN_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS admin_users (
  id TEXT PRIMARY KEY NOT NULL,
  username TEXT NOT NULL UNIQUE,
  password_hash TEXT NOT NULL,
  created_at TEXT NOT NULL
)
"#;

const SQL_CREATE_ADMIN_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS admin_sessions (
  token TEXT PRIMARY KEY NOT NULL,
  username TEXT NOT NULL,
  created_at TEXT NOT NULL,
  expires_at TEXT NOT NULL
)
"#;

const SCHEMA: &[&str] = &[
    SQL_CREATE_REGISTRANTS,
    SQL_CREATE_REGISTRANTS_CREATED_AT_INDEX,
    SQL_CREATE_ADMIN_USERS,
    SQL_CREATE_ADMIN_SESSIONS,
];

/// Idempotent; safe to run on every startup.
pub async fn apply(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
