use sqlx::SqlitePool;

use crate::models::{PaymentStatus, Registrant, RegistrationStats};

const SQL_LIST_REGISTRANTS: &str = r#"
SELECT id, name, email, bib, created_at, payment_status
FROM registrants
ORDER BY created_at DESC, rowid DESC
"#;

const SQL_LIST_REGISTRANTS_IN_ORDER_OF_ARRIVAL: &str = r#"
SELECT id, name, email, bib, created_at, payment_status
FROM registrants
ORDER BY created_at ASC, rowid ASC
"#;

const SQL_FIND_REGISTRANT: &str = r#"
SELECT id, name, email, bib, created_at, payment_status
FROM registrants
WHERE id = ?1
LIMIT 1
"#;

const SQL_BIB_IN_USE: &str = r#"
SELECT EXISTS (SELECT 1 FROM registrants WHERE bib = ?1)
"#;

// Single statement: SQLite takes the write lock before the count is read,
// so concurrent inserts cannot all see the same headroom.
const SQL_INSERT_REGISTRANT: &str = r#"
INSERT INTO registrants (
  id,
  name,
  email,
  bib,
  created_at,
  payment_status
)
SELECT ?1, ?2, ?3, ?4, ?5, ?6
WHERE ?7 IS NULL OR (SELECT COUNT(*) FROM registrants) < ?7
"#;

const SQL_UPDATE_PAYMENT_STATUS: &str = r#"
UPDATE registrants
SET payment_status = ?2
WHERE id = ?1
"#;

const SQL_DELETE_ALL_REGISTRANTS: &str = "DELETE FROM registrants";

const SQL_COUNT_REGISTRANTS: &str = "SELECT COUNT(*) FROM registrants";

const SQL_LOAD_STATS: &str = r#"
SELECT
  COUNT(*) AS total,
  COALESCE(SUM(CASE WHEN payment_status = 'confirmed' THEN 1 ELSE 0 END), 0) AS confirmed,
  COALESCE(SUM(CASE WHEN payment_status = 'pending' THEN 1 ELSE 0 END), 0) AS pending
FROM registrants
"#;

pub struct NewRegistrantRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub bib: i64,
    pub created_at: &'a str,
    pub payment_status: PaymentStatus,
}

/// Newest first.
pub async fn list_registrants(pool: &SqlitePool) -> sqlx::Result<Vec<Registrant>> {
    sqlx::query_as::<_, Registrant>(SQL_LIST_REGISTRANTS)
        .fetch_all(pool)
        .await
}

/// Oldest first, as used by the ranking board.
pub async fn list_registrants_in_order_of_arrival(
    pool: &SqlitePool,
) -> sqlx::Result<Vec<Registrant>> {
    sqlx::query_as::<_, Registrant>(SQL_LIST_REGISTRANTS_IN_ORDER_OF_ARRIVAL)
        .fetch_all(pool)
        .await
}

pub async fn find_registrant(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Registrant>> {
    sqlx::query_as::<_, Registrant>(SQL_FIND_REGISTRANT)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn bib_in_use(pool: &SqlitePool, bib: i64) -> sqlx::Result<bool> {
    let exists: i64 = sqlx::query_scalar(SQL_BIB_IN_USE)
        .bind(bib)
        .fetch_one(pool)
        .await?;
    Ok(exists != 0)
}

/// Inserts only while the table holds fewer than `max_rows` registrants
/// (`None` means no cap). Returns `false` when the cap blocked the insert.
/// Fails with a unique violation when the bib is already taken.
pub async fn insert_registrant(
    pool: &SqlitePool,
    row: NewRegistrantRow<'_>,
    max_rows: Option<u32>,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_INSERT_REGISTRANT)
        .bind(row.id)
        .bind(row.name)
        .bind(row.email)
        .bind(row.bib)
        .bind(row.created_at)
        .bind(row.payment_status.as_str())
        .bind(max_rows.map(i64::from))
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn update_payment_status(
    pool: &SqlitePool,
    id: &str,
    status: PaymentStatus,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_PAYMENT_STATUS)
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_all_registrants(pool: &SqlitePool) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_ALL_REGISTRANTS).execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn count_registrants(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar(SQL_COUNT_REGISTRANTS)
        .fetch_one(pool)
        .await
}

pub async fn load_stats(pool: &SqlitePool) -> sqlx::Result<RegistrationStats> {
    sqlx::query_as::<_, RegistrationStats>(SQL_LOAD_STATS)
        .fetch_one(pool)
        .await
}
