pub mod admin_sessions_repo;
pub mod admin_users_repo;
pub mod registrants_repo;
pub mod schema;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

/// Delay before the second startup attempt; doubles on every further retry.
pub const STARTUP_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

pub async fn open_pool(database_url: &str, max_connections: u32) -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Single-connection in-memory database with the schema applied.
///
/// The connection never idles out, otherwise the database would vanish with it.
pub async fn open_in_memory() -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    schema::apply(&pool).await?;
    Ok(pool)
}

/// Runs `op` until it succeeds or `attempts` is used up, sleeping with
/// exponential backoff in between. Only meant for startup work.
pub async fn with_backoff<T, E, F, Fut>(
    what: &str,
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what, attempt, attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`) so that text order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;

    #[test]
    fn timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        let b = a + chrono::TimeDelta::microseconds(1);
        let c = a + chrono::TimeDelta::seconds(10);
        let (fa, fb, fc) = (format_timestamp(a), format_timestamp(b), format_timestamp(c));
        assert_eq!(fa, "2026-03-01T09:05:00.000000Z");
        assert!(fa < fb && fb < fc);
    }

    #[tokio::test]
    async fn backoff_retries_until_success() {
        let calls = Cell::new(0);
        let result: Result<u32, String> =
            with_backoff("flaky op", 5, Duration::from_millis(1), || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(format!("boom {}", n))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn backoff_gives_up_after_the_last_attempt() {
        let calls = Cell::new(0);
        let result: Result<(), String> =
            with_backoff("always failing", 3, Duration::from_millis(1), || {
                calls.set(calls.get() + 1);
                async { Err("down".to_string()) }
            })
            .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn in_memory_pool_has_schema() {
        let pool = open_in_memory().await.unwrap();
        let count = registrants_repo::count_registrants(&pool).await.unwrap();
        assert_eq!(count, 0);
    }
}
