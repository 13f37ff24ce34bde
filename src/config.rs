use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://race.db";
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// One year. Keeps `now + ttl` well inside the representable date range.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

/// Intake and payment rules enforced by the registration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// `None` disables the cap.
    pub max_participants: Option<u32>,
    pub allow_payment_revert: bool,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            max_participants: Some(100),
            allow_payment_revert: false,
        }
    }
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_attempts: u32,
    pub host: String,
    pub port: u16,
    pub admin: AdminCredentials,
    pub registration: RegistrationPolicy,
    pub bib_max_attempts: u32,
    pub session_ttl: TimeDelta,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or("PORT", get("PORT"), 3000u16)?;

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5u32)?;
        if db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }
        let db_connect_attempts =
            parse_or("DB_CONNECT_ATTEMPTS", get("DB_CONNECT_ATTEMPTS"), 5u32)?.max(1);

        let username = get("ADMIN_USERNAME").unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());
        let password = lookup("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
        if password.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "ADMIN_PASSWORD",
            });
        }

        let max_participants = match parse_or("MAX_PARTICIPANTS", get("MAX_PARTICIPANTS"), 100u32)? {
            0 => None,
            n => Some(n),
        };
        let allow_payment_revert =
            parse_bool("ALLOW_PAYMENT_REVERT", get("ALLOW_PAYMENT_REVERT"), false)?;

        let bib_max_attempts = parse_or("BIB_MAX_ATTEMPTS", get("BIB_MAX_ATTEMPTS"), 50u32)?;
        if !(1..=1000).contains(&bib_max_attempts) {
            return Err(invalid(
                "BIB_MAX_ATTEMPTS",
                &bib_max_attempts.to_string(),
                "expected 1..=1000",
            ));
        }

        let ttl_hours = parse_or("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), 12i64)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl_hours) {
            return Err(invalid(
                "SESSION_TTL_HOURS",
                &ttl_hours.to_string(),
                "expected 1..=8760",
            ));
        }
        let session_ttl = TimeDelta::try_hours(ttl_hours).ok_or_else(|| {
            invalid("SESSION_TTL_HOURS", &ttl_hours.to_string(), "out of range")
        })?;

        let cookie_secure = parse_bool("COOKIE_SECURE", get("COOKIE_SECURE"), false)?;

        Ok(Self {
            database_url,
            db_max_connections,
            db_connect_attempts,
            host,
            port,
            admin: AdminCredentials { username, password },
            registration: RegistrationPolicy {
                max_participants,
                allow_payment_revert,
            },
            bib_max_attempts,
            session_ttl,
            cookie_secure,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(key, &v, &e.to_string())),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(v) = raw else {
        return Ok(default);
    };
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &v, "expected true/false")),
    }
}
