use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use regex::Regex;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RegistrationPolicy;
use crate::database::{format_timestamp, registrants_repo};
use crate::error::AppError;
use crate::models::{PaymentStatus, Registrant, RegistrationStats};
use crate::services::bib_allocator::{BibAllocator, BibLedger, BibSource, Commit};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 254;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Raw intake as submitted by the public form or the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRegistrantInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidIntake {
    pub name: String,
    pub email: Option<String>,
}

pub fn validate_intake(input: &NewRegistrantInput) -> Result<ValidIntake, AppError> {
    let name = input.name.trim();
    let name_len = name.chars().count();
    if name_len < NAME_MIN_CHARS {
        return Err(AppError::Validation {
            field: "name",
            message: "must be at least 2 characters",
        });
    }
    if name_len > NAME_MAX_CHARS {
        return Err(AppError::Validation {
            field: "name",
            message: "must be at most 100 characters",
        });
    }

    let email = input
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    if let Some(email) = email {
        if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(email) {
            return Err(AppError::Validation {
                field: "email",
                message: "must be a valid email address",
            });
        }
    }

    Ok(ValidIntake {
        name: name.to_string(),
        email: email.map(str::to_string),
    })
}

/// Commits one registrant row per attempt; the bib's UNIQUE constraint decides races
/// and the conditional insert enforces the participant cap.
struct RegistrantLedger<'a> {
    pool: &'a SqlitePool,
    id: &'a str,
    intake: &'a ValidIntake,
    max_participants: Option<u32>,
}

#[async_trait]
impl BibLedger for RegistrantLedger<'_> {
    type Committed = Registrant;

    async fn is_taken(&self, bib: i64) -> Result<bool, AppError> {
        Ok(registrants_repo::bib_in_use(self.pool, bib).await?)
    }

    async fn commit(&self, bib: i64) -> Result<Commit<Registrant>, AppError> {
        // Stored with microsecond precision; keep the returned value identical to a re-read.
        let created_at = Utc::now().trunc_subsecs(6);
        let stamp = format_timestamp(created_at);

        let insert = registrants_repo::insert_registrant(
            self.pool,
            registrants_repo::NewRegistrantRow {
                id: self.id,
                name: &self.intake.name,
                email: self.intake.email.as_deref(),
                bib,
                created_at: &stamp,
                payment_status: PaymentStatus::Pending,
            },
            self.max_participants,
        )
        .await;

        match insert {
            Ok(true) => Ok(Commit::Committed(Registrant {
                id: self.id.to_string(),
                name: self.intake.name.clone(),
                email: self.intake.email.clone(),
                bib,
                created_at,
                payment_status: PaymentStatus::Pending,
            })),
            Ok(false) => {
                let limit = self.max_participants.unwrap_or_default();
                warn!(limit, "registration rejected at commit: capacity reached");
                Err(AppError::CapacityReached { limit })
            }
            Err(e) if is_unique_violation(&e) => Ok(Commit::Conflict),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Validates, applies the capacity policy, then allocates a bib and persists the row.
/// The early count is a fast path; the insert itself re-checks the cap.
pub async fn register<S: BibSource>(
    pool: &SqlitePool,
    allocator: &BibAllocator<S>,
    policy: &RegistrationPolicy,
    input: &NewRegistrantInput,
) -> Result<Registrant, AppError> {
    let intake = validate_intake(input)?;

    if let Some(limit) = policy.max_participants {
        let count = registrants_repo::count_registrants(pool).await?;
        if count >= i64::from(limit) {
            warn!(count, limit, "registration rejected: capacity reached");
            return Err(AppError::CapacityReached { limit });
        }
    }

    let id = Uuid::new_v4().to_string();
    let ledger = RegistrantLedger {
        pool,
        id: &id,
        intake: &intake,
        max_participants: policy.max_participants,
    };
    let registrant = allocator.allocate(&ledger).await?;

    info!(
        id = %registrant.id,
        bib = registrant.bib,
        "registrant created"
    );
    Ok(registrant)
}

pub async fn list_registrants(pool: &SqlitePool) -> Result<Vec<Registrant>, AppError> {
    Ok(registrants_repo::list_registrants(pool).await?)
}

pub async fn find_registrant(pool: &SqlitePool, id: &str) -> Result<Option<Registrant>, AppError> {
    Ok(registrants_repo::find_registrant(pool, id).await?)
}

/// Case-insensitive name match or substring match on the bib digits.
/// A blank query returns the full list.
pub async fn search_registrants(
    pool: &SqlitePool,
    query: &str,
) -> Result<Vec<Registrant>, AppError> {
    let registrants = registrants_repo::list_registrants(pool).await?;
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(registrants);
    }

    Ok(registrants
        .into_iter()
        .filter(|r| matches_query(r, &needle))
        .collect())
}

fn matches_query(registrant: &Registrant, needle: &str) -> bool {
    registrant.name.to_lowercase().contains(needle) || registrant.bib.to_string().contains(needle)
}

/// `Ok(None)` means no registrant has this id.
pub async fn update_payment_status(
    pool: &SqlitePool,
    policy: &RegistrationPolicy,
    id: &str,
    target: PaymentStatus,
) -> Result<Option<Registrant>, AppError> {
    let Some(current) = registrants_repo::find_registrant(pool, id).await? else {
        return Ok(None);
    };

    if current.payment_status == target {
        return Ok(Some(current));
    }
    if current.payment_status == PaymentStatus::Confirmed
        && target == PaymentStatus::Pending
        && !policy.allow_payment_revert
    {
        return Err(AppError::InvalidTransition {
            from: current.payment_status,
            to: target,
        });
    }

    let updated = registrants_repo::update_payment_status(pool, id, target).await?;
    if updated == 0 {
        // Cleared between the read and the write.
        return Ok(None);
    }

    info!(id, bib = current.bib, from = %current.payment_status, to = %target, "payment status updated");
    Ok(Some(Registrant {
        payment_status: target,
        ..current
    }))
}

pub async fn clear_registrants(pool: &SqlitePool) -> Result<u64, AppError> {
    let deleted = registrants_repo::delete_all_registrants(pool).await?;
    info!(deleted, "all registrants cleared");
    Ok(deleted)
}

pub async fn load_stats(pool: &SqlitePool) -> Result<RegistrationStats, AppError> {
    Ok(registrants_repo::load_stats(pool).await?)
}
