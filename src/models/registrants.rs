use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display format used on the dashboard and in the CSV export.
pub const CREATED_AT_DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            other => Err(format!("unknown payment status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Registrant {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub bib: i64,
    pub created_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
}

impl Registrant {
    pub fn created_at_label(&self) -> String {
        self.created_at.format(CREATED_AT_DISPLAY_FORMAT).to_string()
    }

    pub fn is_confirmed(&self) -> bool {
        self.payment_status == PaymentStatus::Confirmed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct RegistrationStats {
    pub total: i64,
    pub confirmed: i64,
    pub pending: i64,
}
