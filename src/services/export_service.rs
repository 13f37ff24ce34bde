use std::borrow::Cow;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::database::registrants_repo;
use crate::error::AppError;
use crate::models::Registrant;

pub const CSV_HEADER: [&str; 4] = ["bib", "name", "created_at", "payment_status"];

/// RFC 4180 text: CRLF line endings, quotes only where needed.
pub fn registrants_to_csv(registrants: &[Registrant]) -> String {
    let mut out = String::with_capacity(64 * (registrants.len() + 1));
    push_record(&mut out, &CSV_HEADER);

    for r in registrants {
        let bib = r.bib.to_string();
        let created_at = r.created_at_label();
        push_record(
            &mut out,
            &[
                bib.as_str(),
                r.name.as_str(),
                created_at.as_str(),
                r.payment_status.as_str(),
            ],
        );
    }
    out
}

fn push_record(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("registrants-{}.csv", now.format("%Y%m%d"))
}

/// All registrants, newest first, as CSV.
pub async fn export_registrants_csv(pool: &SqlitePool) -> Result<String, AppError> {
    let registrants = registrants_repo::list_registrants(pool).await?;
    Ok(registrants_to_csv(&registrants))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::TimeZone;

    fn registrant(bib: i64, name: &str, status: PaymentStatus) -> Registrant {
        Registrant {
            id: format!("id-{}", bib),
            name: name.to_string(),
            email: Some("hidden@example.com".to_string()),
            bib,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap(),
            payment_status: status,
        }
    }

    #[test]
    fn header_only_for_empty_store() {
        assert_eq!(registrants_to_csv(&[]), "bib,name,created_at,payment_status\r\n");
    }

    #[test]
    fn rows_use_display_timestamp_and_skip_email() {
        let csv = registrants_to_csv(&[
            registrant(7, "Maria Silva", PaymentStatus::Confirmed),
            registrant(42, "João Pedro", PaymentStatus::Pending),
        ]);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[1], "7,Maria Silva,19/10/2026 08:30:05,confirmed");
        assert_eq!(lines[2], "42,João Pedro,19/10/2026 08:30:05,pending");
        assert!(!csv.contains("hidden@example.com"));
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let csv = registrants_to_csv(&[registrant(1, "Silva, \"Zé\"", PaymentStatus::Pending)]);
        assert!(csv.contains("1,\"Silva, \"\"Zé\"\"\",19/10/2026"));
    }

    #[test]
    fn file_name_carries_the_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 23, 0, 0).unwrap();
        assert_eq!(export_file_name(now), "registrants-20260102.csv");
    }
}
