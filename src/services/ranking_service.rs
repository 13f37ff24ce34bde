use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::RegistrationPolicy;
use crate::database::registrants_repo;
use crate::error::AppError;
use crate::models::{PaymentStatus, Registrant};

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub position: usize,
    pub bib: i64,
    pub name: String,
    pub payment_status: PaymentStatus,
}

/// Public board shown on `/ranking`. Never carries emails.
#[derive(Debug, Clone, Serialize)]
pub struct RankingBoard {
    pub total: usize,
    pub capacity: Option<u32>,
    pub remaining: Option<u32>,
    pub entries: Vec<RankingEntry>,
}

pub async fn load_ranking(
    pool: &SqlitePool,
    policy: &RegistrationPolicy,
) -> Result<RankingBoard, AppError> {
    let registrants = registrants_repo::list_registrants_in_order_of_arrival(pool).await?;
    Ok(build_ranking(registrants, policy.max_participants))
}

pub fn build_ranking(registrants: Vec<Registrant>, capacity: Option<u32>) -> RankingBoard {
    let total = registrants.len();
    let remaining = capacity.map(|limit| {
        let used = u32::try_from(total).unwrap_or(u32::MAX);
        limit.saturating_sub(used)
    });

    let entries = registrants
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankingEntry {
            position: i + 1,
            bib: r.bib,
            name: r.name,
            payment_status: r.payment_status,
        })
        .collect();

    RankingBoard {
        total,
        capacity,
        remaining,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::services::bib_allocator::BibAllocator;
    use crate::services::registration_service::{self, NewRegistrantInput};

    #[tokio::test]
    async fn ranking_lists_in_arrival_order_with_positions() {
        let pool = database::open_in_memory().await.unwrap();
        let policy = RegistrationPolicy {
            max_participants: Some(10),
            allow_payment_revert: false,
        };
        let allocator = BibAllocator::default();

        for name in ["Ana", "Bruno", "Clara"] {
            registration_service::register(
                &pool,
                &allocator,
                &policy,
                &NewRegistrantInput {
                    name: name.to_string(),
                    email: Some(format!("{}@example.com", name.to_lowercase())),
                },
            )
            .await
            .unwrap();
        }

        let board = load_ranking(&pool, &policy).await.unwrap();
        assert_eq!(board.total, 3);
        assert_eq!(board.remaining, Some(7));
        let names: Vec<&str> = board.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bruno", "Clara"]);
        let positions: Vec<usize> = board.entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let json = serde_json::to_string(&board).unwrap();
        assert!(!json.contains("@example.com"));
    }

    #[test]
    fn uncapped_board_has_no_remaining_count() {
        let board = build_ranking(vec![], None);
        assert_eq!(board.total, 0);
        assert_eq!(board.capacity, None);
        assert_eq!(board.remaining, None);
    }
}
