//! Random, non-sequential bib numbers.
//!
//! A bib is drawn uniformly from [`BIB_MIN`]..=[`BIB_MAX`], checked against the
//! ledger and then committed. The storage-level uniqueness constraint is the
//! final arbiter: a commit that loses a race to a concurrent registration is
//! reported as [`Commit::Conflict`] and the allocator simply draws again, up to
//! a fixed number of attempts.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::AppError;

pub const BIB_MIN: i64 = 1;
pub const BIB_MAX: i64 = 999;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Source of candidate bib numbers.
pub trait BibSource: Send + Sync {
    fn draw(&self, range: RangeInclusive<i64>) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngBibSource;

impl BibSource for ThreadRngBibSource {
    fn draw(&self, range: RangeInclusive<i64>) -> i64 {
        rand::thread_rng().gen_range(range)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Commit<T> {
    Committed(T),
    /// Another writer holds this bib.
    Conflict,
}

/// Existence check plus commit primitive the allocator runs against.
#[async_trait]
pub trait BibLedger: Sync {
    type Committed: Send;

    async fn is_taken(&self, bib: i64) -> Result<bool, AppError>;

    async fn commit(&self, bib: i64) -> Result<Commit<Self::Committed>, AppError>;
}

#[derive(Debug, Clone)]
pub struct BibAllocator<S = ThreadRngBibSource> {
    source: S,
    max_attempts: u32,
}

impl BibAllocator<ThreadRngBibSource> {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(ThreadRngBibSource, max_attempts)
    }
}

impl Default for BibAllocator<ThreadRngBibSource> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl<S: BibSource> BibAllocator<S> {
    pub fn with_source(source: S, max_attempts: u32) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws until a bib commits or the attempt budget runs out.
    ///
    /// A draw found taken and a commit that hits a conflict each cost one
    /// attempt. Ledger errors are returned immediately without retrying.
    pub async fn allocate<L: BibLedger>(&self, ledger: &L) -> Result<L::Committed, AppError> {
        for attempt in 1..=self.max_attempts {
            let bib = self.source.draw(BIB_MIN..=BIB_MAX);

            if ledger.is_taken(bib).await? {
                debug!(bib, attempt, "bib already taken, redrawing");
                continue;
            }

            match ledger.commit(bib).await? {
                Commit::Committed(value) => return Ok(value),
                Commit::Conflict => {
                    debug!(bib, attempt, "lost bib to a concurrent registration, redrawing");
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            "bib allocation exhausted its attempt budget"
        );
        Err(AppError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedSource {
        draws: Mutex<VecDeque<i64>>,
    }

    impl ScriptedSource {
        fn new(draws: &[i64]) -> Self {
            Self {
                draws: Mutex::new(draws.iter().copied().collect()),
            }
        }
    }

    impl BibSource for ScriptedSource {
        fn draw(&self, range: RangeInclusive<i64>) -> i64 {
            let bib = self
                .draws
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted draws exhausted");
            assert!(range.contains(&bib));
            bib
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        taken: Mutex<HashSet<i64>>,
        /// Pretend the existence check read a stale snapshot.
        stale_reads: bool,
        commits: AtomicU32,
    }

    impl MemoryLedger {
        fn with_taken(bibs: impl IntoIterator<Item = i64>, stale_reads: bool) -> Self {
            Self {
                taken: Mutex::new(bibs.into_iter().collect()),
                stale_reads,
                commits: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl BibLedger for MemoryLedger {
        type Committed = i64;

        async fn is_taken(&self, bib: i64) -> Result<bool, AppError> {
            if self.stale_reads {
                return Ok(false);
            }
            Ok(self.taken.lock().unwrap().contains(&bib))
        }

        async fn commit(&self, bib: i64) -> Result<Commit<i64>, AppError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.taken.lock().unwrap().insert(bib) {
                Ok(Commit::Committed(bib))
            } else {
                Ok(Commit::Conflict)
            }
        }
    }

    struct BrokenLedger;

    #[async_trait]
    impl BibLedger for BrokenLedger {
        type Committed = i64;

        async fn is_taken(&self, _bib: i64) -> Result<bool, AppError> {
            Err(AppError::Storage(sqlx::Error::PoolTimedOut))
        }

        async fn commit(&self, _bib: i64) -> Result<Commit<i64>, AppError> {
            unreachable!("commit must not run after a failed check")
        }
    }

    #[tokio::test]
    async fn first_free_draw_wins() {
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[42]), 5);
        let ledger = MemoryLedger::default();
        assert_eq!(allocator.allocate(&ledger).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn taken_draw_is_redrawn_without_committing() {
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[7, 7, 8]), 5);
        let ledger = MemoryLedger::with_taken([7], false);

        assert_eq!(allocator.allocate(&ledger).await.unwrap(), 8);
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lost_commit_race_is_retried() {
        // The check says 13 is free, but a concurrent writer already holds it.
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[13, 14]), 5);
        let ledger = MemoryLedger::with_taken([13], true);

        assert_eq!(allocator.allocate(&ledger).await.unwrap(), 14);
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_budget() {
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[1, 2, 3, 4]), 3);
        let ledger = MemoryLedger::with_taken([1, 2, 3, 4], false);

        let err = allocator.allocate(&ledger).await.unwrap_err();
        assert!(matches!(err, AppError::AllocationExhausted { attempts: 3 }));
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_bib_space_fails_instead_of_looping() {
        let allocator = BibAllocator::new(25);
        let ledger = MemoryLedger::with_taken(BIB_MIN..=BIB_MAX, false);

        let err = allocator.allocate(&ledger).await.unwrap_err();
        assert!(matches!(err, AppError::AllocationExhausted { attempts: 25 }));
    }

    #[tokio::test]
    async fn ledger_errors_are_not_retried() {
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[5]), 10);
        let err = allocator.allocate(&BrokenLedger).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn zero_attempts_is_clamped_to_one() {
        let allocator = BibAllocator::with_source(ScriptedSource::new(&[9]), 0);
        assert_eq!(allocator.max_attempts(), 1);
        assert_eq!(allocator.allocate(&MemoryLedger::default()).await.unwrap(), 9);
    }

    #[test]
    fn thread_rng_source_stays_in_range() {
        let source = ThreadRngBibSource;
        for _ in 0..10_000 {
            let bib = source.draw(BIB_MIN..=BIB_MAX);
            assert!((BIB_MIN..=BIB_MAX).contains(&bib));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_never_share_a_bib() {
        let allocator = Arc::new(BibAllocator::new(200));
        let ledger = Arc::new(MemoryLedger::default());

        let mut handles = Vec::new();
        for _ in 0..300 {
            let allocator = Arc::clone(&allocator);
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                allocator.allocate(ledger.as_ref()).await
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let bib = handle.await.unwrap().unwrap();
            assert!(seen.insert(bib), "bib {} handed out twice", bib);
        }
        assert_eq!(seen.len(), 300);
    }
}
