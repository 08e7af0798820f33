//! # In-Memory Backend
//!
//! In-process tables implementing the same transactional contract as the
//! PostgreSQL backend. Used by tests and single-process development runs;
//! counters here do not survive a restart, so production deployments use
//! [`PgStore`](crate::postgres::PgStore).
//!
//! ## How the locking protocol maps
//!
//! Each counter key owns a `tokio::sync::Mutex` that plays the role of the
//! row lock: a reservation holds the owned guard until the transaction
//! commits or rolls back, and contending reservations suspend on the mutex
//! with no polling. The committed counter value lives in an atomic next to
//! the lock so that `last_number` reads never block behind an open
//! reservation — exactly the read-committed view the preview relies on.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use docnum_core::{
    BatchId, Classification, ClassificationId, CounterKey, IssuedNumber, OrgUnit, RequestId,
    ReservedRange, StoreError, UnitId, VerificationToken,
};

use crate::{IssuanceStore, IssuanceTx};

// ─── Tables ──────────────────────────────────────────────────────────

/// One counter row: the committed value plus its exclusive lock.
struct CounterCell {
    /// Last committed sequence value. Only written while holding `lock`.
    committed: AtomicI64,
    /// The per-key exclusive lock a reservation holds until commit/rollback.
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl CounterCell {
    fn new() -> Self {
        Self {
            committed: AtomicI64::new(0),
            lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Append-only issued-number table with its uniqueness indexes.
#[derive(Default)]
struct RecordTable {
    rows: Vec<IssuedNumber>,
    codes: HashSet<String>,
    tokens: HashMap<Uuid, usize>,
}

#[derive(Default)]
struct MemoryInner {
    counters: Mutex<HashMap<CounterKey, Arc<CounterCell>>>,
    records: Mutex<RecordTable>,
    classifications: Mutex<HashMap<ClassificationId, Classification>>,
    units: Mutex<HashMap<UnitId, OrgUnit>>,
}

/// Lock a std mutex, surfacing poisoning as a store failure instead of
/// panicking (the no-panic crate policy applies here too).
fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    m.lock()
        .map_err(|_| StoreError::Backend("in-memory table lock poisoned".to_string()))
}

// ─── Store ───────────────────────────────────────────────────────────

/// In-memory [`IssuanceStore`] backend.
///
/// Cloning is cheap and shares the underlying tables, mirroring how a
/// connection-pool handle clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a classification in the directory.
    ///
    /// Directory maintenance sits outside the issuance transaction
    /// protocol, matching how the directory is seeded in deployments.
    pub fn put_classification(&self, classification: Classification) -> Result<(), StoreError> {
        lock(&self.inner.classifications)?.insert(classification.id, classification);
        Ok(())
    }

    /// Insert or replace a unit in the directory.
    pub fn put_unit(&self, unit: OrgUnit) -> Result<(), StoreError> {
        lock(&self.inner.units)?.insert(unit.id, unit);
        Ok(())
    }

    /// Total number of issued records (test observability).
    pub fn record_count(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.inner.records)?.rows.len())
    }
}

impl IssuanceStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            inner: Arc::clone(&self.inner),
            reservation: None,
            staged: Vec::new(),
        })
    }

    async fn last_number(&self, key: &CounterKey) -> Result<Option<i64>, StoreError> {
        let counters = lock(&self.inner.counters)?;
        Ok(counters
            .get(key)
            .map(|cell| cell.committed.load(Ordering::Acquire)))
    }

    async fn classification(
        &self,
        id: ClassificationId,
    ) -> Result<Option<Classification>, StoreError> {
        Ok(lock(&self.inner.classifications)?.get(&id).cloned())
    }

    async fn unit(&self, id: UnitId) -> Result<Option<OrgUnit>, StoreError> {
        Ok(lock(&self.inner.units)?.get(&id).cloned())
    }

    async fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<IssuedNumber>, StoreError> {
        let records = lock(&self.inner.records)?;
        Ok(records
            .tokens
            .get(token.as_uuid())
            .map(|&idx| records.rows[idx].clone()))
    }

    async fn batch(&self, id: BatchId) -> Result<Vec<IssuedNumber>, StoreError> {
        let records = lock(&self.inner.records)?;
        let mut rows: Vec<IssuedNumber> = records
            .rows
            .iter()
            .filter(|r| r.batch_id == Some(id))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.batch_index);
        Ok(rows)
    }

    async fn for_request(&self, id: RequestId) -> Result<Vec<IssuedNumber>, StoreError> {
        let records = lock(&self.inner.records)?;
        Ok(records
            .rows
            .iter()
            .filter(|r| r.request_id == Some(id))
            .cloned()
            .collect())
    }
}

// ─── Transaction ─────────────────────────────────────────────────────

/// A held reservation: the guard keeps contenders suspended, `end` is the
/// staged counter value written back on commit.
struct Reservation {
    cell: Arc<CounterCell>,
    _guard: OwnedMutexGuard<()>,
    end: i64,
}

/// In-memory transaction. Dropping it without commit discards the staged
/// records and releases the counter lock with the committed value
/// untouched — a rollback.
pub struct MemoryTx {
    inner: Arc<MemoryInner>,
    reservation: Option<Reservation>,
    staged: Vec<IssuedNumber>,
}

impl IssuanceTx for MemoryTx {
    async fn reserve_range(
        &mut self,
        key: &CounterKey,
        qty: u32,
    ) -> Result<ReservedRange, StoreError> {
        if qty < 1 {
            return Err(StoreError::InvalidQuantity(qty));
        }
        if self.reservation.is_some() {
            return Err(StoreError::AlreadyReserved);
        }

        let cell = {
            let mut counters = lock(&self.inner.counters)?;
            Arc::clone(
                counters
                    .entry(*key)
                    .or_insert_with(|| Arc::new(CounterCell::new())),
            )
        };

        // Suspend here until any concurrent reservation on this key
        // commits or rolls back. The table lock above is already released,
        // so contention on one key never blocks other keys.
        let guard = Arc::clone(&cell.lock).lock_owned().await;

        let last = cell.committed.load(Ordering::Acquire);
        let range = ReservedRange::new(last + 1, last + i64::from(qty));
        self.reservation = Some(Reservation {
            cell,
            _guard: guard,
            end: range.end,
        });
        Ok(range)
    }

    async fn classification(
        &mut self,
        id: ClassificationId,
    ) -> Result<Option<Classification>, StoreError> {
        Ok(lock(&self.inner.classifications)?.get(&id).cloned())
    }

    async fn unit(&mut self, id: UnitId) -> Result<Option<OrgUnit>, StoreError> {
        Ok(lock(&self.inner.units)?.get(&id).cloned())
    }

    async fn insert_issued(&mut self, records: &[IssuedNumber]) -> Result<(), StoreError> {
        self.staged.extend_from_slice(records);
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);

        let mut records = lock(&self.inner.records)?;

        // Validate every staged row against the unique indexes (and against
        // the rest of the batch) before touching anything. A violation
        // fails the whole commit; the reservation guard is released on
        // return with the committed value untouched.
        let mut new_codes: HashSet<&str> = HashSet::new();
        let mut new_tokens: HashSet<&Uuid> = HashSet::new();
        for record in &staged {
            if records.codes.contains(&record.full_code) || !new_codes.insert(&record.full_code) {
                return Err(StoreError::Integrity(format!(
                    "duplicate full_code: {}",
                    record.full_code
                )));
            }
            let token = record.verification_token.as_uuid();
            if records.tokens.contains_key(token) || !new_tokens.insert(token) {
                return Err(StoreError::Integrity(format!(
                    "duplicate verification token on {}",
                    record.full_code
                )));
            }
        }

        for record in staged {
            let idx = records.rows.len();
            records.codes.insert(record.full_code.clone());
            records.tokens.insert(*record.verification_token.as_uuid(), idx);
            records.rows.push(record);
        }

        // Publish the counter advance while still holding both the record
        // table lock and the reservation guard: no observer can see the
        // records without the advance or the advance without the records.
        if let Some(reservation) = &self.reservation {
            reservation
                .cell
                .committed
                .store(reservation.end, Ordering::Release);
        }

        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Dropping self releases the reservation guard and discards the
        // staged rows.
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
