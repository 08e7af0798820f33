//! # docnum-store — Transactional Counter and Record Storage
//!
//! Defines the storage seam the allocator drives, and the two backends that
//! implement it:
//!
//! - [`MemoryStore`] — in-process tables guarded by per-key async locks.
//!   Used by tests and development; implements the exact same locking
//!   protocol as the production backend.
//! - [`PgStore`] — PostgreSQL via `sqlx`, using `SELECT ... FOR UPDATE` row
//!   locks on the counter table. The production backend: counters survive
//!   restarts and serialize writers across processes.
//!
//! ## The Seam
//!
//! Counter advancement and the corresponding record writes must be one
//! indivisible unit, so the seam is transactional: [`IssuanceStore::begin`]
//! opens an [`IssuanceTx`], and everything the allocator does — reserving
//! the range, resolving display codes, inserting records — happens against
//! that transaction. Either [`IssuanceTx::commit`] makes all of it visible,
//! or the transaction (explicitly rolled back or simply dropped) leaves no
//! trace. There is no window where the counter has advanced but the records
//! are missing, or vice versa.
//!
//! ## Locking Protocol
//!
//! [`IssuanceTx::reserve_range`] acquires an exclusive lock on the counter
//! row for its key — creating the row at zero if absent — **before any
//! read**. A concurrent reservation against the same key suspends on the
//! backend's native blocking wait (Postgres row lock / async mutex) until
//! the holder commits or rolls back; there is no polling. Reservations
//! against different keys proceed fully in parallel.
//!
//! A transaction may hold at most ONE counter reservation. Single-key
//! locking means no lock ordering problem exists and cross-key deadlock is
//! impossible inside this subsystem.
//!
//! ## Read Side
//!
//! The read-only methods on [`IssuanceStore`] (`last_number`, directory
//! lookups, token/batch/request readback) take no locks and see only
//! committed state. `last_number` in particular never blocks behind an open
//! reservation — it is the substrate of the advisory preview.

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, MemoryTx};
pub use postgres::{PgStore, PgTx};

use std::future::Future;

use docnum_core::{
    BatchId, Classification, ClassificationId, CounterKey, IssuedNumber, OrgUnit, RequestId,
    ReservedRange, StoreError, UnitId, VerificationToken,
};

/// A transactional store of per-key counters and issued-number records.
///
/// Methods return `impl Future + Send` rather than being declared `async`
/// so that callers generic over the store can hold the futures across
/// `tokio::spawn` boundaries.
pub trait IssuanceStore: Send + Sync {
    /// The transaction handle type for this backend.
    type Tx: IssuanceTx;

    /// Open a transaction. Dropping it without committing rolls it back.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// Last committed counter value for `key`, or `None` if no allocation
    /// has ever touched the key. Lock-free, read-committed.
    fn last_number(
        &self,
        key: &CounterKey,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Look up a classification outside any transaction.
    fn classification(
        &self,
        id: ClassificationId,
    ) -> impl Future<Output = Result<Option<Classification>, StoreError>> + Send;

    /// Look up a unit outside any transaction.
    fn unit(
        &self,
        id: UnitId,
    ) -> impl Future<Output = Result<Option<OrgUnit>, StoreError>> + Send;

    /// Find an issued number by its verification token.
    fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> impl Future<Output = Result<Option<IssuedNumber>, StoreError>> + Send;

    /// All numbers of a batch, ordered by batch index.
    fn batch(
        &self,
        id: BatchId,
    ) -> impl Future<Output = Result<Vec<IssuedNumber>, StoreError>> + Send;

    /// All numbers issued for an originating request, in issuance order.
    fn for_request(
        &self,
        id: RequestId,
    ) -> impl Future<Output = Result<Vec<IssuedNumber>, StoreError>> + Send;
}

/// One open transaction against an [`IssuanceStore`].
///
/// The contract callers must honor: a reserved range is only trustworthy if
/// the records built from it are inserted through the SAME transaction and
/// the transaction commits. Reserving a range, committing nothing, and then
/// using the numbers elsewhere re-creates exactly the duplication hazard
/// this store exists to prevent.
pub trait IssuanceTx: Send {
    /// Reserve a contiguous range of `qty` sequence values for `key`.
    ///
    /// Locks the counter row exclusively (creating it at zero if absent),
    /// computes `[last+1, last+qty]`, and stages `last_number = end`. The
    /// lock is held until commit or rollback.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidQuantity`] if `qty < 1`.
    /// - [`StoreError::AlreadyReserved`] if this transaction already holds
    ///   a reservation.
    fn reserve_range(
        &mut self,
        key: &CounterKey,
        qty: u32,
    ) -> impl Future<Output = Result<ReservedRange, StoreError>> + Send;

    /// Look up a classification inside this transaction.
    fn classification(
        &mut self,
        id: ClassificationId,
    ) -> impl Future<Output = Result<Option<Classification>, StoreError>> + Send;

    /// Look up a unit inside this transaction.
    fn unit(
        &mut self,
        id: UnitId,
    ) -> impl Future<Output = Result<Option<OrgUnit>, StoreError>> + Send;

    /// Stage issued-number records for insertion. Records become visible
    /// only after [`commit`](IssuanceTx::commit).
    fn insert_issued(
        &mut self,
        records: &[IssuedNumber],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Commit: publish staged records and the counter advance atomically.
    ///
    /// A uniqueness violation on `full_code` or `verification_token`
    /// surfaces as [`StoreError::Integrity`] and the whole transaction
    /// rolls back.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll back explicitly. Equivalent to dropping the transaction.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
