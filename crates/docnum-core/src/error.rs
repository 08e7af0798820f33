//! # Error Types — Issuance Error Taxonomy
//!
//! Defines the error types shared across the Document Numbering Stack. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Taxonomy
//!
//! - **Validation** (`IssueError::InvalidQuantity`) — rejected before any
//!   transaction opens; no side effects.
//! - **Not found** (`IssueError::ClassificationNotFound` / `UnitNotFound`) —
//!   the transaction is rolled back; counter and records untouched.
//! - **Store** (`StoreError`) — lock-wait timeout, connectivity loss,
//!   constraint violation; the transaction is rolled back. A store failure
//!   must not be blindly retried with the same quantity: a retry issues NEW
//!   numbers, it is not an idempotent replay.
//!
//! The engine returns these errors to its caller and performs no logging of
//! user-facing messages itself — presentation stays with collaborators.

use thiserror::Error;

use crate::identity::{ClassificationId, UnitId};

/// Failure of a single `issue` or `peek_next` call.
#[derive(Error, Debug)]
pub enum IssueError {
    /// Requested quantity is outside the allowed batch size range.
    #[error("invalid quantity {qty}: allowed range is {min}..={max}")]
    InvalidQuantity {
        /// The rejected quantity.
        qty: u32,
        /// Smallest allowed batch size.
        min: u32,
        /// Largest allowed batch size.
        max: u32,
    },

    /// The referenced classification does not exist in the directory.
    #[error("classification not found: {0}")]
    ClassificationNotFound(ClassificationId),

    /// The referenced unit does not exist in the directory.
    ///
    /// Also raised when the configured EXTERNAL issuing-authority unit does
    /// not correspond to a real directory entry — there is no silent
    /// fallback.
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The backing store failed; the transaction was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure inside the transactional store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A range reservation was requested for fewer than one number.
    #[error("invalid reservation quantity: {0} (must be >= 1)")]
    InvalidQuantity(u32),

    /// The transaction already holds a counter reservation.
    ///
    /// One reservation per transaction keeps lock acquisition single-key,
    /// which rules out cross-key deadlock inside this subsystem.
    #[error("transaction already holds a counter reservation")]
    AlreadyReserved,

    /// A uniqueness constraint was violated on commit.
    ///
    /// With a correctly advancing counter and random tokens this cannot
    /// happen; if it does, it signals counter corruption or a token
    /// collision. It is surfaced as-is and must never be silently retried.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The backend failed (connectivity, lock-wait timeout, I/O).
    #[error("store backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClassificationId;

    #[test]
    fn test_invalid_quantity_display() {
        let err = IssueError::InvalidQuantity {
            qty: 101,
            min: 1,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "invalid quantity 101: allowed range is 1..=100"
        );
    }

    #[test]
    fn test_not_found_display_names_the_id() {
        let id = ClassificationId::new();
        let err = IssueError::ClassificationNotFound(id);
        assert!(err.to_string().contains(&id.as_uuid().to_string()));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: IssueError = StoreError::AlreadyReserved.into();
        assert_eq!(
            err.to_string(),
            "transaction already holds a counter reservation"
        );
    }
}
