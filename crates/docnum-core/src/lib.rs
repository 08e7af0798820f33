//! # docnum-core — Foundational Types for the Document Numbering Stack
//!
//! This crate is the bedrock of the Document Numbering Stack. It defines the
//! domain vocabulary shared by every other crate in the workspace: identifier
//! newtypes, the UTC-only `Timestamp`, the issuance records themselves, the
//! error taxonomy, and the one place where full-code formatting knowledge
//! lives.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `ClassificationId`,
//!    `UnitId`, `BatchId`, `VerificationToken` — all newtypes with distinct
//!    namespaces. You cannot pass a unit identifier where a classification
//!    identifier is expected.
//!
//! 2. **One formatter.** All full codes flow through [`format::full_code`].
//!    No other module concatenates code segments. This is the sole home of
//!    numbering-format knowledge.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision. The issuance year is always derived from
//!    a `Timestamp`, never from local time.
//!
//! 4. **Immutable records.** An [`IssuedNumber`] is created once at issuance
//!    time; no update or delete operation exists anywhere in this workspace.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docnum-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod format;
pub mod identity;
pub mod numbering;
pub mod registry;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::{IssueError, StoreError};
pub use format::full_code;
pub use identity::{
    BatchId, ClassificationId, IssuedNumberId, RequestId, UnitId, VerificationToken,
};
pub use numbering::{
    CounterKey, DocumentMetadata, DocumentType, IssueRequest, IssuedNumber, NumberPreview,
    ReservedRange,
};
pub use registry::{Classification, OrgUnit};
pub use temporal::Timestamp;
