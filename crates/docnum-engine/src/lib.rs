//! # docnum-engine — The Batch Allocator
//!
//! The orchestration layer of the Document Numbering Stack, and the only
//! subsystem with a genuine correctness hazard: concurrent callers racing
//! to advance a shared counter. Everything around it — approval workflow,
//! HTTP surface, notifications — is a collaborator that hands commands in
//! or consumes the issued records.
//!
//! ## What One `issue` Call Does
//!
//! 1. Validate the requested quantity (before anything else; a rejected
//!    call has no side effects).
//! 2. Resolve the issuing unit: EXTERNAL documents draw from the fixed
//!    configured issuing authority, INTERNAL documents from the applicant
//!    unit itself.
//! 3. Open one store transaction; reserve a contiguous range from the
//!    counter for (classification, current UTC year, issuing unit).
//! 4. Resolve display codes; a missing classification or unit fails the
//!    whole call.
//! 5. Build one record per reserved sequence value, ascending.
//! 6. Insert all records in the same transaction and commit.
//!
//! Any failure after step 2 rolls the entire transaction back: no partial
//! counter advance, no partial record insertion, ever.
//!
//! ## What This Crate Never Does
//!
//! - No deduplication by originating request id — "exactly once per
//!   approved request" belongs to the calling workflow.
//! - No retry policy — a store failure surfaces to the caller; replaying
//!   an `issue` call creates NEW numbers.
//! - No reading back into workflow state.

pub mod allocator;
pub mod config;

pub use allocator::{Allocator, MAX_QTY, MIN_QTY};
pub use config::{ConfigError, EngineConfig, EXTERNAL_ISSUER_ENV};
