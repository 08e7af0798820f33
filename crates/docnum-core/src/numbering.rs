//! # Numbering Domain Records
//!
//! The vocabulary of the issuance engine: counter keys, reserved ranges,
//! issue requests, and the immutable [`IssuedNumber`] record itself.
//!
//! ## Invariants
//!
//! - For a fixed [`CounterKey`], issued sequence values form the exact set
//!   `{1..N}` after `N` successful allocations — no gaps, no duplicates,
//!   regardless of concurrency.
//! - A batch of size N shares one `batch_id` and carries `batch_index`
//!   `1..=N` in ascending sequence order; a batch of size 1 has neither.
//! - An `IssuedNumber` is created once and never updated or deleted.

use serde::{Deserialize, Serialize};

use crate::identity::{
    BatchId, ClassificationId, IssuedNumberId, RequestId, UnitId, VerificationToken,
};
use crate::temporal::Timestamp;

// ─── Document Type ───────────────────────────────────────────────────

/// Whether a document is addressed inside or outside the organization.
///
/// The type decides which unit's sequence is consumed: INTERNAL documents
/// draw from the applicant unit's own counter, EXTERNAL documents draw from
/// the fixed central issuing authority's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Correspondence between units; numbered by the applicant unit itself.
    Internal,
    /// Outbound correspondence; numbered by the central issuing authority.
    External,
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Internal => "INTERNAL",
            Self::External => "EXTERNAL",
        };
        f.write_str(s)
    }
}

// ─── Counter Key ─────────────────────────────────────────────────────

/// Key of one persistent counter row.
///
/// Counters partition naturally by year: the first allocation of a new year
/// creates a fresh row at zero, so sequences restart without any rollover
/// job touching the old rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    /// The numbering bucket.
    pub classification: ClassificationId,
    /// UTC calendar year of issuance.
    pub year: i32,
    /// The unit whose sequence is consumed (issuing unit, not applicant).
    pub unit: UnitId,
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.classification, self.year, self.unit)
    }
}

// ─── Reserved Range ──────────────────────────────────────────────────

/// A contiguous, gap-free range of sequence values reserved in one call.
///
/// Both bounds are inclusive. Only the counter store constructs these, and
/// only while holding the exclusive lock on the counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRange {
    /// First reserved sequence value (>= 1).
    pub start: i64,
    /// Last reserved sequence value.
    pub end: i64,
}

impl ReservedRange {
    /// Build a range from inclusive bounds.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Number of sequence values in the range.
    pub fn len(&self) -> u32 {
        (self.end - self.start + 1) as u32
    }

    /// Whether the range is empty (never produced by a valid reservation).
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// The reserved sequence values in ascending order.
    pub fn sequences(&self) -> std::ops::RangeInclusive<i64> {
        self.start..=self.end
    }
}

// ─── Issue Request ───────────────────────────────────────────────────

/// Descriptive metadata carried opaquely on an issued number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Subject line of the document.
    pub subject: Option<String>,
    /// Addressee.
    pub recipient: Option<String>,
    /// Signing official.
    pub signer: Option<String>,
}

/// The command handed from the approval workflow to the allocator.
///
/// The calling workflow is responsible for invoking `issue` exactly once
/// per approved request; the engine performs no deduplication by
/// `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Internal or external numbering path.
    pub doc_type: DocumentType,
    /// The numbering bucket to draw from.
    pub classification: ClassificationId,
    /// The unit requesting the numbers.
    pub applicant_unit: UnitId,
    /// How many numbers to issue (validated against the batch size range).
    pub qty: u32,
    /// Originating workflow request, if any.
    pub request_id: Option<RequestId>,
    /// Opaque descriptive metadata.
    pub metadata: DocumentMetadata,
}

impl IssueRequest {
    /// A single-number request with empty metadata.
    pub fn single(
        doc_type: DocumentType,
        classification: ClassificationId,
        applicant_unit: UnitId,
    ) -> Self {
        Self {
            doc_type,
            classification,
            applicant_unit,
            qty: 1,
            request_id: None,
            metadata: DocumentMetadata::default(),
        }
    }
}

// ─── Issued Number ───────────────────────────────────────────────────

/// One issued document number. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedNumber {
    /// Record identity.
    pub id: IssuedNumberId,
    /// Originating workflow request, if any.
    pub request_id: Option<RequestId>,
    /// Internal or external numbering path.
    pub doc_type: DocumentType,
    /// The numbering bucket the sequence was drawn from.
    pub classification: ClassificationId,
    /// The unit whose counter was advanced.
    pub issuer_unit: UnitId,
    /// The unit that requested the number.
    pub applicant_unit: UnitId,
    /// Position within the counter's sequence (>= 1).
    pub sequence: i64,
    /// UTC calendar year of issuance.
    pub year: i32,
    /// Globally unique human-readable composite code.
    pub full_code: String,
    /// Globally unique opaque token for public verification.
    pub verification_token: VerificationToken,
    /// Opaque descriptive metadata.
    pub metadata: DocumentMetadata,
    /// Shared by all numbers issued in one multi-number call; `None` for
    /// single issuance.
    pub batch_id: Option<BatchId>,
    /// 1-based position within the batch, ascending with `sequence`;
    /// `None` for single issuance.
    pub batch_index: Option<u32>,
    /// When the batch was issued.
    pub issued_at: Timestamp,
}

impl IssuedNumber {
    /// The counter key this number was drawn from.
    pub fn counter_key(&self) -> CounterKey {
        CounterKey {
            classification: self.classification,
            year: self.year,
            unit: self.issuer_unit,
        }
    }
}

// ─── Preview ─────────────────────────────────────────────────────────

/// Advisory projection of the next number for a key.
///
/// Concurrent allocations between a preview and an actual `issue` call can
/// make the real assigned number differ. A preview is NOT a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPreview {
    /// The sequence value the next allocation would receive right now.
    pub next_number: i64,
    /// Full code the next allocation would render to.
    pub preview_code: String,
}
