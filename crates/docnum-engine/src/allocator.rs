//! # Batch Allocator
//!
//! Drives the counter store and the code formatter inside one store
//! transaction per call. Correctness under concurrency is delegated
//! entirely to the store's per-key exclusive lock — there is no in-process
//! queue, and calls against different keys never block each other.

use docnum_core::{
    BatchId, ClassificationId, CounterKey, DocumentType, IssueError, IssueRequest, IssuedNumber,
    IssuedNumberId, NumberPreview, Timestamp, UnitId, VerificationToken, full_code,
};
use docnum_store::{IssuanceStore, IssuanceTx};

use crate::config::EngineConfig;

/// Smallest batch a single call may issue.
pub const MIN_QTY: u32 = 1;
/// Largest batch a single call may issue.
pub const MAX_QTY: u32 = 100;

/// The issuance engine: one instance per process, shared across callers.
///
/// Cheap to share behind an `Arc`; all state lives in the store.
pub struct Allocator<S> {
    store: S,
    config: EngineConfig,
}

impl<S: IssuanceStore> Allocator<S> {
    /// Create an allocator over a store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store, for read-side collaborators (verification
    /// lookup, batch readback).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The unit whose counter a request of this type consumes.
    fn issuing_unit(&self, doc_type: DocumentType, applicant_unit: UnitId) -> UnitId {
        match doc_type {
            DocumentType::External => self.config.external_issuer_unit,
            DocumentType::Internal => applicant_unit,
        }
    }

    /// Issue a gap-free batch of document numbers.
    ///
    /// On success exactly `request.qty` new records exist and the counter
    /// advanced by exactly `request.qty`, with no window where one holds
    /// without the other. On any failure the transaction rolls back whole.
    ///
    /// A failed call must not be blindly replayed: issuance is not
    /// idempotent, and a retry creates new numbers.
    pub async fn issue(&self, request: IssueRequest) -> Result<Vec<IssuedNumber>, IssueError> {
        if !(MIN_QTY..=MAX_QTY).contains(&request.qty) {
            return Err(IssueError::InvalidQuantity {
                qty: request.qty,
                min: MIN_QTY,
                max: MAX_QTY,
            });
        }

        let issuer_unit = self.issuing_unit(request.doc_type, request.applicant_unit);
        let issued_at = Timestamp::now();
        let key = CounterKey {
            classification: request.classification,
            year: issued_at.year(),
            unit: issuer_unit,
        };

        // Everything below happens inside one transaction; any early
        // return drops `tx`, which rolls it back.
        let mut tx = self.store.begin().await?;
        let range = tx.reserve_range(&key, request.qty).await?;

        let classification = tx
            .classification(request.classification)
            .await?
            .ok_or(IssueError::ClassificationNotFound(request.classification))?;
        let applicant = tx
            .unit(request.applicant_unit)
            .await?
            .ok_or(IssueError::UnitNotFound(request.applicant_unit))?;
        if issuer_unit != request.applicant_unit {
            // EXTERNAL path: the configured authority must be a real
            // directory entry; there is no silent fallback.
            tx.unit(issuer_unit)
                .await?
                .ok_or(IssueError::UnitNotFound(issuer_unit))?;
        }

        let batch_id = if request.qty > 1 {
            Some(BatchId::new())
        } else {
            None
        };

        let mut records = Vec::with_capacity(request.qty as usize);
        for (index, sequence) in range.sequences().enumerate() {
            records.push(IssuedNumber {
                id: IssuedNumberId::new(),
                request_id: request.request_id,
                doc_type: request.doc_type,
                classification: request.classification,
                issuer_unit,
                applicant_unit: request.applicant_unit,
                sequence,
                year: key.year,
                // The full code carries the APPLICANT's display code even
                // for EXTERNAL documents; only the sequence is drawn from
                // the authority's counter.
                full_code: full_code(&classification.code, &applicant.code, sequence, key.year),
                verification_token: VerificationToken::generate(),
                metadata: request.metadata.clone(),
                batch_id,
                batch_index: batch_id.map(|_| index as u32 + 1),
                issued_at,
            });
        }

        tx.insert_issued(&records).await?;
        tx.commit().await?;

        tracing::debug!(
            key = %key,
            count = records.len(),
            first = range.start,
            last = range.end,
            "issued document numbers"
        );
        Ok(records)
    }

    /// Advisory projection of the next number for a key. Takes no lock and
    /// reserves nothing — a concurrent allocation can make the real
    /// assigned number differ.
    pub async fn peek_next(
        &self,
        doc_type: DocumentType,
        classification_id: ClassificationId,
        applicant_unit: UnitId,
    ) -> Result<NumberPreview, IssueError> {
        let issuer_unit = self.issuing_unit(doc_type, applicant_unit);
        let year = Timestamp::now().year();
        let key = CounterKey {
            classification: classification_id,
            year,
            unit: issuer_unit,
        };

        let classification = self
            .store
            .classification(classification_id)
            .await?
            .ok_or(IssueError::ClassificationNotFound(classification_id))?;
        let applicant = self
            .store
            .unit(applicant_unit)
            .await?
            .ok_or(IssueError::UnitNotFound(applicant_unit))?;

        let next_number = self.store.last_number(&key).await?.unwrap_or(0) + 1;
        Ok(NumberPreview {
            next_number,
            preview_code: full_code(&classification.code, &applicant.code, next_number, year),
        })
    }
}
