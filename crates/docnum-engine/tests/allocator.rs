//! Allocator behavior against the in-memory backend: batch semantics,
//! routing, validation, rollback, and preview stability.

use docnum_core::{
    Classification, ClassificationId, CounterKey, DocumentMetadata, DocumentType, IssueError,
    IssueRequest, OrgUnit, StoreError, Timestamp, UnitId,
};
use docnum_engine::{Allocator, EngineConfig, MAX_QTY};
use docnum_store::{IssuanceStore, MemoryStore};

struct Fixture {
    store: MemoryStore,
    allocator: Allocator<MemoryStore>,
    classification: Classification,
    unit: OrgUnit,
    authority: OrgUnit,
}

fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let classification = Classification::new("OT.02.01", "Internal correspondence");
    let unit = OrgUnit::new("D.IX.2.1", "Directorate IX, Division 2.1");
    let authority = OrgUnit::new("SEC.GEN", "Secretariat General");
    store.put_classification(classification.clone()).unwrap();
    store.put_unit(unit.clone()).unwrap();
    store.put_unit(authority.clone()).unwrap();

    let allocator = Allocator::new(store.clone(), EngineConfig::new(authority.id));
    Fixture {
        store,
        allocator,
        classification,
        unit,
        authority,
    }
}

fn internal_request(fx: &Fixture, qty: u32) -> IssueRequest {
    IssueRequest {
        doc_type: DocumentType::Internal,
        classification: fx.classification.id,
        applicant_unit: fx.unit.id,
        qty,
        request_id: None,
        metadata: DocumentMetadata::default(),
    }
}

#[tokio::test]
async fn test_first_batch_is_gap_free_from_one() {
    let fx = fixture();
    let year = Timestamp::now().year();

    let records = fx.allocator.issue(internal_request(&fx, 3)).await.unwrap();

    let sequences: Vec<i64> = records.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(records[0].full_code, format!("OT.02.01/D.IX.2.1/1/{year}"));
    assert_eq!(records[1].full_code, format!("OT.02.01/D.IX.2.1/2/{year}"));
    assert_eq!(records[2].full_code, format!("OT.02.01/D.IX.2.1/3/{year}"));

    // One shared batch id, indexes 1..=3 ascending with the sequence.
    let batch_id = records[0].batch_id.expect("multi-number call has a batch id");
    assert!(records.iter().all(|r| r.batch_id == Some(batch_id)));
    let indexes: Vec<u32> = records.iter().filter_map(|r| r.batch_index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    // Tokens are independent and distinct.
    let mut tokens: Vec<_> = records.iter().map(|r| r.verification_token).collect();
    tokens.sort_by_key(|t| *t.as_uuid());
    tokens.dedup();
    assert_eq!(tokens.len(), 3);
}

#[tokio::test]
async fn test_single_issue_has_no_batch_marker() {
    let fx = fixture();
    let records = fx.allocator.issue(internal_request(&fx, 1)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].batch_id, None);
    assert_eq!(records[0].batch_index, None);
}

#[tokio::test]
async fn test_consecutive_calls_continue_the_sequence() {
    let fx = fixture();
    fx.allocator.issue(internal_request(&fx, 2)).await.unwrap();
    let records = fx.allocator.issue(internal_request(&fx, 2)).await.unwrap();
    let sequences: Vec<i64> = records.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![3, 4]);
}

#[tokio::test]
async fn test_quantity_bounds_rejected_without_side_effects() {
    let fx = fixture();
    let year = Timestamp::now().year();
    let key = CounterKey {
        classification: fx.classification.id,
        year,
        unit: fx.unit.id,
    };

    for qty in [0, MAX_QTY + 1] {
        let err = fx.allocator.issue(internal_request(&fx, qty)).await.unwrap_err();
        assert!(matches!(err, IssueError::InvalidQuantity { .. }), "qty={qty}");
    }

    // Rejected before the transaction opened: no counter row, no records.
    assert_eq!(fx.store.last_number(&key).await.unwrap(), None);
    assert_eq!(fx.store.record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_classification_is_not_found() {
    let fx = fixture();
    let mut request = internal_request(&fx, 1);
    request.classification = ClassificationId::new();
    let err = fx.allocator.issue(request).await.unwrap_err();
    assert!(matches!(err, IssueError::ClassificationNotFound(_)));
    assert_eq!(fx.store.record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_failed_call_rolls_back_the_counter() {
    let fx = fixture();

    // EXTERNAL with an unknown applicant: the reservation against the
    // authority's counter happens first, then the applicant lookup fails.
    let request = IssueRequest {
        doc_type: DocumentType::External,
        classification: fx.classification.id,
        applicant_unit: UnitId::new(),
        qty: 5,
        request_id: None,
        metadata: DocumentMetadata::default(),
    };
    let err = fx.allocator.issue(request).await.unwrap_err();
    assert!(matches!(err, IssueError::UnitNotFound(_)));

    // The rollback left the authority's sequence untouched: a valid
    // EXTERNAL issuance still starts at 1.
    let request = IssueRequest {
        doc_type: DocumentType::External,
        classification: fx.classification.id,
        applicant_unit: fx.unit.id,
        qty: 1,
        request_id: None,
        metadata: DocumentMetadata::default(),
    };
    let records = fx.allocator.issue(request).await.unwrap();
    assert_eq!(records[0].sequence, 1);
}

#[tokio::test]
async fn test_external_draws_from_the_authority_counter() {
    let fx = fixture();
    let other_applicant = OrgUnit::new("D.VII.1", "Directorate VII, Division 1");
    fx.store.put_unit(other_applicant.clone()).unwrap();

    let first = fx
        .allocator
        .issue(IssueRequest {
            doc_type: DocumentType::External,
            classification: fx.classification.id,
            applicant_unit: fx.unit.id,
            qty: 1,
            request_id: None,
            metadata: DocumentMetadata::default(),
        })
        .await
        .unwrap();
    let second = fx
        .allocator
        .issue(IssueRequest {
            doc_type: DocumentType::External,
            classification: fx.classification.id,
            applicant_unit: other_applicant.id,
            qty: 1,
            request_id: None,
            metadata: DocumentMetadata::default(),
        })
        .await
        .unwrap();

    // Different applicants, one shared authority sequence.
    assert_eq!(first[0].issuer_unit, fx.authority.id);
    assert_eq!(second[0].issuer_unit, fx.authority.id);
    assert_eq!(first[0].sequence, 1);
    assert_eq!(second[0].sequence, 2);

    // The full code still carries the applicant's display code.
    assert!(first[0].full_code.contains("D.IX.2.1"));
    assert!(second[0].full_code.contains("D.VII.1"));

    // And the applicant's own INTERNAL sequence is untouched.
    let records = fx.allocator.issue(internal_request(&fx, 1)).await.unwrap();
    assert_eq!(records[0].sequence, 1);
}

#[tokio::test]
async fn test_misconfigured_authority_is_not_found() {
    let store = MemoryStore::new();
    let classification = Classification::new("OT.02.01", "Internal correspondence");
    let unit = OrgUnit::new("D.IX.2.1", "Directorate IX, Division 2.1");
    store.put_classification(classification.clone()).unwrap();
    store.put_unit(unit.clone()).unwrap();

    // The configured authority is not in the directory.
    let ghost = UnitId::new();
    let allocator = Allocator::new(store, EngineConfig::new(ghost));

    let err = allocator
        .issue(IssueRequest {
            doc_type: DocumentType::External,
            classification: classification.id,
            applicant_unit: unit.id,
            qty: 1,
            request_id: None,
            metadata: DocumentMetadata::default(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::UnitNotFound(id) if id == ghost));

    // INTERNAL issuance never consults the authority and still works.
    let records = allocator
        .issue(IssueRequest::single(
            DocumentType::Internal,
            classification.id,
            unit.id,
        ))
        .await
        .unwrap();
    assert_eq!(records[0].sequence, 1);
}

#[tokio::test]
async fn test_same_request_id_twice_yields_two_batches() {
    let fx = fixture();
    let request_id = docnum_core::RequestId::new();

    let mut request = internal_request(&fx, 2);
    request.request_id = Some(request_id);
    let first = fx.allocator.issue(request.clone()).await.unwrap();
    let second = fx.allocator.issue(request).await.unwrap();

    // No deduplication: two independent, fully valid batches.
    assert_ne!(first[0].batch_id, second[0].batch_id);
    let sequences: Vec<i64> = first
        .iter()
        .chain(second.iter())
        .map(|r| r.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert_eq!(fx.store.for_request(request_id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_metadata_is_carried_opaquely() {
    let fx = fixture();
    let mut request = internal_request(&fx, 2);
    request.metadata = DocumentMetadata {
        subject: Some("Quarterly budget report".to_string()),
        recipient: Some("All directorates".to_string()),
        signer: Some("The Secretary".to_string()),
    };
    let records = fx.allocator.issue(request.clone()).await.unwrap();
    for record in &records {
        assert_eq!(record.metadata, request.metadata);
    }
}

#[tokio::test]
async fn test_classifications_number_independently() {
    let fx = fixture();
    let other = Classification::new("KU.01", "Financial affairs");
    fx.store.put_classification(other.clone()).unwrap();

    fx.allocator.issue(internal_request(&fx, 3)).await.unwrap();

    let mut request = internal_request(&fx, 1);
    request.classification = other.id;
    let records = fx.allocator.issue(request).await.unwrap();
    assert_eq!(records[0].sequence, 1);
}

#[tokio::test]
async fn test_verification_token_readback() {
    let fx = fixture();
    let records = fx.allocator.issue(internal_request(&fx, 1)).await.unwrap();
    let token = records[0].verification_token;

    let found = fx
        .allocator
        .store()
        .find_by_token(&token)
        .await
        .unwrap()
        .expect("issued number is visible by token");
    assert_eq!(found.full_code, records[0].full_code);
}

#[tokio::test]
async fn test_batch_readback_matches_issue_order() {
    let fx = fixture();
    let records = fx.allocator.issue(internal_request(&fx, 5)).await.unwrap();
    let batch_id = records[0].batch_id.unwrap();

    let read = fx.store.batch(batch_id).await.unwrap();
    assert_eq!(read.len(), 5);
    let sequences: Vec<i64> = read.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    let indexes: Vec<u32> = read.iter().filter_map(|r| r.batch_index).collect();
    assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_preview_is_stable_and_non_binding() {
    let fx = fixture();

    // Repeated previews do not move anything.
    let first = fx
        .allocator
        .peek_next(DocumentType::Internal, fx.classification.id, fx.unit.id)
        .await
        .unwrap();
    for _ in 0..3 {
        let again = fx
            .allocator
            .peek_next(DocumentType::Internal, fx.classification.id, fx.unit.id)
            .await
            .unwrap();
        assert_eq!(again, first);
    }
    assert_eq!(first.next_number, 1);

    // The next actual issuance gets exactly the previewed number.
    let records = fx.allocator.issue(internal_request(&fx, 1)).await.unwrap();
    assert_eq!(records[0].sequence, first.next_number);
    assert_eq!(records[0].full_code, first.preview_code);

    let after = fx
        .allocator
        .peek_next(DocumentType::Internal, fx.classification.id, fx.unit.id)
        .await
        .unwrap();
    assert_eq!(after.next_number, 2);
}

#[tokio::test]
async fn test_preview_unknown_directory_entries_error() {
    let fx = fixture();
    let err = fx
        .allocator
        .peek_next(DocumentType::Internal, ClassificationId::new(), fx.unit.id)
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::ClassificationNotFound(_)));

    let err = fx
        .allocator
        .peek_next(DocumentType::Internal, fx.classification.id, UnitId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::UnitNotFound(_)));
}

#[tokio::test]
async fn test_store_errors_pass_through() {
    // A second reservation on one transaction is the easiest way to see a
    // StoreError surface through the engine's error type.
    let err: IssueError = StoreError::AlreadyReserved.into();
    assert!(matches!(err, IssueError::Store(StoreError::AlreadyReserved)));
}
