//! # PostgreSQL Backend
//!
//! Production [`IssuanceStore`] backed by PostgreSQL through `sqlx`. The
//! per-key exclusive lock is a `SELECT ... FOR UPDATE` on the counter row;
//! contending reservations suspend in the database's native lock wait with
//! its default timeout and deadlock handling. Read-committed isolation is
//! sufficient — the explicit row lock, not the isolation level, is the
//! serialization point.
//!
//! ## Schema
//!
//! The schema is embedded ([`SCHEMA`]) and applied idempotently by
//! [`PgStore::migrate`]. The counter table carries no foreign keys: a
//! reservation happens before the allocator resolves directory entries, and
//! a dangling key must surface as the allocator's not-found error after
//! rollback, not as a constraint failure during the reservation itself.
//! The record table keeps its unique constraints on `full_code` and
//! `verification_token` as defense-in-depth.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use docnum_core::{
    BatchId, Classification, ClassificationId, CounterKey, DocumentMetadata, DocumentType,
    IssuedNumber, IssuedNumberId, OrgUnit, RequestId, ReservedRange, StoreError, Timestamp,
    UnitId, VerificationToken,
};

use crate::{IssuanceStore, IssuanceTx};

/// Idempotent schema for all four tables.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS classifications (
    id        UUID PRIMARY KEY,
    code      TEXT NOT NULL UNIQUE,
    name      TEXT NOT NULL,
    parent_id UUID REFERENCES classifications (id),
    active    BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS units (
    id     UUID PRIMARY KEY,
    code   TEXT NOT NULL UNIQUE,
    name   TEXT NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS counters (
    classification_id UUID NOT NULL,
    year              INT NOT NULL,
    unit_id           UUID NOT NULL,
    last_number       BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (classification_id, year, unit_id)
);

CREATE TABLE IF NOT EXISTS issued_numbers (
    id                 UUID PRIMARY KEY,
    request_id         UUID,
    doc_type           TEXT NOT NULL,
    classification_id  UUID NOT NULL REFERENCES classifications (id),
    issuer_unit_id     UUID NOT NULL REFERENCES units (id),
    applicant_unit_id  UUID NOT NULL REFERENCES units (id),
    sequence           BIGINT NOT NULL,
    year               INT NOT NULL,
    full_code          TEXT NOT NULL UNIQUE,
    verification_token UUID NOT NULL UNIQUE,
    subject            TEXT,
    recipient          TEXT,
    signer             TEXT,
    batch_id           UUID,
    batch_index        INT,
    issued_at          TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issued_numbers_batch ON issued_numbers (batch_id);
CREATE INDEX IF NOT EXISTS idx_issued_numbers_request ON issued_numbers (request_id);
"#;

const ISSUED_COLUMNS: &str = "id, request_id, doc_type, classification_id, issuer_unit_id, \
     applicant_unit_id, sequence, year, full_code, verification_token, subject, recipient, \
     signer, batch_id, batch_index, issued_at";

/// Map an `sqlx` failure into the store taxonomy.
///
/// Unique-constraint violations become [`StoreError::Integrity`]; with a
/// correctly advancing counter and random tokens they indicate corruption
/// and must be surfaced, never retried.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return StoreError::Integrity(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn decode_issued(row: &PgRow) -> Result<IssuedNumber, StoreError> {
    let doc_type: String = row.try_get("doc_type").map_err(map_sqlx)?;
    let doc_type = match doc_type.as_str() {
        "INTERNAL" => DocumentType::Internal,
        "EXTERNAL" => DocumentType::External,
        other => {
            return Err(StoreError::Backend(format!(
                "unknown doc_type in issued_numbers row: {other}"
            )))
        }
    };

    let issued_at: chrono::DateTime<chrono::Utc> = row.try_get("issued_at").map_err(map_sqlx)?;

    Ok(IssuedNumber {
        id: IssuedNumberId(row.try_get("id").map_err(map_sqlx)?),
        request_id: row
            .try_get::<Option<Uuid>, _>("request_id")
            .map_err(map_sqlx)?
            .map(RequestId),
        doc_type,
        classification: ClassificationId(row.try_get("classification_id").map_err(map_sqlx)?),
        issuer_unit: UnitId(row.try_get("issuer_unit_id").map_err(map_sqlx)?),
        applicant_unit: UnitId(row.try_get("applicant_unit_id").map_err(map_sqlx)?),
        sequence: row.try_get("sequence").map_err(map_sqlx)?,
        year: row.try_get("year").map_err(map_sqlx)?,
        full_code: row.try_get("full_code").map_err(map_sqlx)?,
        verification_token: VerificationToken(
            row.try_get("verification_token").map_err(map_sqlx)?,
        ),
        metadata: DocumentMetadata {
            subject: row.try_get("subject").map_err(map_sqlx)?,
            recipient: row.try_get("recipient").map_err(map_sqlx)?,
            signer: row.try_get("signer").map_err(map_sqlx)?,
        },
        batch_id: row
            .try_get::<Option<Uuid>, _>("batch_id")
            .map_err(map_sqlx)?
            .map(BatchId),
        batch_index: row
            .try_get::<Option<i32>, _>("batch_index")
            .map_err(map_sqlx)?
            .map(|i| i as u32),
        issued_at: Timestamp::from_utc(issued_at),
    })
}

fn decode_classification(row: &PgRow) -> Result<Classification, StoreError> {
    Ok(Classification {
        id: ClassificationId(row.try_get("id").map_err(map_sqlx)?),
        code: row.try_get("code").map_err(map_sqlx)?,
        name: row.try_get("name").map_err(map_sqlx)?,
        parent: row
            .try_get::<Option<Uuid>, _>("parent_id")
            .map_err(map_sqlx)?
            .map(ClassificationId),
        active: row.try_get("active").map_err(map_sqlx)?,
    })
}

fn decode_unit(row: &PgRow) -> Result<OrgUnit, StoreError> {
    Ok(OrgUnit {
        id: UnitId(row.try_get("id").map_err(map_sqlx)?),
        code: row.try_get("code").map_err(map_sqlx)?,
        name: row.try_get("name").map_err(map_sqlx)?,
        active: row.try_get("active").map_err(map_sqlx)?,
    })
}

// ─── Store ───────────────────────────────────────────────────────────

/// PostgreSQL [`IssuanceStore`] backend.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(url).await.map_err(map_sqlx)?;
        Ok(Self { pool })
    }

    /// Apply the embedded schema idempotently.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        tracing::debug!("issuance schema ensured");
        Ok(())
    }

    /// Insert or replace a classification in the directory.
    pub async fn put_classification(
        &self,
        classification: &Classification,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO classifications (id, code, name, parent_id, active) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE \
             SET code = $2, name = $3, parent_id = $4, active = $5",
        )
        .bind(classification.id.0)
        .bind(&classification.code)
        .bind(&classification.name)
        .bind(classification.parent.map(|p| p.0))
        .bind(classification.active)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    /// Insert or replace a unit in the directory.
    pub async fn put_unit(&self, unit: &OrgUnit) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO units (id, code, name, active) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET code = $2, name = $3, active = $4",
        )
        .bind(unit.id.0)
        .bind(&unit.code)
        .bind(&unit.name)
        .bind(unit.active)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}

impl IssuanceStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(PgTx {
            tx,
            reserved: false,
        })
    }

    async fn last_number(&self, key: &CounterKey) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query(
            "SELECT last_number FROM counters \
             WHERE classification_id = $1 AND year = $2 AND unit_id = $3",
        )
        .bind(key.classification.0)
        .bind(key.year)
        .bind(key.unit.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(|r| r.try_get("last_number").map_err(map_sqlx))
            .transpose()
    }

    async fn classification(
        &self,
        id: ClassificationId,
    ) -> Result<Option<Classification>, StoreError> {
        let row = sqlx::query(
            "SELECT id, code, name, parent_id, active FROM classifications WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(decode_classification).transpose()
    }

    async fn unit(&self, id: UnitId) -> Result<Option<OrgUnit>, StoreError> {
        let row = sqlx::query("SELECT id, code, name, active FROM units WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(decode_unit).transpose()
    }

    async fn find_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<IssuedNumber>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_numbers WHERE verification_token = $1"
        ))
        .bind(token.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(decode_issued).transpose()
    }

    async fn batch(&self, id: BatchId) -> Result<Vec<IssuedNumber>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_numbers \
             WHERE batch_id = $1 ORDER BY batch_index"
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.iter().map(decode_issued).collect()
    }

    async fn for_request(&self, id: RequestId) -> Result<Vec<IssuedNumber>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ISSUED_COLUMNS} FROM issued_numbers \
             WHERE request_id = $1 ORDER BY issued_at, sequence"
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.iter().map(decode_issued).collect()
    }
}

// ─── Transaction ─────────────────────────────────────────────────────

/// PostgreSQL transaction. Dropping it without commit rolls it back
/// (inherited from `sqlx::Transaction`).
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
    reserved: bool,
}

impl IssuanceTx for PgTx {
    async fn reserve_range(
        &mut self,
        key: &CounterKey,
        qty: u32,
    ) -> Result<ReservedRange, StoreError> {
        if qty < 1 {
            return Err(StoreError::InvalidQuantity(qty));
        }
        if self.reserved {
            return Err(StoreError::AlreadyReserved);
        }

        // Create the row at zero on first use. A concurrent creator either
        // wins (we conflict and fall through to the lock wait) or loses to
        // us symmetrically; both orders serialize on the row lock below.
        sqlx::query(
            "INSERT INTO counters (classification_id, year, unit_id, last_number) \
             VALUES ($1, $2, $3, 0) \
             ON CONFLICT (classification_id, year, unit_id) DO NOTHING",
        )
        .bind(key.classification.0)
        .bind(key.year)
        .bind(key.unit.0)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        // The serialization point: suspend in the database's lock wait
        // until any concurrent holder of this row commits or rolls back.
        let row = sqlx::query(
            "SELECT last_number FROM counters \
             WHERE classification_id = $1 AND year = $2 AND unit_id = $3 \
             FOR UPDATE",
        )
        .bind(key.classification.0)
        .bind(key.year)
        .bind(key.unit.0)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        let last: i64 = row.try_get("last_number").map_err(map_sqlx)?;

        let range = ReservedRange::new(last + 1, last + i64::from(qty));
        sqlx::query(
            "UPDATE counters SET last_number = $4 \
             WHERE classification_id = $1 AND year = $2 AND unit_id = $3",
        )
        .bind(key.classification.0)
        .bind(key.year)
        .bind(key.unit.0)
        .bind(range.end)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        self.reserved = true;
        Ok(range)
    }

    async fn classification(
        &mut self,
        id: ClassificationId,
    ) -> Result<Option<Classification>, StoreError> {
        let row = sqlx::query(
            "SELECT id, code, name, parent_id, active FROM classifications WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(decode_classification).transpose()
    }

    async fn unit(&mut self, id: UnitId) -> Result<Option<OrgUnit>, StoreError> {
        let row = sqlx::query("SELECT id, code, name, active FROM units WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(decode_unit).transpose()
    }

    async fn insert_issued(&mut self, records: &[IssuedNumber]) -> Result<(), StoreError> {
        // Batches are capped at 100 records; per-row inserts inside the one
        // transaction are simpler than array binds and plenty fast.
        for record in records {
            sqlx::query(&format!(
                "INSERT INTO issued_numbers ({ISSUED_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ))
            .bind(record.id.0)
            .bind(record.request_id.map(|r| r.0))
            .bind(record.doc_type.to_string())
            .bind(record.classification.0)
            .bind(record.issuer_unit.0)
            .bind(record.applicant_unit.0)
            .bind(record.sequence)
            .bind(record.year)
            .bind(&record.full_code)
            .bind(record.verification_token.0)
            .bind(&record.metadata.subject)
            .bind(&record.metadata.recipient)
            .bind(&record.metadata.signer)
            .bind(record.batch_id.map(|b| b.0))
            .bind(record.batch_index.map(|i| i as i32))
            .bind(*record.issued_at.as_datetime())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(map_sqlx)
    }
}
