//! # Directory Records — Classifications and Units
//!
//! Reference data consumed by the allocator when building full codes. Both
//! record kinds are maintained outside the issuance path (directory
//! seeding/administration) and are read-only from the engine's point of
//! view.

use serde::{Deserialize, Serialize};

use crate::identity::{ClassificationId, UnitId};

/// A document classification: one numbering bucket.
///
/// Classifications form a hierarchy (e.g. `OT` → `OT.02` → `OT.02.01`);
/// only leaf codes are typically used for issuance, but the engine does not
/// enforce this — the bucket is whatever classification the caller names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Identifier referenced by counters and issued numbers.
    pub id: ClassificationId,
    /// Display code embedded in full codes (e.g. `OT.02.01`).
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Parent classification in the hierarchy, if any.
    pub parent: Option<ClassificationId>,
    /// Whether new numbers may still be issued against this classification.
    pub active: bool,
}

/// An organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Identifier referenced by counters and issued numbers.
    pub id: UnitId,
    /// Display code embedded in full codes (e.g. `D.IX.2.1`).
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the unit is active in the directory.
    pub active: bool,
}

impl Classification {
    /// Create a root-level active classification.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ClassificationId::new(),
            code: code.into(),
            name: name.into(),
            parent: None,
            active: true,
        }
    }
}

impl OrgUnit {
    /// Create an active unit.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(),
            code: code.into(),
            name: name.into(),
            active: true,
        }
    }
}
