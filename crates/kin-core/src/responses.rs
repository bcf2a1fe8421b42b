//! Boundary response types for undo operations.
//!
//! Errors cross the engine boundary as `{kind, message}` pairs. `kind` is a
//! machine-readable snake_case identifier; `message` is for humans and is not
//! meant to be parsed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::EntityKind;
use crate::permission::{DecisionReason, UndoDecision};

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Idempotency,
    VersionConflict,
    ReferentialViolation,
    PermissionDenied,
    LockContention,
    ValidationError,
    /// Underlying storage failure.
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Idempotency => "idempotency",
            Self::VersionConflict => "version_conflict",
            Self::ReferentialViolation => "referential_violation",
            Self::PermissionDenied => "permission_denied",
            Self::LockContention => "lock_contention",
            Self::ValidationError => "validation_error",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

/// An entity written back by an undo.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RestoredSubject {
    pub entity_kind: EntityKind,
    pub id: String,
    pub version: i64,
}

/// What a successful undo changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UndoReceipt {
    /// Source entries now marked undone.
    pub reverted_entry_ids: Vec<String>,
    /// Newly appended `undo` entries, parallel to `reverted_entry_ids`.
    pub undo_entry_ids: Vec<String>,
    pub restored: Vec<RestoredSubject>,
    /// Batch id shared by the undo entries when more than one entry was reversed.
    pub undo_batch_id: Option<String>,
}

/// `{success, error}` envelope returned by every undo operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UndoResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<UndoReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl UndoResponse {
    #[must_use]
    pub const fn ok(receipt: UndoReceipt) -> Self {
        Self {
            success: true,
            receipt: Some(receipt),
            error: None,
        }
    }

    #[must_use]
    pub const fn failed(error: ErrorPayload) -> Self {
        Self {
            success: false,
            receipt: None,
            error: Some(error),
        }
    }
}

/// `{canUndo, reason}` envelope returned by the permission check.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PermissionResponse {
    pub can_undo: bool,
    pub reason: DecisionReason,
}

impl From<UndoDecision> for PermissionResponse {
    fn from(decision: UndoDecision) -> Self {
        Self {
            can_undo: decision.can_undo,
            reason: decision.reason,
        }
    }
}
