//! Undo executor and batch coordinator.
//!
//! Every operation follows the same shape: fail-fast locks first, then the
//! write gate and a transaction, then an authoritative re-check of the entry
//! and the actor, then restoration. Any error rolls the whole transaction
//! back; locks are released when the [`scope::UndoScope`] ends.

mod cascade;
mod delete;
mod executor;
mod group;
mod permission;
mod relationship;
mod scope;
mod update;

use kin_core::enums::{ActionKind, EntityKind};
use kin_core::errors::CoreError;
use kin_core::permission::DecisionReason;
use kin_core::responses::{ErrorKind, ErrorPayload, UndoReceipt, UndoResponse};
use kin_schema::SchemaError;
use thiserror::Error;

use crate::error::DatabaseError;
use crate::locks::LockContention;
use crate::repos::audit::find_audit;
use crate::service::KinService;

/// Stable codes carried by [`UndoError::Validation`].
pub mod codes {
    /// The operation does not handle this entry's action kind.
    pub const WRONG_KIND: &str = "wrong-kind";
    /// The entry is one of several in a batch; undo the batch instead.
    pub const BATCH_MEMBER: &str = "batch-member";
    /// A group member's batch has entries outside the group.
    pub const PARTIAL_BATCH: &str = "partial-batch";
    /// Undelete on an entity that is not deleted.
    pub const NOT_DELETED: &str = "not-deleted";
    /// Retracting a creation whose entity is already gone.
    pub const NOT_LIVE: &str = "not-live";
    /// `before_snapshot` failed schema or whitelist checks.
    pub const INVALID_SNAPSHOT: &str = "invalid-snapshot";
}

/// Errors returned by undo operations.
#[derive(Debug, Error)]
pub enum UndoError {
    #[error("{entity_type} '{id}' not found")]
    NotFound { entity_type: &'static str, id: String },

    /// The entry was already undone; nothing changed.
    #[error("audit entry '{entry_id}' is already undone")]
    Idempotency { entry_id: String },

    #[error("version conflict on {entity_kind} '{id}': expected {expected}, found {actual}")]
    VersionConflict {
        entity_kind: EntityKind,
        id: String,
        expected: i64,
        actual: i64,
    },

    #[error("cannot restore {field} of '{id}': '{target}' {problem}")]
    ReferentialViolation {
        id: String,
        field: String,
        target: String,
        problem: &'static str,
    },

    #[error("undo of '{entry_id}' denied: {reason}")]
    PermissionDenied {
        entry_id: String,
        reason: DecisionReason,
    },

    #[error(transparent)]
    LockContention(#[from] LockContention),

    #[error("{code}: {message}")]
    Validation { code: &'static str, message: String },

    #[error("storage failure: {0}")]
    Database(#[from] DatabaseError),
}

impl From<libsql::Error> for UndoError {
    fn from(e: libsql::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

impl UndoError {
    pub(crate) fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn entry_not_found(id: &str) -> Self {
        Self::NotFound {
            entity_type: "audit entry",
            id: id.to_string(),
        }
    }

    pub(crate) fn actor_not_found(id: &str) -> Self {
        Self::NotFound {
            entity_type: "actor",
            id: id.to_string(),
        }
    }

    pub(crate) fn subject_not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            entity_type: kind.as_str(),
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_snapshot(entry_id: &str, err: &CoreError) -> Self {
        Self::validation(codes::INVALID_SNAPSHOT, format!("entry '{entry_id}': {err}"))
    }

    pub(crate) fn snapshot_schema(entry_id: &str, err: &SchemaError) -> Self {
        let detail = match err {
            SchemaError::ValidationFailed { errors } => errors.join("; "),
            other => other.to_string(),
        };
        Self::validation(codes::INVALID_SNAPSHOT, format!("entry '{entry_id}': {detail}"))
    }

    /// Machine-readable category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Idempotency { .. } => ErrorKind::Idempotency,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::ReferentialViolation { .. } => ErrorKind::ReferentialViolation,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::LockContention(_) => ErrorKind::LockContention,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Database(_) => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Wrap an operation result in the boundary envelope.
#[must_use]
pub fn respond(result: Result<UndoReceipt, UndoError>) -> UndoResponse {
    match result {
        Ok(receipt) => UndoResponse::ok(receipt),
        Err(e) => UndoResponse::failed(e.to_payload()),
    }
}

/// Trim a caller-supplied reason and cap its length in characters.
#[must_use]
pub fn normalize_reason(reason: &str, max_chars: usize) -> String {
    reason.trim().chars().take(max_chars).collect()
}

impl KinService {
    /// Undo any reversible entry, choosing the handler from its action kind.
    ///
    /// Delete entries that belong to a multi-entry batch are reversed as a
    /// whole batch.
    ///
    /// # Errors
    ///
    /// Any [`UndoError`] the chosen handler returns.
    pub async fn undo_entry(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        let entry = {
            let _gate = self.write_gate().await;
            find_audit(self.db().conn(), entry_id)
                .await?
                .ok_or_else(|| UndoError::entry_not_found(entry_id))?
        };

        match entry.action_kind {
            ActionKind::Update | ActionKind::AdminUpdate => {
                self.undo_update(entry_id, actor_id, reason).await
            }
            ActionKind::CascadeDelete => self.undo_cascade_delete(entry_id, actor_id, reason).await,
            ActionKind::Delete | ActionKind::RelationshipDelete => {
                if entry.batch_id.is_some() {
                    self.undo_cascade_delete(entry_id, actor_id, reason).await
                } else {
                    self.undo_delete(entry_id, actor_id, reason).await
                }
            }
            ActionKind::RelationshipCreate => {
                self.undo_relationship_create(entry_id, actor_id, reason)
                    .await
            }
            ActionKind::Undo => Err(UndoError::PermissionDenied {
                entry_id: entry_id.to_string(),
                reason: DecisionReason::NotUndoable,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reasons_are_trimmed_and_capped() {
        assert_eq!(normalize_reason("  typo fix \n", 500), "typo fix");
        assert_eq!(normalize_reason("", 500), "");
        assert_eq!(normalize_reason("   ", 500), "");
        assert_eq!(normalize_reason("abcdef", 3), "abc");
        // counts characters, not bytes
        assert_eq!(normalize_reason("ééé", 2), "éé");
    }

    #[test]
    fn errors_map_to_payload_kinds() {
        let err = UndoError::VersionConflict {
            entity_kind: EntityKind::Profile,
            id: "prf-1".into(),
            expected: 6,
            actual: 10,
        };
        let payload = err.to_payload();
        assert_eq!(payload.kind, ErrorKind::VersionConflict);
        assert_eq!(
            payload.message,
            "version conflict on profile 'prf-1': expected 6, found 10"
        );

        let err = UndoError::validation(codes::PARTIAL_BATCH, "bat-1 spans groups");
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "partial-batch: bat-1 spans groups");

        let err = UndoError::from(DatabaseError::NoResult);
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn respond_wraps_results() {
        let ok = respond(Ok(UndoReceipt::default()));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = respond(Err(UndoError::Idempotency {
            entry_id: "aud-1".into(),
        }));
        assert!(!failed.success);
        assert_eq!(failed.error.unwrap().kind, ErrorKind::Idempotency);
    }
}
