use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ActionKind, AuditState, EntityKind};

/// A ledger entry pairing the before/after snapshots of one mutation.
///
/// Immutable except for the `undone_*` triple, which is set exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: String,
    pub action_kind: ActionKind,
    pub entity_kind: EntityKind,
    pub subject_id: String,
    pub actor_id: String,
    pub before_snapshot: serde_json::Value,
    pub after_snapshot: Option<serde_json::Value>,
    pub batch_id: Option<String>,
    pub group_id: Option<String>,
    pub reverts_entry_id: Option<String>,
    pub undone_at: Option<DateTime<Utc>>,
    pub undone_by: Option<String>,
    pub undo_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    #[must_use]
    pub const fn state(&self) -> AuditState {
        if self.undone_at.is_some() {
            AuditState::Undone
        } else {
            AuditState::Active
        }
    }

    #[must_use]
    pub const fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }
}
