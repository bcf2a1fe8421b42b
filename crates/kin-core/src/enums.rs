//! Action kinds, entity kinds, roles, and state enums for Kin.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage. `AuditState` carries the only state
//! machine in the ledger: an entry is active until it is undone, and never after.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Kind of mutation recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Update,
    AdminUpdate,
    Delete,
    CascadeDelete,
    RelationshipCreate,
    RelationshipDelete,
    Undo,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::AdminUpdate => "admin_update",
            Self::Delete => "delete",
            Self::CascadeDelete => "cascade_delete",
            Self::RelationshipCreate => "relationship_create",
            Self::RelationshipDelete => "relationship_delete",
            Self::Undo => "undo",
        }
    }

    /// Field edits whose reversal restores a `before_snapshot`.
    #[must_use]
    pub const fn is_update_like(self) -> bool {
        matches!(self, Self::Update | Self::AdminUpdate)
    }

    /// Soft deletes whose reversal clears `deleted_at`.
    #[must_use]
    pub const fn is_delete_like(self) -> bool {
        matches!(
            self,
            Self::Delete | Self::CascadeDelete | Self::RelationshipDelete
        )
    }

    /// Undo entries are terminal and can never be reversed themselves.
    #[must_use]
    pub const fn is_reversible(self) -> bool {
        !matches!(self, Self::Undo)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// Kind of record an audit entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Profile,
    Relationship,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Relationship => "relationship",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Actor role. Ordering follows privilege: `Member < Moderator < Admin < SuperAdmin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Moderator,
    Admin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Admin or higher.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        self >= Self::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActorStatus
// ---------------------------------------------------------------------------

/// Account standing of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Active,
    Blocked,
    Suspended,
}

impl ActorStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Suspended => "suspended",
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditState
// ---------------------------------------------------------------------------

/// Lifecycle of an audit entry.
///
/// ```text
/// active → undone
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditState {
    Active,
    Undone,
}

impl AuditState {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Undone],
            Self::Undone => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Undone => "undone",
        }
    }
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RelationshipKind
// ---------------------------------------------------------------------------

/// Kind of non-parental link between two profiles.
///
/// Parent links are stored on the profile itself (`father_id` / `mother_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Spouse,
    Partner,
    Sibling,
}

impl RelationshipKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spouse => "spouse",
            Self::Partner => "partner",
            Self::Sibling => "sibling",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn audit_state_is_terminal_once_undone() {
        assert!(AuditState::Active.can_transition_to(AuditState::Undone));
        assert!(!AuditState::Undone.can_transition_to(AuditState::Active));
        assert!(!AuditState::Undone.can_transition_to(AuditState::Undone));
        assert!(AuditState::Undone.allowed_next_states().is_empty());
    }

    #[test]
    fn role_ordering_matches_privilege() {
        assert!(Role::Member < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
        assert!(!Role::Moderator.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(Role::SuperAdmin.is_privileged());
    }

    #[test]
    fn action_kind_serializes_like_as_str() {
        for kind in [
            ActionKind::Update,
            ActionKind::AdminUpdate,
            ActionKind::Delete,
            ActionKind::CascadeDelete,
            ActionKind::RelationshipCreate,
            ActionKind::RelationshipDelete,
            ActionKind::Undo,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn only_undo_is_irreversible() {
        assert!(!ActionKind::Undo.is_reversible());
        assert!(ActionKind::CascadeDelete.is_reversible());
        assert!(ActionKind::RelationshipDelete.is_delete_like());
        assert!(!ActionKind::RelationshipCreate.is_delete_like());
        assert!(ActionKind::AdminUpdate.is_update_like());
    }
}
