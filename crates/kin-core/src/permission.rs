//! Undo permission matrix.
//!
//! `evaluate` is a pure function of the entry facts, the acting user, the
//! clock reading, and the configured windows. It never touches storage, so
//! the executor can call it inside its transaction with freshly read rows and
//! the UI can call it as an advisory hint with the same result.
//!
//! Rule order:
//! 1. already undone → `already-undone` (before anything else)
//! 2. blocked or suspended actor → `actor-blocked`
//! 3. `undo` entries → `not-undoable`
//! 4. per action kind: role, ownership, and time window

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{Actor, AuditEntry};
use crate::enums::{ActionKind, Role};

/// Time windows, in whole days, during which an entry may be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoPolicy {
    /// Window for non-admin undo of `update` / `admin_update`. Admins are unlimited.
    pub update_window_days: i64,
    /// Window for `delete` / `cascade_delete`, applied to every role.
    pub delete_window_days: i64,
    pub relationship_create_window_days: i64,
    pub relationship_delete_window_days: i64,
}

impl Default for UndoPolicy {
    fn default() -> Self {
        Self {
            update_window_days: 30,
            delete_window_days: 7,
            relationship_create_window_days: 14,
            relationship_delete_window_days: 14,
        }
    }
}

/// Why an undo was allowed or denied. Serialized as stable kebab-case ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    Owner,
    Privileged,
    BranchModerator,
    AlreadyUndone,
    ActorBlocked,
    NotUndoable,
    NotOwner,
    InsufficientRole,
    Expired,
}

impl DecisionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Privileged => "privileged",
            Self::BranchModerator => "branch-moderator",
            Self::AlreadyUndone => "already-undone",
            Self::ActorBlocked => "actor-blocked",
            Self::NotUndoable => "not-undoable",
            Self::NotOwner => "not-owner",
            Self::InsufficientRole => "insufficient-role",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UndoDecision {
    pub can_undo: bool,
    pub reason: DecisionReason,
}

impl UndoDecision {
    const fn allow(reason: DecisionReason) -> Self {
        Self {
            can_undo: true,
            reason,
        }
    }

    const fn deny(reason: DecisionReason) -> Self {
        Self {
            can_undo: false,
            reason,
        }
    }
}

/// Facts about the entry the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct EntryFacts<'a> {
    pub action_kind: ActionKind,
    pub actor_id: &'a str,
    pub created_at: DateTime<Utc>,
    pub undone: bool,
    /// Branch of the subject, for moderator scoping.
    pub subject_branch: Option<&'a str>,
}

impl<'a> EntryFacts<'a> {
    #[must_use]
    pub fn from_entry(entry: &'a AuditEntry, subject_branch: Option<&'a str>) -> Self {
        Self {
            action_kind: entry.action_kind,
            actor_id: &entry.actor_id,
            created_at: entry.created_at,
            undone: entry.is_undone(),
            subject_branch,
        }
    }
}

/// Whole days elapsed since `created_at`, rounded down.
#[must_use]
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

fn within(window_days: i64, age_days: i64) -> bool {
    age_days <= window_days
}

/// Decide whether `actor` may undo the entry described by `facts` at `now`.
#[must_use]
pub fn evaluate(
    facts: &EntryFacts<'_>,
    actor: &Actor,
    now: DateTime<Utc>,
    policy: &UndoPolicy,
) -> UndoDecision {
    if facts.undone {
        return UndoDecision::deny(DecisionReason::AlreadyUndone);
    }
    if !actor.status.is_active() {
        return UndoDecision::deny(DecisionReason::ActorBlocked);
    }

    let age = age_in_days(facts.created_at, now);

    match facts.action_kind {
        ActionKind::Undo => UndoDecision::deny(DecisionReason::NotUndoable),
        ActionKind::Update | ActionKind::AdminUpdate => {
            if actor.role.is_privileged() {
                return UndoDecision::allow(DecisionReason::Privileged);
            }
            let granted = if actor.id == facts.actor_id {
                DecisionReason::Owner
            } else if moderates_subject(actor, facts.subject_branch) {
                DecisionReason::BranchModerator
            } else {
                return UndoDecision::deny(DecisionReason::NotOwner);
            };
            if within(policy.update_window_days, age) {
                UndoDecision::allow(granted)
            } else {
                UndoDecision::deny(DecisionReason::Expired)
            }
        }
        ActionKind::Delete | ActionKind::CascadeDelete => {
            admin_within(actor, policy.delete_window_days, age)
        }
        ActionKind::RelationshipCreate => {
            admin_within(actor, policy.relationship_create_window_days, age)
        }
        ActionKind::RelationshipDelete => {
            admin_within(actor, policy.relationship_delete_window_days, age)
        }
    }
}

fn moderates_subject(actor: &Actor, subject_branch: Option<&str>) -> bool {
    actor.role == Role::Moderator
        && actor
            .branch_id
            .as_deref()
            .is_some_and(|branch| subject_branch == Some(branch))
}

fn admin_within(actor: &Actor, window_days: i64, age_days: i64) -> UndoDecision {
    if !actor.role.is_privileged() {
        UndoDecision::deny(DecisionReason::InsufficientRole)
    } else if within(window_days, age_days) {
        UndoDecision::allow(DecisionReason::Privileged)
    } else {
        UndoDecision::deny(DecisionReason::Expired)
    }
}
