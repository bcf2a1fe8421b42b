//! The per-entry reversal pipeline shared by every undo operation.

use kin_core::entities::{Actor, AuditEntry};
use kin_core::enums::{ActionKind, AuditState};
use kin_core::ids::PREFIX_AUDIT;
use kin_core::permission::{EntryFacts, evaluate};
use kin_core::responses::{RestoredSubject, UndoReceipt};
use kin_core::snapshot::{
    Restoration, UndoMetadata, expected_live_version, snapshot_version, with_undo_metadata,
};

use crate::generate_id;
use crate::repos::actor::find_actor;
use crate::repos::audit::{entries_in_batch, find_audit, insert_audit, mark_undone};
use crate::repos::entity::{LiveEntity, Tombstone, load_entity, subject_branch, write_entity};
use crate::service::KinService;
use crate::undo::scope::UndoScope;
use crate::undo::{UndoError, codes, normalize_reason};

/// How an entry's forward mutation is reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handler {
    /// Copy whitelisted fields back from `before_snapshot`.
    Restore,
    /// Clear `deleted_at` (and restore whitelisted fields).
    Undelete,
    /// Soft-delete an entity whose creation is being undone.
    Retract,
}

impl Handler {
    pub(crate) const fn for_kind(kind: ActionKind) -> Option<Self> {
        match kind {
            ActionKind::Update | ActionKind::AdminUpdate => Some(Self::Restore),
            ActionKind::Delete | ActionKind::CascadeDelete | ActionKind::RelationshipDelete => {
                Some(Self::Undelete)
            }
            ActionKind::RelationshipCreate => Some(Self::Retract),
            ActionKind::Undo => None,
        }
    }
}

/// Whether the entry stands alone or is reversed with its batch or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Membership {
    Single,
    Collective,
}

/// One reversed entry.
#[derive(Debug, Clone)]
pub(crate) struct Reversal {
    pub reverted_entry_id: String,
    pub undo_entry_id: String,
    pub restored: RestoredSubject,
}

pub(crate) fn receipt(reversals: Vec<Reversal>, undo_batch_id: Option<String>) -> UndoReceipt {
    let mut receipt = UndoReceipt {
        undo_batch_id,
        ..UndoReceipt::default()
    };
    for r in reversals {
        receipt.reverted_entry_ids.push(r.reverted_entry_id);
        receipt.undo_entry_ids.push(r.undo_entry_id);
        receipt.restored.push(r.restored);
    }
    receipt
}

pub(crate) fn wrong_kind(entry: &AuditEntry, operation: &str) -> UndoError {
    UndoError::validation(
        codes::WRONG_KIND,
        format!(
            "entry '{}' is a {} entry; {operation} cannot reverse it",
            entry.id, entry.action_kind
        ),
    )
}

impl KinService {
    /// Load the acting user inside the scope's transaction.
    pub(crate) async fn actor_in(
        &self,
        scope: &UndoScope<'_>,
        actor_id: &str,
    ) -> Result<Actor, UndoError> {
        find_actor(scope.conn(), actor_id)
            .await?
            .ok_or_else(|| UndoError::actor_not_found(actor_id))
    }

    /// Reverse one entry outside any batch: row lock, transaction, reversal.
    pub(crate) async fn undo_single(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
        handler: Handler,
        operation: &'static str,
    ) -> Result<UndoReceipt, UndoError> {
        let entry = {
            let _gate = self.write_gate().await;
            find_audit(self.db().conn(), entry_id)
                .await?
                .ok_or_else(|| UndoError::entry_not_found(entry_id))?
        };
        if Handler::for_kind(entry.action_kind) != Some(handler) {
            return Err(wrong_kind(&entry, operation));
        }

        let lease = self
            .locks()
            .try_lock_row(entry.entity_kind, &entry.subject_id)?;
        let reason = normalize_reason(reason, self.max_reason_chars());
        let mut scope = UndoScope::begin(self, vec![lease]).await?;
        let result = self
            .run_single(&mut scope, entry_id, actor_id, &reason, handler)
            .await;
        let result = scope.finish(result).await;
        log_outcome(operation, entry_id, actor_id, &result);
        result
    }

    async fn run_single(
        &self,
        scope: &mut UndoScope<'_>,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
        handler: Handler,
    ) -> Result<UndoReceipt, UndoError> {
        let actor = self.actor_in(scope, actor_id).await?;
        let reversal = self
            .reverse_entry(scope, entry_id, &actor, reason, handler, Membership::Single, None)
            .await?;
        Ok(receipt(vec![reversal], None))
    }

    /// Reverse one entry inside an open scope.
    ///
    /// Checks run in a fixed order: idempotency, permission, row lock, batch
    /// membership, snapshot validity, version guard, handler preconditions
    /// and referential guard. Only then is anything written.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn reverse_entry(
        &self,
        scope: &mut UndoScope<'_>,
        entry_id: &str,
        actor: &Actor,
        reason: &str,
        handler: Handler,
        membership: Membership,
        undo_batch_id: Option<&str>,
    ) -> Result<Reversal, UndoError> {
        let entry = find_audit(scope.conn(), entry_id)
            .await?
            .ok_or_else(|| UndoError::entry_not_found(entry_id))?;
        if !entry.state().can_transition_to(AuditState::Undone) {
            return Err(UndoError::Idempotency {
                entry_id: entry.id,
            });
        }

        let kind = entry.entity_kind;
        let subject_id = entry.subject_id.as_str();
        let live = load_entity(scope.conn(), kind, subject_id)
            .await?
            .ok_or_else(|| UndoError::subject_not_found(kind, subject_id))?;

        let branch = subject_branch(scope.conn(), &live).await?;
        let decision = evaluate(
            &EntryFacts::from_entry(&entry, branch.as_deref()),
            actor,
            scope.now(),
            self.policy(),
        );
        if !decision.can_undo {
            tracing::warn!(
                entry_id = %entry.id,
                actor_id = %actor.id,
                reason = %decision.reason,
                "undo denied"
            );
            return Err(UndoError::PermissionDenied {
                entry_id: entry.id,
                reason: decision.reason,
            });
        }

        scope.lock_row(self, kind, subject_id)?;

        if membership == Membership::Single {
            if let Some(batch_id) = entry.batch_id.as_deref() {
                let batch = entries_in_batch(scope.conn(), batch_id).await?;
                if batch.len() > 1 {
                    return Err(UndoError::validation(
                        codes::BATCH_MEMBER,
                        format!(
                            "entry '{}' is one of {} entries in batch '{batch_id}'; undo the batch instead",
                            entry.id,
                            batch.len()
                        ),
                    ));
                }
            }
        }

        self.schema()
            .validate_snapshot(kind, &entry.before_snapshot)
            .map_err(|e| UndoError::snapshot_schema(&entry.id, &e))?;
        let restoration = Restoration::from_snapshot(kind, &entry.before_snapshot)
            .map_err(|e| UndoError::invalid_snapshot(&entry.id, &e))?;
        let before_version = snapshot_version(&entry.before_snapshot)
            .map_err(|e| UndoError::invalid_snapshot(&entry.id, &e))?;
        let expected = expected_live_version(&entry.before_snapshot, entry.after_snapshot.as_ref())
            .map_err(|e| UndoError::invalid_snapshot(&entry.id, &e))?;

        if !scope.version_matches(kind, subject_id, live.version(), expected) {
            tracing::warn!(
                entry_id = %entry.id,
                subject_id,
                expected,
                actual = live.version(),
                "undo version conflict"
            );
            return Err(UndoError::VersionConflict {
                entity_kind: kind,
                id: subject_id.to_string(),
                expected,
                actual: live.version(),
            });
        }

        let now = scope.now();
        let (fields, tombstone) = match handler {
            Handler::Restore => {
                self.guard_parents(scope, subject_id, &restoration).await?;
                (Some(&restoration), Tombstone::Keep)
            }
            Handler::Undelete => {
                if !live.is_deleted() {
                    return Err(UndoError::validation(
                        codes::NOT_DELETED,
                        format!("{kind} '{subject_id}' is not deleted"),
                    ));
                }
                if let LiveEntity::Relationship(rel) = &live {
                    self.guard_people(scope, rel).await?;
                }
                (Some(&restoration), Tombstone::Clear)
            }
            Handler::Retract => {
                if live.is_deleted() {
                    return Err(UndoError::validation(
                        codes::NOT_LIVE,
                        format!("{kind} '{subject_id}' is already deleted"),
                    ));
                }
                (None, Tombstone::Set(now))
            }
        };

        let changed = write_entity(
            scope.conn(),
            kind,
            subject_id,
            live.version(),
            fields,
            tombstone,
            now,
        )
        .await?;
        if changed == 0 {
            let actual = load_entity(scope.conn(), kind, subject_id)
                .await?
                .map_or(-1, |e| e.version());
            return Err(UndoError::VersionConflict {
                entity_kind: kind,
                id: subject_id.to_string(),
                expected: live.version(),
                actual,
            });
        }
        let restored = load_entity(scope.conn(), kind, subject_id)
            .await?
            .ok_or_else(|| UndoError::subject_not_found(kind, subject_id))?;
        scope.record_reversal(kind, subject_id, restored.version(), before_version);

        if mark_undone(scope.conn(), &entry.id, now, &actor.id, reason).await? == 0 {
            return Err(UndoError::Idempotency {
                entry_id: entry.id,
            });
        }

        let metadata = UndoMetadata {
            reverts: entry.id.clone(),
            reason: reason.to_string(),
        };
        let undo_entry = AuditEntry {
            id: generate_id(scope.conn(), PREFIX_AUDIT).await?,
            action_kind: ActionKind::Undo,
            entity_kind: kind,
            subject_id: subject_id.to_string(),
            actor_id: actor.id.clone(),
            before_snapshot: live.to_snapshot()?,
            after_snapshot: Some(with_undo_metadata(restored.to_snapshot()?, &metadata)),
            batch_id: undo_batch_id.map(str::to_string),
            group_id: None,
            reverts_entry_id: Some(entry.id.clone()),
            undone_at: None,
            undone_by: None,
            undo_reason: None,
            created_at: now,
        };
        insert_audit(scope.conn(), &undo_entry).await?;

        tracing::debug!(
            entry_id = %entry.id,
            undo_entry_id = %undo_entry.id,
            kind = %kind,
            version = restored.version(),
            "entry reversed"
        );

        Ok(Reversal {
            reverted_entry_id: entry.id,
            undo_entry_id: undo_entry.id,
            restored: RestoredSubject {
                entity_kind: kind,
                id: subject_id.to_string(),
                version: restored.version(),
            },
        })
    }
}

pub(crate) fn log_outcome(
    operation: &str,
    target: &str,
    actor_id: &str,
    result: &Result<UndoReceipt, UndoError>,
) {
    match result {
        Ok(receipt) => tracing::info!(
            operation,
            target,
            actor_id,
            reverted = receipt.reverted_entry_ids.len(),
            "undo committed"
        ),
        Err(e) => tracing::warn!(
            operation,
            target,
            actor_id,
            kind = %e.kind(),
            error = %e,
            "undo rejected"
        ),
    }
}
