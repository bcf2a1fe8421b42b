//! Atomic reversal of a cascade delete batch.

use kin_core::entities::AuditEntry;
use kin_core::enums::EntityKind;
use kin_core::ids::PREFIX_BATCH;
use kin_core::responses::UndoReceipt;

use crate::generate_id;
use crate::locks::batch_key;
use crate::repos::audit::{entries_in_batch, find_audit};
use crate::service::KinService;
use crate::undo::executor::{Handler, Membership, log_outcome, receipt, wrong_kind};
use crate::undo::scope::UndoScope;
use crate::undo::{UndoError, normalize_reason};

/// Profiles come back before the relationships that reference them.
pub(crate) fn profiles_first(entries: &mut [AuditEntry]) {
    entries.sort_by_key(|e| e.entity_kind != EntityKind::Profile);
}

impl KinService {
    /// Undo every entry in the batch of `entry_id`, all or nothing.
    ///
    /// An entry without a batch id is treated as a batch of one. The batch
    /// is guarded by the advisory lock `batch:<id>`, taken before the
    /// transaction opens. All undo entries written share a fresh batch id.
    ///
    /// # Errors
    ///
    /// - `LockContention` if the batch (or any member row) is locked
    /// - `Validation` (`wrong-kind`) if any member is not a delete
    /// - any per-member error from the reversal pipeline, which aborts the
    ///   whole batch
    pub async fn undo_cascade_delete(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        let anchor = {
            let _gate = self.write_gate().await;
            find_audit(self.db().conn(), entry_id)
                .await?
                .ok_or_else(|| UndoError::entry_not_found(entry_id))?
        };
        if !anchor.action_kind.is_delete_like() {
            return Err(wrong_kind(&anchor, "undo_cascade_delete"));
        }

        let key = batch_key(anchor.batch_id.as_deref().unwrap_or(&anchor.id));
        let lease = self.locks().try_lock_advisory(&key)?;
        let reason = normalize_reason(reason, self.max_reason_chars());
        let mut scope = UndoScope::begin(self, vec![lease]).await?;
        let result = self.run_cascade(&mut scope, anchor, actor_id, &reason).await;
        let result = scope.finish(result).await;
        log_outcome("undo_cascade_delete", entry_id, actor_id, &result);
        result
    }

    async fn run_cascade(
        &self,
        scope: &mut UndoScope<'_>,
        anchor: AuditEntry,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        let actor = self.actor_in(scope, actor_id).await?;
        let mut members = match anchor.batch_id.as_deref() {
            Some(batch_id) => entries_in_batch(scope.conn(), batch_id).await?,
            None => vec![anchor],
        };
        if let Some(stray) = members.iter().find(|m| !m.action_kind.is_delete_like()) {
            return Err(wrong_kind(stray, "undo_cascade_delete"));
        }
        profiles_first(&mut members);

        let undo_batch_id = if members.len() > 1 {
            Some(generate_id(scope.conn(), PREFIX_BATCH).await?)
        } else {
            None
        };

        let mut reversals = Vec::with_capacity(members.len());
        for member in &members {
            reversals.push(
                self.reverse_entry(
                    scope,
                    &member.id,
                    &actor,
                    reason,
                    Handler::Undelete,
                    Membership::Collective,
                    undo_batch_id.as_deref(),
                )
                .await?,
            );
        }
        Ok(receipt(reversals, undo_batch_id))
    }
}
