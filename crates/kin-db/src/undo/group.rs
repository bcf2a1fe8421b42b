//! Atomic reversal of an operation group.

use std::collections::HashSet;

use kin_core::entities::AuditEntry;
use kin_core::ids::PREFIX_BATCH;
use kin_core::permission::DecisionReason;
use kin_core::responses::UndoReceipt;

use crate::generate_id;
use crate::locks::group_key;
use crate::repos::audit::{entries_in_batch, entries_in_group};
use crate::service::KinService;
use crate::undo::cascade::profiles_first;
use crate::undo::executor::{Handler, Membership, log_outcome, receipt};
use crate::undo::scope::UndoScope;
use crate::undo::{UndoError, codes, normalize_reason};

/// Newest first, except that a batch inside the group is reversed as one
/// unit (profiles first) at the position of its newest member.
pub(crate) fn reversal_order(newest_first: Vec<AuditEntry>) -> Vec<AuditEntry> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(newest_first.len());
    for entry in &newest_first {
        match entry.batch_id.as_deref() {
            None => ordered.push(entry.clone()),
            Some(batch_id) => {
                if seen.insert(batch_id.to_string()) {
                    let mut batch: Vec<AuditEntry> = newest_first
                        .iter()
                        .filter(|e| e.batch_id.as_deref() == Some(batch_id))
                        .cloned()
                        .collect();
                    profiles_first(&mut batch);
                    ordered.extend(batch);
                }
            }
        }
    }
    ordered
}

/// Every batch touched by the group must lie entirely inside it.
async fn ensure_whole_batches(
    scope: &UndoScope<'_>,
    group_id: &str,
    members: &[AuditEntry],
) -> Result<(), UndoError> {
    let mut checked = HashSet::new();
    for batch_id in members.iter().filter_map(|m| m.batch_id.as_deref()) {
        if !checked.insert(batch_id) {
            continue;
        }
        let batch = entries_in_batch(scope.conn(), batch_id).await?;
        if let Some(outside) = batch
            .iter()
            .find(|e| e.group_id.as_deref() != Some(group_id))
        {
            return Err(UndoError::validation(
                codes::PARTIAL_BATCH,
                format!(
                    "batch '{batch_id}' of group '{group_id}' also contains entry '{}'",
                    outside.id
                ),
            ));
        }
    }
    Ok(())
}

impl KinService {
    /// Undo every entry tagged with `group_id`, newest first, all or nothing.
    ///
    /// Guarded by the advisory lock `group:<id>`. Any member that is already
    /// undone, denied, conflicting or invalid aborts the whole group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no entry carries the group id
    /// - `LockContention` if the group (or any member row) is locked
    /// - `Validation` (`partial-batch`) if a member's batch has entries
    ///   outside the group
    /// - any per-member error from the reversal pipeline
    pub async fn undo_operation_group(
        &self,
        group_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        let lease = self.locks().try_lock_advisory(&group_key(group_id))?;
        let reason = normalize_reason(reason, self.max_reason_chars());
        let mut scope = UndoScope::begin(self, vec![lease]).await?;
        let result = self.run_group(&mut scope, group_id, actor_id, &reason).await;
        let result = scope.finish(result).await;
        log_outcome("undo_operation_group", group_id, actor_id, &result);
        result
    }

    async fn run_group(
        &self,
        scope: &mut UndoScope<'_>,
        group_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        let members = entries_in_group(scope.conn(), group_id).await?;
        if members.is_empty() {
            return Err(UndoError::NotFound {
                entity_type: "operation group",
                id: group_id.to_string(),
            });
        }
        let actor = self.actor_in(scope, actor_id).await?;
        ensure_whole_batches(scope, group_id, &members).await?;

        let ordered = reversal_order(members);
        let undo_batch_id = if ordered.len() > 1 {
            Some(generate_id(scope.conn(), PREFIX_BATCH).await?)
        } else {
            None
        };

        let mut reversals = Vec::with_capacity(ordered.len());
        for member in &ordered {
            let handler =
                Handler::for_kind(member.action_kind).ok_or_else(|| UndoError::PermissionDenied {
                    entry_id: member.id.clone(),
                    reason: DecisionReason::NotUndoable,
                })?;
            reversals.push(
                self.reverse_entry(
                    scope,
                    &member.id,
                    &actor,
                    reason,
                    handler,
                    Membership::Collective,
                    undo_batch_id.as_deref(),
                )
                .await?,
            );
        }
        Ok(receipt(reversals, undo_batch_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::ledger_entry;
    use kin_core::enums::{ActionKind, EntityKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn batches_are_kept_together_profiles_first() {
        let newest = ledger_entry("aud-4", ActionKind::Update, "prf-9", "act-1", 0);
        let mut rel = ledger_entry("aud-3", ActionKind::RelationshipDelete, "rel-1", "act-1", 1);
        rel.entity_kind = EntityKind::Relationship;
        rel.batch_id = Some("bat-1".into());
        let other = ledger_entry("aud-2", ActionKind::Update, "prf-8", "act-1", 2);
        let mut prof = ledger_entry("aud-1", ActionKind::CascadeDelete, "prf-1", "act-1", 3);
        prof.batch_id = Some("bat-1".into());

        let ordered = reversal_order(vec![newest, rel, other, prof]);
        let ids: Vec<&str> = ordered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["aud-4", "aud-1", "aud-3", "aud-2"]);
    }
}
