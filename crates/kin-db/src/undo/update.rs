//! Reversal of field updates.

use kin_core::enums::EntityKind;
use kin_core::responses::UndoReceipt;
use kin_core::snapshot::Restoration;

use crate::repos::profile::find_profile;
use crate::service::KinService;
use crate::undo::UndoError;
use crate::undo::executor::Handler;
use crate::undo::scope::UndoScope;

impl KinService {
    /// Undo an `update` or `admin_update` entry by restoring the whitelisted
    /// fields of its `before_snapshot`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the entry, actor or subject does not exist
    /// - `Validation` (`wrong-kind`) for entries that are not updates
    /// - `LockContention` if the subject row is locked
    /// - `Idempotency`, `PermissionDenied`, `VersionConflict`,
    ///   `ReferentialViolation` as checked inside the transaction
    pub async fn undo_update(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        self.undo_single(entry_id, actor_id, reason, Handler::Restore, "undo_update")
            .await
    }

    /// Every non-null parent reference the restoration writes must point at a
    /// live profile. Parents are row-locked for the rest of the scope.
    pub(crate) async fn guard_parents(
        &self,
        scope: &mut UndoScope<'_>,
        subject_id: &str,
        restoration: &Restoration,
    ) -> Result<(), UndoError> {
        if restoration.kind() != EntityKind::Profile {
            return Ok(());
        }
        for (field, parent_id) in restoration.parent_references() {
            scope.lock_row(self, EntityKind::Profile, parent_id)?;
            let problem = match find_profile(scope.conn(), parent_id).await? {
                None => "does not exist",
                Some(parent) if parent.is_deleted() => "is deleted",
                Some(_) => continue,
            };
            tracing::warn!(subject_id, field, parent_id, problem, "referential guard");
            return Err(UndoError::ReferentialViolation {
                id: subject_id.to_string(),
                field: field.to_string(),
                target: parent_id.to_string(),
                problem,
            });
        }
        Ok(())
    }
}
