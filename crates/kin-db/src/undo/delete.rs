//! Reversal of single deletes.

use kin_core::entities::Relationship;
use kin_core::enums::EntityKind;
use kin_core::responses::UndoReceipt;

use crate::repos::profile::find_profile;
use crate::service::KinService;
use crate::undo::UndoError;
use crate::undo::executor::Handler;
use crate::undo::scope::UndoScope;

impl KinService {
    /// Undo a `delete` (profile) or `relationship_delete` entry by clearing
    /// `deleted_at`.
    ///
    /// Entries belonging to a multi-entry batch are rejected with
    /// `batch-member`; use [`KinService::undo_cascade_delete`] for those.
    ///
    /// # Errors
    ///
    /// Same as [`KinService::undo_update`], plus `Validation` (`not-deleted`)
    /// when the subject is live.
    pub async fn undo_delete(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        self.undo_single(entry_id, actor_id, reason, Handler::Undelete, "undo_delete")
            .await
    }

    /// Both people of an undeleted relationship must be live profiles.
    pub(crate) async fn guard_people(
        &self,
        scope: &mut UndoScope<'_>,
        rel: &Relationship,
    ) -> Result<(), UndoError> {
        for (field, person_id) in [
            ("person_a_id", rel.person_a_id.as_str()),
            ("person_b_id", rel.person_b_id.as_str()),
        ] {
            scope.lock_row(self, EntityKind::Profile, person_id)?;
            let problem = match find_profile(scope.conn(), person_id).await? {
                None => "does not exist",
                Some(person) if person.is_deleted() => "is deleted",
                Some(_) => continue,
            };
            tracing::warn!(relationship_id = %rel.id, field, person_id, problem, "referential guard");
            return Err(UndoError::ReferentialViolation {
                id: rel.id.clone(),
                field: field.to_string(),
                target: person_id.to_string(),
                problem,
            });
        }
        Ok(())
    }
}
