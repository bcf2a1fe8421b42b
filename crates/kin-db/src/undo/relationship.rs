//! Reversal of relationship creation.

use kin_core::responses::UndoReceipt;

use crate::service::KinService;
use crate::undo::UndoError;
use crate::undo::executor::Handler;

impl KinService {
    /// Undo a `relationship_create` entry by soft-deleting the relationship.
    ///
    /// # Errors
    ///
    /// Same as [`KinService::undo_update`], plus `Validation` (`not-live`)
    /// when the relationship is already deleted.
    pub async fn undo_relationship_create(
        &self,
        entry_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<UndoReceipt, UndoError> {
        self.undo_single(
            entry_id,
            actor_id,
            reason,
            Handler::Retract,
            "undo_relationship_create",
        )
        .await
    }
}
