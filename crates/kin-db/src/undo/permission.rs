//! Advisory permission check.

use chrono::Utc;
use kin_core::permission::{EntryFacts, UndoDecision, evaluate};

use crate::repos::actor::find_actor;
use crate::repos::audit::find_audit;
use crate::repos::entity::{load_entity, subject_branch};
use crate::service::KinService;
use crate::undo::UndoError;

impl KinService {
    /// Whether `actor_id` may undo `entry_id` right now.
    ///
    /// Advisory only: the undo operations repeat the check inside their
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry or the actor does not exist.
    pub async fn check_undo_permission(
        &self,
        entry_id: &str,
        actor_id: &str,
    ) -> Result<UndoDecision, UndoError> {
        let _gate = self.write_gate().await;
        let conn = self.db().conn();
        let entry = find_audit(conn, entry_id)
            .await?
            .ok_or_else(|| UndoError::entry_not_found(entry_id))?;
        let actor = find_actor(conn, actor_id)
            .await?
            .ok_or_else(|| UndoError::actor_not_found(actor_id))?;
        let branch = match load_entity(conn, entry.entity_kind, &entry.subject_id).await? {
            Some(subject) => subject_branch(conn, &subject).await?,
            None => None,
        };

        let decision = evaluate(
            &EntryFacts::from_entry(&entry, branch.as_deref()),
            &actor,
            Utc::now(),
            self.policy(),
        );
        tracing::debug!(
            entry_id,
            actor_id,
            can_undo = decision.can_undo,
            reason = %decision.reason,
            "undo permission checked"
        );
        Ok(decision)
    }
}
