//! Shared fixtures for kin-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use chrono::{DateTime, Duration, SubsecRound, Utc};
    use kin_config::UndoConfig;
    use kin_core::entities::{Actor, AuditEntry, Profile, Relationship};
    use kin_core::enums::{ActionKind, ActorStatus, EntityKind, RelationshipKind, Role};
    use serde_json::json;

    use crate::KinDb;
    use crate::service::KinService;

    /// In-memory service with default policy.
    pub async fn test_service() -> KinService {
        let db = KinDb::open_local(":memory:").await.unwrap();
        KinService::from_db(db, &UndoConfig::default())
    }

    /// `n` days before now, truncated to the stored precision.
    pub fn days_ago(n: i64) -> DateTime<Utc> {
        (Utc::now() - Duration::days(n)).trunc_subsecs(6)
    }

    pub fn actor(id: &str, role: Role) -> Actor {
        Actor {
            id: id.into(),
            display_name: id.into(),
            role,
            status: ActorStatus::Active,
            branch_id: None,
            created_at: days_ago(90),
        }
    }

    pub fn profile(id: &str, name: &str) -> Profile {
        let at = days_ago(60);
        Profile {
            id: id.into(),
            version: 1,
            display_name: name.into(),
            birth_date: None,
            death_date: None,
            gender: None,
            biography: None,
            father_id: None,
            mother_id: None,
            generation: None,
            branch_id: None,
            deleted_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn relationship(id: &str, a: &str, b: &str, kind: RelationshipKind) -> Relationship {
        let at = days_ago(60);
        Relationship {
            id: id.into(),
            version: 1,
            person_a_id: a.into(),
            person_b_id: b.into(),
            kind,
            started_on: None,
            ended_on: None,
            deleted_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// A profile entry `age_days` old with a bare `{"version": 1}` before image.
    pub fn ledger_entry(
        id: &str,
        action_kind: ActionKind,
        subject_id: &str,
        actor_id: &str,
        age_days: i64,
    ) -> AuditEntry {
        AuditEntry {
            id: id.into(),
            action_kind,
            entity_kind: EntityKind::Profile,
            subject_id: subject_id.into(),
            actor_id: actor_id.into(),
            before_snapshot: json!({"version": 1}),
            after_snapshot: None,
            batch_id: None,
            group_id: None,
            reverts_entry_id: None,
            undone_at: None,
            undone_by: None,
            undo_reason: None,
            created_at: days_ago(age_days),
        }
    }
}
