//! Kind-generic access to versioned entities.
//!
//! The undo executor treats profiles and relationships alike: load the live
//! row, check its version, write restored columns back with a version bump.

use chrono::{DateTime, Utc};
use kin_core::entities::{Profile, Relationship};
use kin_core::enums::EntityKind;
use kin_core::snapshot::Restoration;

use crate::error::DatabaseError;
use crate::helpers::{entity_kind_to_table, format_datetime, json_to_sql};
use crate::repos::profile::find_profile;
use crate::repos::relationship::find_relationship;

/// A profile or relationship as currently stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LiveEntity {
    Profile(Profile),
    Relationship(Relationship),
}

impl LiveEntity {
    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Profile(p) => &p.id,
            Self::Relationship(r) => &r.id,
        }
    }

    pub(crate) const fn version(&self) -> i64 {
        match self {
            Self::Profile(p) => p.version,
            Self::Relationship(r) => r.version,
        }
    }

    pub(crate) const fn is_deleted(&self) -> bool {
        match self {
            Self::Profile(p) => p.is_deleted(),
            Self::Relationship(r) => r.is_deleted(),
        }
    }

    /// Full JSON image of the row, as stored in undo entry snapshots.
    pub(crate) fn to_snapshot(&self) -> Result<serde_json::Value, DatabaseError> {
        let value = match self {
            Self::Profile(p) => serde_json::to_value(p),
            Self::Relationship(r) => serde_json::to_value(r),
        };
        value.map_err(|e| DatabaseError::InvalidState(format!("snapshot of {}: {e}", self.id())))
    }
}

pub(crate) async fn load_entity(
    conn: &libsql::Connection,
    kind: EntityKind,
    id: &str,
) -> Result<Option<LiveEntity>, DatabaseError> {
    Ok(match kind {
        EntityKind::Profile => find_profile(conn, id).await?.map(LiveEntity::Profile),
        EntityKind::Relationship => find_relationship(conn, id)
            .await?
            .map(LiveEntity::Relationship),
    })
}

/// Family branch used for moderator scoping.
///
/// Relationships carry no branch of their own and are scoped through
/// `person_a_id`.
pub(crate) async fn subject_branch(
    conn: &libsql::Connection,
    entity: &LiveEntity,
) -> Result<Option<String>, DatabaseError> {
    Ok(match entity {
        LiveEntity::Profile(p) => p.branch_id.clone(),
        LiveEntity::Relationship(r) => find_profile(conn, &r.person_a_id)
            .await?
            .and_then(|p| p.branch_id),
    })
}

/// What to do with `deleted_at` when writing an entity back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tombstone {
    Keep,
    Clear,
    Set(DateTime<Utc>),
}

/// Write restored columns and bump the version by one.
///
/// Guarded by `WHERE version = live_version`; returns rows affected, so 0
/// means the row moved underneath the caller.
pub(crate) async fn write_entity(
    conn: &libsql::Connection,
    kind: EntityKind,
    id: &str,
    live_version: i64,
    restoration: Option<&Restoration>,
    tombstone: Tombstone,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let mut sets = Vec::new();
    let mut params: Vec<libsql::Value> = Vec::new();

    if let Some(restoration) = restoration {
        for (field, value) in restoration.fields() {
            params.push(json_to_sql(value)?);
            sets.push(format!("{} = ?{}", field.name, params.len()));
        }
    }
    match tombstone {
        Tombstone::Keep => {}
        Tombstone::Clear => sets.push("deleted_at = NULL".to_string()),
        Tombstone::Set(at) => {
            params.push(libsql::Value::Text(format_datetime(at)));
            sets.push(format!("deleted_at = ?{}", params.len()));
        }
    }
    params.push(libsql::Value::Text(format_datetime(now)));
    sets.push(format!("updated_at = ?{}", params.len()));
    sets.push("version = version + 1".to_string());

    params.push(libsql::Value::Text(id.to_string()));
    let id_idx = params.len();
    params.push(libsql::Value::Integer(live_version));
    let version_idx = params.len();

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{id_idx} AND version = ?{version_idx}",
        entity_kind_to_table(kind),
        sets.join(", ")
    );
    let changed = conn.execute(&sql, libsql::params_from_iter(params)).await?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{days_ago, profile, test_service};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn write_entity_restores_fields_and_bumps_version() {
        let svc = test_service().await;
        let mut p = profile("prf-1", "Y");
        p.version = 2;
        p.biography = Some("new".into());
        svc.insert_profile(&p).await.unwrap();

        let restoration = Restoration::from_snapshot(
            EntityKind::Profile,
            &json!({"version": 1, "display_name": "X", "biography": null, "branch_id": "ignored"}),
        )
        .unwrap();
        let conn = svc.db().conn();
        let changed = write_entity(
            conn,
            EntityKind::Profile,
            "prf-1",
            2,
            Some(&restoration),
            Tombstone::Keep,
            days_ago(0),
        )
        .await
        .unwrap();
        assert_eq!(changed, 1);

        let live = svc.get_profile("prf-1").await.unwrap();
        assert_eq!(live.version, 3);
        assert_eq!(live.display_name, "X");
        assert_eq!(live.biography, None);
        assert_eq!(live.branch_id, None);
    }

    #[tokio::test]
    async fn write_entity_is_guarded_by_version() {
        let svc = test_service().await;
        svc.insert_profile(&profile("prf-1", "Y")).await.unwrap();

        let conn = svc.db().conn();
        let changed = write_entity(
            conn,
            EntityKind::Profile,
            "prf-1",
            7,
            None,
            Tombstone::Set(days_ago(0)),
            days_ago(0),
        )
        .await
        .unwrap();
        assert_eq!(changed, 0);
        assert!(!svc.get_profile("prf-1").await.unwrap().is_deleted());
    }

    #[tokio::test]
    async fn tombstone_set_and_clear() {
        let svc = test_service().await;
        svc.insert_profile(&profile("prf-1", "Y")).await.unwrap();
        let conn = svc.db().conn();

        write_entity(conn, EntityKind::Profile, "prf-1", 1, None, Tombstone::Set(days_ago(0)), days_ago(0))
            .await
            .unwrap();
        let entity = load_entity(conn, EntityKind::Profile, "prf-1").await.unwrap().unwrap();
        assert!(entity.is_deleted());
        assert_eq!(entity.version(), 2);

        write_entity(conn, EntityKind::Profile, "prf-1", 2, None, Tombstone::Clear, days_ago(0))
            .await
            .unwrap();
        let entity = load_entity(conn, EntityKind::Profile, "prf-1").await.unwrap().unwrap();
        assert!(!entity.is_deleted());
        assert_eq!(entity.version(), 3);
        assert_eq!(entity.to_snapshot().unwrap()["version"], 3);
    }
}
