//! Fixtures for kin-db integration tests.
//!
//! The engine never writes forward mutations itself, so these helpers play
//! the forward path: mutate a row, bump its version, and append the matching
//! ledger entry.

#![allow(dead_code)]

use chrono::{DateTime, Duration, SubsecRound, Utc};
use kin_config::UndoConfig;
use kin_core::entities::{Actor, AuditEntry, Profile, Relationship};
use kin_core::enums::{ActionKind, ActorStatus, EntityKind, RelationshipKind, Role};
use kin_db::helpers::format_datetime;
use kin_db::{KinDb, KinService};
use serde_json::json;

pub async fn service() -> KinService {
    service_with(UndoConfig::default()).await
}

pub async fn service_with(config: UndoConfig) -> KinService {
    let db = KinDb::open_local(":memory:").await.unwrap();
    KinService::from_db(db, &config)
}

pub fn days_ago(n: i64) -> DateTime<Utc> {
    (Utc::now() - Duration::days(n)).trunc_subsecs(6)
}

pub async fn seed_actor(svc: &KinService, id: &str, role: Role) -> Actor {
    seed_actor_with(svc, id, role, ActorStatus::Active, None).await
}

pub async fn seed_actor_with(
    svc: &KinService,
    id: &str,
    role: Role,
    status: ActorStatus,
    branch_id: Option<&str>,
) -> Actor {
    let actor = Actor {
        id: id.into(),
        display_name: id.into(),
        role,
        status,
        branch_id: branch_id.map(str::to_string),
        created_at: days_ago(365),
    };
    svc.insert_actor(&actor).await.unwrap();
    actor
}

pub fn new_profile(id: &str, name: &str) -> Profile {
    let at = days_ago(100);
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

pub async fn seed_profile(svc: &KinService, profile: Profile) -> Profile {
    svc.insert_profile(&profile).await.unwrap();
    profile
}

pub async fn seed_relationship(svc: &KinService, id: &str, a: &str, b: &str) -> Relationship {
    let at = days_ago(100);
    let rel = Relationship {
        id: id.into(),
        version: 1,
        person_a_id: a.into(),
        person_b_id: b.into(),
        kind: RelationshipKind::Spouse,
        started_on: Some("1990-06-01".into()),
        ended_on: None,
        deleted_at: None,
        created_at: at,
        updated_at: at,
    };
    svc.insert_relationship(&rel).await.unwrap();
    rel
}

/// Write every mutable column of a profile, bypassing the engine.
pub async fn overwrite_profile(svc: &KinService, p: &Profile) {
    svc.db()
        .conn()
        .execute(
            "UPDATE profiles SET version = ?2, display_name = ?3, birth_date = ?4, death_date = ?5,
                 gender = ?6, biography = ?7, father_id = ?8, mother_id = ?9, generation = ?10,
                 branch_id = ?11, deleted_at = ?12, updated_at = ?13
             WHERE id = ?1",
            libsql::params![
                p.id.as_str(),
                p.version,
                p.display_name.as_str(),
                p.birth_date.as_deref(),
                p.death_date.as_deref(),
                p.gender.as_deref(),
                p.biography.as_deref(),
                p.father_id.as_deref(),
                p.mother_id.as_deref(),
                p.generation,
                p.branch_id.as_deref(),
                p.deleted_at.map(format_datetime),
                format_datetime(p.updated_at)
            ],
        )
        .await
        .unwrap();
}

pub async fn overwrite_relationship(svc: &KinService, r: &Relationship) {
    svc.db()
        .conn()
        .execute(
            "UPDATE relationships SET version = ?2, kind = ?3, started_on = ?4, ended_on = ?5,
                 deleted_at = ?6, updated_at = ?7
             WHERE id = ?1",
            libsql::params![
                r.id.as_str(),
                r.version,
                r.kind.as_str(),
                r.started_on.as_deref(),
                r.ended_on.as_deref(),
                r.deleted_at.map(format_datetime),
                format_datetime(r.updated_at)
            ],
        )
        .await
        .unwrap();
}

fn entry(
    id: &str,
    action_kind: ActionKind,
    entity_kind: EntityKind,
    subject_id: &str,
    actor_id: &str,
    age_days: i64,
) -> AuditEntry {
    AuditEntry {
        id: id.into(),
        action_kind,
        entity_kind,
        subject_id: subject_id.into(),
        actor_id: actor_id.into(),
        before_snapshot: json!({}),
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

/// Options for a simulated forward mutation.
#[derive(Debug, Clone, Default)]
pub struct Forward<'a> {
    pub age_days: i64,
    pub batch_id: Option<&'a str>,
    pub group_id: Option<&'a str>,
    /// Record `after_snapshot`; deletes usually leave it out.
    pub with_after: bool,
}

/// Edit a profile the way the forward path would and log it.
pub async fn forward_update(
    svc: &KinService,
    entry_id: &str,
    profile_id: &str,
    actor_id: &str,
    opts: Forward<'_>,
    edit: impl FnOnce(&mut Profile),
) -> AuditEntry {
    let before = svc.get_profile(profile_id).await.unwrap();
    let mut after = before.clone();
    edit(&mut after);
    after.version = before.version + 1;
    after.updated_at = days_ago(opts.age_days);
    overwrite_profile(svc, &after).await;

    let mut e = entry(
        entry_id,
        ActionKind::Update,
        EntityKind::Profile,
        profile_id,
        actor_id,
        opts.age_days,
    );
    e.before_snapshot = serde_json::to_value(&before).unwrap();
    e.after_snapshot = Some(serde_json::to_value(&after).unwrap());
    e.batch_id = opts.batch_id.map(str::to_string);
    e.group_id = opts.group_id.map(str::to_string);
    svc.append_audit(&e).await.unwrap();
    e
}

/// Soft-delete a profile and log it.
pub async fn forward_delete(
    svc: &KinService,
    entry_id: &str,
    profile_id: &str,
    actor_id: &str,
    action_kind: ActionKind,
    opts: Forward<'_>,
) -> AuditEntry {
    let before = svc.get_profile(profile_id).await.unwrap();
    let mut after = before.clone();
    after.version = before.version + 1;
    after.deleted_at = Some(days_ago(opts.age_days));
    overwrite_profile(svc, &after).await;

    let mut e = entry(
        entry_id,
        action_kind,
        EntityKind::Profile,
        profile_id,
        actor_id,
        opts.age_days,
    );
    e.before_snapshot = serde_json::to_value(&before).unwrap();
    if opts.with_after {
        e.after_snapshot = Some(serde_json::to_value(&after).unwrap());
    }
    e.batch_id = opts.batch_id.map(str::to_string);
    e.group_id = opts.group_id.map(str::to_string);
    svc.append_audit(&e).await.unwrap();
    e
}

/// Soft-delete a relationship and log it.
pub async fn forward_relationship_delete(
    svc: &KinService,
    entry_id: &str,
    rel_id: &str,
    actor_id: &str,
    opts: Forward<'_>,
) -> AuditEntry {
    let before = svc.get_relationship(rel_id).await.unwrap();
    let mut after = before.clone();
    after.version = before.version + 1;
    after.deleted_at = Some(days_ago(opts.age_days));
    overwrite_relationship(svc, &after).await;

    let mut e = entry(
        entry_id,
        ActionKind::RelationshipDelete,
        EntityKind::Relationship,
        rel_id,
        actor_id,
        opts.age_days,
    );
    e.before_snapshot = serde_json::to_value(&before).unwrap();
    e.batch_id = opts.batch_id.map(str::to_string);
    e.group_id = opts.group_id.map(str::to_string);
    svc.append_audit(&e).await.unwrap();
    e
}

/// Edit a relationship the way the forward path would and log it.
pub async fn forward_relationship_update(
    svc: &KinService,
    entry_id: &str,
    rel_id: &str,
    actor_id: &str,
    opts: Forward<'_>,
    edit: impl FnOnce(&mut Relationship),
) -> AuditEntry {
    let before = svc.get_relationship(rel_id).await.unwrap();
    let mut after = before.clone();
    edit(&mut after);
    after.version = before.version + 1;
    after.updated_at = days_ago(opts.age_days);
    overwrite_relationship(svc, &after).await;

    let mut e = entry(
        entry_id,
        ActionKind::Update,
        EntityKind::Relationship,
        rel_id,
        actor_id,
        opts.age_days,
    );
    e.before_snapshot = serde_json::to_value(&before).unwrap();
    e.after_snapshot = Some(serde_json::to_value(&after).unwrap());
    e.group_id = opts.group_id.map(str::to_string);
    svc.append_audit(&e).await.unwrap();
    e
}

/// Create a relationship and log it.
pub async fn forward_relationship_create(
    svc: &KinService,
    entry_id: &str,
    rel_id: &str,
    a: &str,
    b: &str,
    actor_id: &str,
    opts: Forward<'_>,
) -> AuditEntry {
    let rel = seed_relationship(svc, rel_id, a, b).await;
    let mut e = entry(
        entry_id,
        ActionKind::RelationshipCreate,
        EntityKind::Relationship,
        rel_id,
        actor_id,
        opts.age_days,
    );
    e.before_snapshot = json!({"version": 0});
    e.after_snapshot = Some(serde_json::to_value(&rel).unwrap());
    e.group_id = opts.group_id.map(str::to_string);
    svc.append_audit(&e).await.unwrap();
    e
}
