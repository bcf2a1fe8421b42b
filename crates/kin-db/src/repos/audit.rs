//! Audit ledger repository.
//!
//! Append-mostly entries recording every mutation. The only in-place change
//! an entry ever sees is the one-time undone marker set by the undo executor.

use chrono::{DateTime, Utc};
use kin_core::entities::AuditEntry;
use kin_core::enums::{ActionKind, EntityKind};

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_string, parse_datetime, parse_enum, parse_json,
    parse_optional_datetime, parse_optional_json,
};
use crate::service::KinService;

const AUDIT_COLUMNS: &str = "id, action_kind, entity_kind, subject_id, actor_id, before_snapshot, \
     after_snapshot, batch_id, group_id, reverts_entry_id, undone_at, undone_by, undo_reason, created_at";

/// Newest first; rowid breaks ties between entries written in the same instant.
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

/// Filter criteria for audit queries.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub entity_kind: Option<EntityKind>,
    pub subject_id: Option<String>,
    pub actor_id: Option<String>,
    pub action_kind: Option<ActionKind>,
    pub batch_id: Option<String>,
    pub group_id: Option<String>,
    /// `Some(true)` for undone entries only, `Some(false)` for active only.
    pub undone: Option<bool>,
    pub limit: Option<u32>,
}

fn row_to_entry(row: &libsql::Row) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.get::<String>(0)?,
        action_kind: parse_enum(&row.get::<String>(1)?)?,
        entity_kind: parse_enum(&row.get::<String>(2)?)?,
        subject_id: row.get::<String>(3)?,
        actor_id: row.get::<String>(4)?,
        before_snapshot: parse_json(&row.get::<String>(5)?)?,
        after_snapshot: parse_optional_json(get_opt_string(row, 6)?.as_deref())?,
        batch_id: get_opt_string(row, 7)?,
        group_id: get_opt_string(row, 8)?,
        reverts_entry_id: get_opt_string(row, 9)?,
        undone_at: parse_optional_datetime(get_opt_string(row, 10)?.as_deref())?,
        undone_by: get_opt_string(row, 11)?,
        // An empty reason is a valid reason, so read it raw.
        undo_reason: row.get::<Option<String>>(12)?,
        created_at: parse_datetime(&row.get::<String>(13)?)?,
    })
}

async fn collect_entries(mut rows: libsql::Rows) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut entries = Vec::new();
    while let Some(row) = rows.next().await? {
        entries.push(row_to_entry(&row)?);
    }
    Ok(entries)
}

pub(crate) async fn insert_audit(
    conn: &libsql::Connection,
    entry: &AuditEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO audit_entries ({AUDIT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        libsql::params![
            entry.id.as_str(),
            entry.action_kind.as_str(),
            entry.entity_kind.as_str(),
            entry.subject_id.as_str(),
            entry.actor_id.as_str(),
            entry.before_snapshot.to_string(),
            entry.after_snapshot.as_ref().map(std::string::ToString::to_string),
            entry.batch_id.as_deref(),
            entry.group_id.as_deref(),
            entry.reverts_entry_id.as_deref(),
            entry.undone_at.map(format_datetime),
            entry.undone_by.as_deref(),
            entry.undo_reason.as_deref(),
            format_datetime(entry.created_at)
        ],
    )
    .await?;
    Ok(())
}

pub(crate) async fn find_audit(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<AuditEntry>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {AUDIT_COLUMNS} FROM audit_entries WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_entry(&row)?)),
        None => Ok(None),
    }
}

/// All entries sharing a batch id, oldest first.
pub(crate) async fn entries_in_batch(
    conn: &libsql::Connection,
    batch_id: &str,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_entries WHERE batch_id = ?1
                 ORDER BY created_at, rowid"
            ),
            [batch_id],
        )
        .await?;
    collect_entries(rows).await
}

/// All entries sharing a group id, newest first.
pub(crate) async fn entries_in_group(
    conn: &libsql::Connection,
    group_id: &str,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let rows = conn
        .query(
            &format!("SELECT {AUDIT_COLUMNS} FROM audit_entries WHERE group_id = ?1 {NEWEST_FIRST}"),
            [group_id],
        )
        .await?;
    collect_entries(rows).await
}

/// Set the undone marker. Returns the number of rows changed, which is 0 when
/// another transaction got there first.
pub(crate) async fn mark_undone(
    conn: &libsql::Connection,
    id: &str,
    undone_at: DateTime<Utc>,
    undone_by: &str,
    reason: &str,
) -> Result<u64, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE audit_entries SET undone_at = ?1, undone_by = ?2, undo_reason = ?3
             WHERE id = ?4 AND undone_at IS NULL",
            libsql::params![format_datetime(undone_at), undone_by, reason, id],
        )
        .await?;
    Ok(changed)
}

impl KinService {
    /// Append an audit entry, as the forward mutation path does.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn append_audit(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        let _gate = self.write_gate().await;
        insert_audit(self.db().conn(), entry).await
    }

    /// Fetch one audit entry.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no entry has this id.
    pub async fn get_audit_entry(&self, id: &str) -> Result<AuditEntry, DatabaseError> {
        let _gate = self.write_gate().await;
        find_audit(self.db().conn(), id)
            .await?
            .ok_or(DatabaseError::NoResult)
    }

    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(kind) = filter.entity_kind {
            params.push(libsql::Value::Text(kind.as_str().to_string()));
            conditions.push(format!("entity_kind = ?{}", params.len()));
        }
        if let Some(ref sid) = filter.subject_id {
            params.push(libsql::Value::Text(sid.clone()));
            conditions.push(format!("subject_id = ?{}", params.len()));
        }
        if let Some(ref aid) = filter.actor_id {
            params.push(libsql::Value::Text(aid.clone()));
            conditions.push(format!("actor_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action_kind {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action_kind = ?{}", params.len()));
        }
        if let Some(ref bid) = filter.batch_id {
            params.push(libsql::Value::Text(bid.clone()));
            conditions.push(format!("batch_id = ?{}", params.len()));
        }
        if let Some(ref gid) = filter.group_id {
            params.push(libsql::Value::Text(gid.clone()));
            conditions.push(format!("group_id = ?{}", params.len()));
        }
        match filter.undone {
            Some(true) => conditions.push("undone_at IS NOT NULL".to_string()),
            Some(false) => conditions.push("undone_at IS NULL".to_string()),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_entries {where_clause} {NEWEST_FIRST} LIMIT {limit}"
        );

        let _gate = self.write_gate().await;
        let rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        collect_entries(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{days_ago, ledger_entry, test_service};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn append_and_get_round_trips_snapshots() {
        let svc = test_service().await;
        let mut entry = ledger_entry("aud-1", ActionKind::Update, "prf-1", "act-1", 2);
        entry.before_snapshot = json!({"version": 1, "display_name": "X"});
        entry.after_snapshot = Some(json!({"version": 2, "display_name": "Y"}));
        svc.append_audit(&entry).await.unwrap();

        assert_eq!(svc.get_audit_entry("aud-1").await.unwrap(), entry);
    }

    #[tokio::test]
    async fn query_filters_and_orders_newest_first() {
        let svc = test_service().await;
        let mut old = ledger_entry("aud-old", ActionKind::Update, "prf-1", "act-1", 5);
        old.group_id = Some("grp-1".into());
        let mut new = ledger_entry("aud-new", ActionKind::Update, "prf-1", "act-2", 1);
        new.group_id = Some("grp-1".into());
        let other = ledger_entry("aud-other", ActionKind::Delete, "prf-2", "act-1", 0);
        for e in [&old, &new, &other] {
            svc.append_audit(e).await.unwrap();
        }

        let by_subject = svc
            .query_audit(&AuditFilter {
                subject_id: Some("prf-1".into()),
                ..AuditFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = by_subject.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["aud-new", "aud-old"]);

        let deletes = svc
            .query_audit(&AuditFilter {
                action_kind: Some(ActionKind::Delete),
                ..AuditFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].id, "aud-other");

        let limited = svc
            .query_audit(&AuditFilter {
                limit: Some(1),
                ..AuditFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn mark_undone_only_once() {
        let svc = test_service().await;
        svc.append_audit(&ledger_entry("aud-1", ActionKind::Update, "prf-1", "act-1", 0))
            .await
            .unwrap();
        let conn = svc.db().conn();
        let now = days_ago(0);

        assert_eq!(mark_undone(conn, "aud-1", now, "act-9", "").await.unwrap(), 1);
        assert_eq!(mark_undone(conn, "aud-1", now, "act-9", "again").await.unwrap(), 0);

        let entry = svc.get_audit_entry("aud-1").await.unwrap();
        assert!(entry.is_undone());
        assert_eq!(entry.undo_reason.as_deref(), Some(""));
        assert_eq!(entry.undone_by.as_deref(), Some("act-9"));

        let active = svc
            .query_audit(&AuditFilter {
                undone: Some(false),
                ..AuditFilter::default()
            })
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn batch_and_group_lookups() {
        let svc = test_service().await;
        let mut a = ledger_entry("aud-a", ActionKind::CascadeDelete, "prf-1", "act-1", 2);
        a.batch_id = Some("bat-1".into());
        let mut b = ledger_entry("aud-b", ActionKind::RelationshipDelete, "rel-1", "act-1", 2);
        b.entity_kind = EntityKind::Relationship;
        b.batch_id = Some("bat-1".into());
        svc.append_audit(&a).await.unwrap();
        svc.append_audit(&b).await.unwrap();

        let conn = svc.db().conn();
        let batch = entries_in_batch(conn, "bat-1").await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(entries_in_group(conn, "grp-none").await.unwrap().is_empty());
    }
}
