//! Relationship repository.

use kin_core::entities::Relationship;

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_string, parse_datetime, parse_enum, parse_optional_datetime,
};
use crate::service::KinService;

pub(crate) const RELATIONSHIP_COLUMNS: &str = "id, version, person_a_id, person_b_id, kind, started_on, ended_on, \
     deleted_at, created_at, updated_at";

pub(crate) fn row_to_relationship(row: &libsql::Row) -> Result<Relationship, DatabaseError> {
    Ok(Relationship {
        id: row.get::<String>(0)?,
        version: row.get::<i64>(1)?,
        person_a_id: row.get::<String>(2)?,
        person_b_id: row.get::<String>(3)?,
        kind: parse_enum(&row.get::<String>(4)?)?,
        started_on: get_opt_string(row, 5)?,
        ended_on: get_opt_string(row, 6)?,
        deleted_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

pub(crate) async fn find_relationship(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Relationship>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_relationship(&row)?)),
        None => Ok(None),
    }
}

impl KinService {
    /// Insert a relationship row exactly as given, version included.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails (e.g. unknown person id).
    pub async fn insert_relationship(&self, rel: &Relationship) -> Result<(), DatabaseError> {
        let _gate = self.write_gate().await;
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO relationships ({RELATIONSHIP_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                libsql::params![
                    rel.id.as_str(),
                    rel.version,
                    rel.person_a_id.as_str(),
                    rel.person_b_id.as_str(),
                    rel.kind.as_str(),
                    rel.started_on.as_deref(),
                    rel.ended_on.as_deref(),
                    rel.deleted_at.map(format_datetime),
                    format_datetime(rel.created_at),
                    format_datetime(rel.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a relationship by id, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no relationship has this id.
    pub async fn get_relationship(&self, id: &str) -> Result<Relationship, DatabaseError> {
        let _gate = self.write_gate().await;
        find_relationship(self.db().conn(), id)
            .await?
            .ok_or(DatabaseError::NoResult)
    }

    /// Live relationships touching a profile.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn relationships_of(&self, profile_id: &str) -> Result<Vec<Relationship>, DatabaseError> {
        let _gate = self.write_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
                     WHERE (person_a_id = ?1 OR person_b_id = ?1) AND deleted_at IS NULL
                     ORDER BY created_at, id"
                ),
                [profile_id],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_relationship(&row)?);
        }
        Ok(out)
    }
}
