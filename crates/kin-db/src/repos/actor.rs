//! Actor repository.

use kin_core::entities::Actor;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_string, parse_datetime, parse_enum};
use crate::service::KinService;

const ACTOR_COLUMNS: &str = "id, display_name, role, status, branch_id, created_at";

fn row_to_actor(row: &libsql::Row) -> Result<Actor, DatabaseError> {
    Ok(Actor {
        id: row.get::<String>(0)?,
        display_name: row.get::<String>(1)?,
        role: parse_enum(&row.get::<String>(2)?)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        branch_id: get_opt_string(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

pub(crate) async fn find_actor(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Actor>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_actor(&row)?)),
        None => Ok(None),
    }
}

impl KinService {
    /// Insert an actor.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails (e.g. duplicate id).
    pub async fn insert_actor(&self, actor: &Actor) -> Result<(), DatabaseError> {
        let _gate = self.write_gate().await;
        self.db()
            .conn()
            .execute(
                &format!("INSERT INTO actors ({ACTOR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                libsql::params![
                    actor.id.as_str(),
                    actor.display_name.as_str(),
                    actor.role.as_str(),
                    actor.status.as_str(),
                    actor.branch_id.as_deref(),
                    format_datetime(actor.created_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch an actor by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no actor has this id.
    pub async fn get_actor(&self, id: &str) -> Result<Actor, DatabaseError> {
        let _gate = self.write_gate().await;
        find_actor(self.db().conn(), id)
            .await?
            .ok_or(DatabaseError::NoResult)
    }
}
