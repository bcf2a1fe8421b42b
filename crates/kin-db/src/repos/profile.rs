//! Profile repository.

use kin_core::entities::Profile;

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_string, parse_datetime, parse_optional_datetime,
};
use crate::service::KinService;

pub(crate) const PROFILE_COLUMNS: &str = "id, version, display_name, birth_date, death_date, gender, biography, \
     father_id, mother_id, generation, branch_id, deleted_at, created_at, updated_at";

pub(crate) fn row_to_profile(row: &libsql::Row) -> Result<Profile, DatabaseError> {
    Ok(Profile {
        id: row.get::<String>(0)?,
        version: row.get::<i64>(1)?,
        display_name: row.get::<String>(2)?,
        birth_date: get_opt_string(row, 3)?,
        death_date: get_opt_string(row, 4)?,
        gender: get_opt_string(row, 5)?,
        biography: get_opt_string(row, 6)?,
        father_id: get_opt_string(row, 7)?,
        mother_id: get_opt_string(row, 8)?,
        generation: row.get::<Option<i64>>(9)?,
        branch_id: get_opt_string(row, 10)?,
        deleted_at: parse_optional_datetime(get_opt_string(row, 11)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(12)?)?,
        updated_at: parse_datetime(&row.get::<String>(13)?)?,
    })
}

pub(crate) async fn find_profile(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Profile>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_profile(&row)?)),
        None => Ok(None),
    }
}

impl KinService {
    /// Insert a profile row exactly as given, version included.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        let _gate = self.write_gate().await;
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO profiles ({PROFILE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                libsql::params![
                    profile.id.as_str(),
                    profile.version,
                    profile.display_name.as_str(),
                    profile.birth_date.as_deref(),
                    profile.death_date.as_deref(),
                    profile.gender.as_deref(),
                    profile.biography.as_deref(),
                    profile.father_id.as_deref(),
                    profile.mother_id.as_deref(),
                    profile.generation,
                    profile.branch_id.as_deref(),
                    profile.deleted_at.map(format_datetime),
                    format_datetime(profile.created_at),
                    format_datetime(profile.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a profile by id, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no profile has this id.
    pub async fn get_profile(&self, id: &str) -> Result<Profile, DatabaseError> {
        let _gate = self.write_gate().await;
        find_profile(self.db().conn(), id)
            .await?
            .ok_or(DatabaseError::NoResult)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::{profile, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn insert_and_get_profile() {
        let svc = test_service().await;
        let mut p = profile("prf-1", "Ada");
        p.version = 4;
        p.father_id = Some("prf-dad".into());
        p.generation = Some(2);
        svc.insert_profile(&p).await.unwrap();

        let loaded = svc.get_profile("prf-1").await.unwrap();
        assert_eq!(loaded, p);
        assert!(!loaded.is_deleted());
    }

    #[tokio::test]
    async fn deleted_profiles_are_still_readable() {
        let svc = test_service().await;
        let mut p = profile("prf-gone", "Gone");
        p.deleted_at = Some(p.created_at);
        svc.insert_profile(&p).await.unwrap();

        let loaded = svc.get_profile("prf-gone").await.unwrap();
        assert!(loaded.is_deleted());
    }
}
