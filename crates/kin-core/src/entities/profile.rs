use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A person record in the tree.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub version: i64,
    pub display_name: String,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub gender: Option<String>,
    pub biography: Option<String>,
    pub father_id: Option<String>,
    pub mother_id: Option<String>,
    pub generation: Option<i64>,
    pub branch_id: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Soft-deleted profiles stay in the table with `deleted_at` set.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
