use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ActorStatus, Role};

/// A user acting on the family tree.
///
/// `branch_id` scopes a moderator to one family branch; it is ignored for
/// other roles.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub status: ActorStatus,
    pub branch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
