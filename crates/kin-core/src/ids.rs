//! ID prefix constants.
//!
//! IDs are generated in SQL as `{prefix}-{8 hex chars}` (see `KinDb::generate_id`).

pub const PREFIX_PROFILE: &str = "prf";
pub const PREFIX_RELATIONSHIP: &str = "rel";
pub const PREFIX_ACTOR: &str = "act";
pub const PREFIX_AUDIT: &str = "aud";
pub const PREFIX_BATCH: &str = "bat";
pub const PREFIX_GROUP: &str = "grp";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_PROFILE,
    PREFIX_RELATIONSHIP,
    PREFIX_ACTOR,
    PREFIX_AUDIT,
    PREFIX_BATCH,
    PREFIX_GROUP,
];
