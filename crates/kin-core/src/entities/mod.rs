//! Entity structs for all Kin domain objects.
//!
//! Each entity maps to a table in the libSQL database. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and schema
//! validation.

mod actor;
mod audit;
mod profile;
mod relationship;

pub use actor::Actor;
pub use audit::AuditEntry;
pub use profile::Profile;
pub use relationship::Relationship;
