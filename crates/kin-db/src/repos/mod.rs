//! Repository modules for the entity store and audit ledger.
//!
//! Each module adds public methods to `KinService` via `impl KinService`
//! blocks. Those methods take the write gate. The crate-internal functions
//! beside them take a bare connection so the undo executor can call them
//! inside an open transaction.

pub mod actor;
pub mod audit;
pub(crate) mod entity;
pub mod profile;
pub mod relationship;

pub use audit::AuditFilter;
