//! # kin-schema
//!
//! JSON Schema generation and validation for Kin.
//!
//! Entity, snapshot, and response types are defined in `kin-core` with
//! `#[derive(JsonSchema)]`. This crate builds the registry from them and
//! validates audit snapshots before the undo executor trusts their contents.

pub mod error;
pub mod registry;

pub use error::SchemaError;
pub use registry::{SchemaRegistry, snapshot_schema_name};
