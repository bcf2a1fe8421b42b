//! # kin-core
//!
//! Core types, permission rules, and error types for the Kin undo/audit engine.
//!
//! This crate provides the foundational types shared across all Kin crates:
//! - Entity structs (profiles, relationships, actors, audit entries)
//! - Action/entity/role enums and the audit entry state machine
//! - ID prefix constants
//! - Snapshot whitelists and version extraction
//! - The pure undo permission matrix
//! - Boundary response and error payload types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod permission;
pub mod responses;
pub mod snapshot;
