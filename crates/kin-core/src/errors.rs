//! Cross-cutting error types for Kin.
//!
//! Errors raised while interpreting domain data such as snapshots. Storage
//! errors live in `kin-db`, and the undo taxonomy that crosses the engine
//! boundary is `kin_db::undo::UndoError`.

use thiserror::Error;

/// Errors raised by kin-core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),
}
