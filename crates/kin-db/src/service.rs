//! Service layer owning the database, schema registry, policy and locks.
//!
//! `KinService` wraps `KinDb` (raw database access), `SchemaRegistry`
//! (snapshot validation), the configured `UndoPolicy`, and the `LockManager`.
//! Store methods live in `repos` and undo operations in `undo`, both as
//! `impl KinService` blocks.

use kin_config::UndoConfig;
use kin_core::permission::UndoPolicy;
use kin_schema::SchemaRegistry;
use tokio::sync::{Mutex, MutexGuard};

use crate::KinDb;
use crate::error::DatabaseError;
use crate::locks::LockManager;

/// Entry point for every store and undo operation.
///
/// libSQL serves one writer per connection, so statements and transactions
/// are serialised through a write gate. The gate is taken only after any
/// fail-fast lock an operation needs, and released when the operation ends.
pub struct KinService {
    db: KinDb,
    schema: SchemaRegistry,
    policy: UndoPolicy,
    max_reason_chars: usize,
    locks: LockManager,
    gate: Mutex<()>,
}

impl KinService {
    /// Create a new service over a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    /// * `undo` - Permission windows and reason cap.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or the undo
    /// configuration is invalid.
    pub async fn new_local(db_path: &str, undo: &UndoConfig) -> Result<Self, DatabaseError> {
        undo.validate()
            .map_err(|e| DatabaseError::InvalidState(e.to_string()))?;
        let db = KinDb::open_local(db_path).await?;
        Ok(Self::from_db(db, undo))
    }

    /// Create from an existing `KinDb`.
    #[must_use]
    pub fn from_db(db: KinDb, undo: &UndoConfig) -> Self {
        Self {
            db,
            schema: SchemaRegistry::new(),
            policy: undo.policy(),
            max_reason_chars: undo.max_reason_chars.max(1),
            locks: LockManager::new(),
            gate: Mutex::new(()),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &KinDb {
        &self.db
    }

    /// Access the schema registry.
    #[must_use]
    pub const fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    #[must_use]
    pub const fn policy(&self) -> &UndoPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn max_reason_chars(&self) -> usize {
        self.max_reason_chars
    }

    #[must_use]
    pub const fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Wait for exclusive use of the connection.
    pub(crate) async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}
