//! Keyed, non-blocking locks for undo transactions.
//!
//! Two independent tables: row locks keyed by `<entity_kind>:<id>` and
//! advisory locks keyed by `batch:<id>` / `group:<id>`. Acquisition never
//! waits; a held key fails fast with [`LockContention`]. A [`LockLease`]
//! releases its key when dropped, so a lease held by a transaction scope is
//! released exactly when that scope ends, on commit or rollback alike.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kin_core::enums::EntityKind;

type LockTable = Arc<DashMap<String, u64>>;

/// Which table a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Row,
    Advisory,
}

impl LockKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Advisory => "advisory",
        }
    }
}

/// A lock key is already held by another operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockContention {
    pub kind: LockKind,
    pub key: String,
}

impl fmt::Display for LockContention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lock '{}' is held by another operation", self.kind.as_str(), self.key)
    }
}

impl std::error::Error for LockContention {}

/// Row lock key for an entity.
#[must_use]
pub fn row_key(kind: EntityKind, id: &str) -> String {
    format!("{}:{id}", kind.as_str())
}

#[must_use]
pub fn batch_key(batch_id: &str) -> String {
    format!("batch:{batch_id}")
}

#[must_use]
pub fn group_key(group_id: &str) -> String {
    format!("group:{group_id}")
}

/// Held lock. Dropping it frees the key.
#[derive(Debug)]
pub struct LockLease {
    table: LockTable,
    kind: LockKind,
    key: String,
    token: u64,
}

impl LockLease {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        let token = self.token;
        self.table.remove_if(&self.key, |_, held| *held == token);
        tracing::debug!(kind = self.kind.as_str(), key = %self.key, "lock released");
    }
}

/// Process-local lock tables shared by every operation on one service.
#[derive(Debug, Default)]
pub struct LockManager {
    rows: LockTable,
    advisory: LockTable,
    next_token: AtomicU64,
}

impl LockManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the row lock for one entity without waiting.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` if the row is already locked.
    pub fn try_lock_row(&self, kind: EntityKind, id: &str) -> Result<LockLease, LockContention> {
        self.try_acquire(LockKind::Row, row_key(kind, id))
    }

    /// Take an advisory lock (e.g. `batch:<id>`) without waiting.
    ///
    /// # Errors
    ///
    /// Returns `LockContention` if the key is already locked.
    pub fn try_lock_advisory(&self, key: &str) -> Result<LockLease, LockContention> {
        self.try_acquire(LockKind::Advisory, key.to_string())
    }

    /// Whether a key is currently held.
    #[must_use]
    pub fn is_locked(&self, kind: LockKind, key: &str) -> bool {
        self.table(kind).contains_key(key)
    }

    /// Number of keys held across both tables.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.rows.len() + self.advisory.len()
    }

    const fn table(&self, kind: LockKind) -> &LockTable {
        match kind {
            LockKind::Row => &self.rows,
            LockKind::Advisory => &self.advisory,
        }
    }

    fn try_acquire(&self, kind: LockKind, key: String) -> Result<LockLease, LockContention> {
        let table = self.table(kind);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        match table.entry(key.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(kind = kind.as_str(), key = %key, "lock contention");
                Err(LockContention { kind, key })
            }
            Entry::Vacant(slot) => {
                slot.insert(token);
                tracing::debug!(kind = kind.as_str(), key = %key, "lock acquired");
                Ok(LockLease {
                    table: Arc::clone(table),
                    kind,
                    key,
                    token,
                })
            }
        }
    }
}
