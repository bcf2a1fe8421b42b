//! Transaction scope for one undo operation.
//!
//! Owns the libSQL transaction, the write gate, and every lock lease taken
//! for the operation. Ending the scope (commit or rollback) drops them all,
//! which is the only way locks are ever released.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use kin_core::enums::EntityKind;
use tokio::sync::MutexGuard;

use crate::locks::{LockLease, row_key};
use crate::service::KinService;
use crate::undo::UndoError;

/// After a reversal inside this scope, the subject's live version `live`
/// carries the content the ledger knew as `stands_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VersionAlias {
    live: i64,
    stands_for: i64,
}

pub(crate) struct UndoScope<'a> {
    // Field order is drop order: the transaction ends before the gate and
    // leases are released.
    tx: libsql::Transaction,
    aliases: HashMap<String, VersionAlias>,
    now: DateTime<Utc>,
    leases: Vec<LockLease>,
    _gate: MutexGuard<'a, ()>,
}

impl<'a> UndoScope<'a> {
    /// Take the write gate and open a transaction, holding `leases` until
    /// the scope ends.
    pub(crate) async fn begin(
        svc: &'a KinService,
        leases: Vec<LockLease>,
    ) -> Result<Self, UndoError> {
        let gate = svc.write_gate().await;
        let tx = svc.db().conn().transaction().await?;
        tracing::debug!(locks = leases.len(), "undo transaction opened");
        Ok(Self {
            tx,
            aliases: HashMap::new(),
            now: Utc::now().trunc_subsecs(6),
            leases,
            _gate: gate,
        })
    }

    pub(crate) fn conn(&self) -> &libsql::Connection {
        &self.tx
    }

    /// Timestamp shared by every write in this scope.
    pub(crate) const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Take a row lock unless this scope already holds it.
    pub(crate) fn lock_row(
        &mut self,
        svc: &KinService,
        kind: EntityKind,
        id: &str,
    ) -> Result<(), UndoError> {
        let key = row_key(kind, id);
        if self.leases.iter().any(|lease| lease.key() == key) {
            return Ok(());
        }
        let lease = svc.locks().try_lock_row(kind, id)?;
        self.leases.push(lease);
        Ok(())
    }

    /// Whether `live` satisfies an entry expecting `expected`, counting
    /// reversals this scope already applied to the subject.
    pub(crate) fn version_matches(
        &self,
        kind: EntityKind,
        id: &str,
        live: i64,
        expected: i64,
    ) -> bool {
        if live == expected {
            return true;
        }
        self.aliases
            .get(&row_key(kind, id))
            .is_some_and(|alias| alias.live == live && alias.stands_for == expected)
    }

    pub(crate) fn record_reversal(&mut self, kind: EntityKind, id: &str, live: i64, stands_for: i64) {
        self.aliases
            .insert(row_key(kind, id), VersionAlias { live, stands_for });
    }

    /// Commit on success, roll back on error. Locks and the gate are
    /// released either way.
    pub(crate) async fn finish<T>(self, result: Result<T, UndoError>) -> Result<T, UndoError> {
        let Self { tx, leases, .. } = self;
        match result {
            Ok(value) => {
                tx.commit().await?;
                tracing::debug!(locks = leases.len(), "undo transaction committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "undo rollback failed");
                }
                Err(e)
            }
        }
    }
}
