// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded document database backed by redb (pure Rust, ACID).
//!
//! Every collection is a table of `id → JSON document`. redb serializes
//! write transactions, so a closure passed to [`Database::write`] observes
//! and mutates a consistent snapshot and commits all of its writes at once
//! (or none of them if it returns an error).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `usernames`: username → user_id (uniqueness index)
//! - `victims`: victim_id → serialized StoredVictim
//! - `feedback`: feedback_id → serialized StoredFeedback
//! - `rewards`: reward_id → serialized StoredReward
//! - `audit_events`: `micros|event_id` → serialized AuditEvent

use std::path::Path;

use redb::{
    ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// A collection table: document id → JSON bytes.
pub type DocTable = TableDefinition<'static, &'static str, &'static [u8]>;

pub const USERS: DocTable = TableDefinition::new("users");

/// Index: username → user_id. Checked and written inside the same write
/// transaction as the user document.
pub const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

pub const VICTIMS: DocTable = TableDefinition::new("victims");

pub const FEEDBACK: DocTable = TableDefinition::new("feedback");

pub const REWARDS: DocTable = TableDefinition::new("rewards");

/// Audit trail. Keys are zero-padded microsecond timestamps so a forward
/// scan is chronological.
pub const AUDIT_EVENTS: DocTable = TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("developer {0} has already been captured")]
    AlreadyVictim(String),

    #[error("user {user_id} may not modify {resource}")]
    PermissionDenied { user_id: String, resource: String },

    #[error("{0}")]
    InvalidInput(String),
}

impl StorageError {
    /// True for failures of the store itself rather than of the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::Redb(_)
                | StorageError::RedbDatabase(_)
                | StorageError::RedbTransaction(_)
                | StorageError::RedbTable(_)
                | StorageError::RedbStorage(_)
                | StorageError::RedbCommit(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Document access
// =============================================================================

/// Read access to document tables, shared by read and write transactions.
pub trait DocumentReader {
    /// Fetch and decode a single document.
    fn get_doc<T: DeserializeOwned>(&self, table: DocTable, id: &str) -> StorageResult<Option<T>>;

    /// Decode every document in a table, in key order.
    fn scan_docs<T: DeserializeOwned>(&self, table: DocTable) -> StorageResult<Vec<T>>;
}

fn get_from<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    id: &str,
) -> StorageResult<Option<T>> {
    let bytes = table.get(id)?.map(|value| value.value().to_vec());
    Ok(bytes.map(|b| serde_json::from_slice(&b)).transpose()?)
}

fn scan<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> StorageResult<Vec<T>> {
    let mut docs = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        docs.push(serde_json::from_slice(value.value())?);
    }
    Ok(docs)
}

impl DocumentReader for ReadTransaction {
    fn get_doc<T: DeserializeOwned>(&self, table: DocTable, id: &str) -> StorageResult<Option<T>> {
        get_from(&self.open_table(table)?, id)
    }

    fn scan_docs<T: DeserializeOwned>(&self, table: DocTable) -> StorageResult<Vec<T>> {
        scan(&self.open_table(table)?)
    }
}

impl DocumentReader for WriteTransaction {
    fn get_doc<T: DeserializeOwned>(&self, table: DocTable, id: &str) -> StorageResult<Option<T>> {
        get_from(&self.open_table(table)?, id)
    }

    fn scan_docs<T: DeserializeOwned>(&self, table: DocTable) -> StorageResult<Vec<T>> {
        scan(&self.open_table(table)?)
    }
}

/// Serialize and store a document, replacing any previous version.
pub fn put_doc<T: Serialize>(
    txn: &WriteTransaction,
    table: DocTable,
    id: &str,
    doc: &T,
) -> StorageResult<()> {
    let json = serde_json::to_vec(doc)?;
    let mut table = txn.open_table(table)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Remove a document. Returns whether it existed.
pub fn remove_doc(txn: &WriteTransaction, table: DocTable, id: &str) -> StorageResult<bool> {
    let mut table = txn.open_table(table)?;
    let existed = table.remove(id)?.is_some();
    Ok(existed)
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID document database.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = redb::Database::create(path)?;
        Self::init(db)
    }

    /// Create a database that lives only in memory. Used by tests.
    pub fn in_memory() -> StorageResult<Self> {
        let db = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: redb::Database) -> StorageResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(VICTIMS)?;
            let _ = write_txn.open_table(FEEDBACK)?;
            let _ = write_txn.open_table(REWARDS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; on error every
    /// write made by `f` is discarded.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let txn = self.db.begin_write()?;
        match f(&txn) {
            Ok(out) => {
                txn.commit()?;
                Ok(out)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&ReadTransaction) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Verify the store can serve a read transaction.
    pub fn ping(&self) -> StorageResult<()> {
        self.read(|txn| {
            let _ = txn.open_table(USERS)?;
            Ok(())
        })
    }
}
