//! One-way replication of relational rows into a Firebase Realtime Database.
//!
//! The replica is a convenience copy for dashboards that read Firebase
//! directly. Every push replaces a whole collection node with a JSON object
//! keyed by record id, so a push is idempotent and a missed push is repaired by
//! the next one. Failures are logged by the caller and never surface to HTTP
//! clients.

pub mod firebase;
pub mod snapshot;
pub mod worker;

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::store::StoreError;

pub use firebase::FirebaseRestSink;
pub use snapshot::snapshot_table;
pub use worker::{Replicator, SyncDispatcher, SyncWorker, SyncWorkerHandle};

/// A replicated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Products,
    Suppliers,
    PurchaseOrders,
    SalesOrders,
    Transactions,
}

impl SyncTable {
    pub const ALL: [SyncTable; 5] = [
        SyncTable::Products,
        SyncTable::Suppliers,
        SyncTable::PurchaseOrders,
        SyncTable::SalesOrders,
        SyncTable::Transactions,
    ];

    /// Collection path on the remote side.
    pub fn path(&self) -> &'static str {
        match self {
            SyncTable::Products => "products",
            SyncTable::Suppliers => "suppliers",
            SyncTable::PurchaseOrders => "purchase_orders",
            SyncTable::SalesOrders => "sales_orders",
            SyncTable::Transactions => "transactions",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for SyncTable {
    type Err = ReplicaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncTable::ALL
            .into_iter()
            .find(|t| t.path() == s)
            .ok_or_else(|| ReplicaError::UnknownTable(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    #[error("unknown sync table '{0}'")]
    UnknownTable(String),

    #[error("replica transport error: {0}")]
    Transport(String),

    #[error("replica rejected write to {path} with status {status}: {body}")]
    Rejected {
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to serialize {0} snapshot: {1}")]
    Serialize(SyncTable, String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Destination for collection snapshots.
#[async_trait::async_trait]
pub trait ReplicaSink: Send + Sync {
    /// Replace everything under `path` with `records`.
    async fn replace_collection(
        &self,
        path: &str,
        records: Map<String, Value>,
    ) -> Result<(), ReplicaError>;

    fn name(&self) -> &'static str;
}

/// Sink that discards every write. Used when replication is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReplica;

#[async_trait::async_trait]
impl ReplicaSink for NoopReplica {
    async fn replace_collection(
        &self,
        _path: &str,
        _records: Map<String, Value>,
    ) -> Result<(), ReplicaError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Sink that keeps the latest snapshot per path in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReplica {
    inner: Arc<Mutex<InMemoryReplicaState>>,
}

#[derive(Debug, Default)]
struct InMemoryReplicaState {
    collections: HashMap<String, Map<String, Value>>,
    writes: usize,
    attempts: usize,
    fail_next: Option<String>,
}

impl InMemoryReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, path: &str) -> Option<Map<String, Value>> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.collections.get(path).cloned())
    }

    /// Number of successful `replace_collection` calls so far.
    pub fn writes(&self) -> usize {
        self.inner.lock().map(|s| s.writes).unwrap_or(0)
    }

    /// Number of `replace_collection` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.inner.lock().map(|s| s.attempts).unwrap_or(0)
    }

    /// Make the next write fail with a transport error.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        if let Ok(mut s) = self.inner.lock() {
            s.fail_next = Some(message.into());
        }
    }
}

#[async_trait::async_trait]
impl ReplicaSink for InMemoryReplica {
    async fn replace_collection(
        &self,
        path: &str,
        records: Map<String, Value>,
    ) -> Result<(), ReplicaError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| ReplicaError::Transport("in-memory replica poisoned".into()))?;
        state.attempts += 1;
        if let Some(message) = state.fail_next.take() {
            return Err(ReplicaError::Transport(message));
        }
        state.collections.insert(path.to_string(), records);
        state.writes += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip_through_paths() {
        for table in SyncTable::ALL {
            assert_eq!(table.path().parse::<SyncTable>().unwrap(), table);
        }
        assert!(matches!(
            "invoices".parse::<SyncTable>(),
            Err(ReplicaError::UnknownTable(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_replica_replaces_whole_collection() {
        let replica = InMemoryReplica::new();
        let mut first = Map::new();
        first.insert("a".into(), Value::from(1));
        first.insert("b".into(), Value::from(2));
        replica.replace_collection("products", first).await.unwrap();

        let mut second = Map::new();
        second.insert("c".into(), Value::from(3));
        replica.replace_collection("products", second).await.unwrap();

        let stored = replica.collection("products").unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key("c"));
        assert_eq!(replica.writes(), 2);
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let replica = InMemoryReplica::new();
        replica.fail_next_write("offline");
        assert!(replica.replace_collection("suppliers", Map::new()).await.is_err());
        assert!(replica.replace_collection("suppliers", Map::new()).await.is_ok());
    }
}
