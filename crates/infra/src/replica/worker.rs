//! Background replication worker.
//!
//! Request handlers enqueue the tables they touched through a
//! [`SyncDispatcher`] and return immediately. A single [`SyncWorker`] task
//! drains the queue, coalesces tables queued close together, and pushes a
//! fresh snapshot of each one. Errors are logged and dropped; the next
//! successful push of the same table brings the replica back in line.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{ReplicaError, ReplicaSink, SyncTable, snapshot_table};
use crate::store::Store;

/// Snapshots tables from a store and pushes them to a sink.
#[derive(Clone)]
pub struct Replicator {
    store: Arc<dyn Store>,
    sink: Arc<dyn ReplicaSink>,
}

impl core::fmt::Debug for Replicator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Replicator")
            .field("store", &self.store.backend())
            .field("sink", &self.sink.name())
            .finish()
    }
}

impl Replicator {
    pub fn new(store: Arc<dyn Store>, sink: Arc<dyn ReplicaSink>) -> Self {
        Self { store, sink }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Push one table; returns the number of records written.
    #[instrument(skip(self), fields(sink = self.sink.name()), err)]
    pub async fn sync_table(&self, table: SyncTable) -> Result<usize, ReplicaError> {
        let records = {
            let mut uow = self.store.begin().await?;
            snapshot_table(uow.as_mut(), table).await?
            // read-only; dropping the unit of work releases it
        };
        let count = records.len();
        self.sink.replace_collection(table.path(), records).await?;
        debug!(%table, count, "table replicated");
        Ok(count)
    }

    /// Push several tables in order, stopping at the first failure.
    pub async fn sync_tables(
        &self,
        tables: &[SyncTable],
    ) -> Result<BTreeMap<SyncTable, usize>, ReplicaError> {
        let mut counts = BTreeMap::new();
        for table in tables {
            counts.insert(*table, self.sync_table(*table).await?);
        }
        Ok(counts)
    }
}

/// Cheap handle for queueing replication work.
#[derive(Debug, Clone, Default)]
pub struct SyncDispatcher {
    tx: Option<mpsc::UnboundedSender<Vec<SyncTable>>>,
}

impl SyncDispatcher {
    /// A dispatcher with no worker behind it; every enqueue is dropped.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `tables` for replication. Never blocks.
    pub fn enqueue(&self, tables: impl IntoIterator<Item = SyncTable>) {
        let Some(tx) = &self.tx else {
            return;
        };
        let batch: Vec<SyncTable> = tables.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        if tx.send(batch).is_err() {
            debug!("sync worker stopped; dropping replication request");
        }
    }
}

/// Handle to stop and join the worker task.
#[derive(Debug)]
pub struct SyncWorkerHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SyncWorkerHandle {
    /// Request graceful shutdown and wait until every queued table is pushed.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.join.await;
    }
}

#[derive(Debug)]
pub struct SyncWorker;

impl SyncWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(replicator: Replicator) -> (SyncDispatcher, SyncWorkerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let join = tokio::spawn(worker_loop(replicator, rx, shutdown.clone()));

        (
            SyncDispatcher { tx: Some(tx) },
            SyncWorkerHandle { shutdown, join },
        )
    }
}

async fn worker_loop(
    replicator: Replicator,
    mut rx: mpsc::UnboundedReceiver<Vec<SyncTable>>,
    shutdown: Arc<Notify>,
) {
    info!(sink = replicator.sink_name(), "replication worker started");

    loop {
        let (first, stopping) = tokio::select! {
            _ = shutdown.notified() => (Vec::new(), true),
            batch = rx.recv() => match batch {
                Some(batch) => (batch, false),
                None => break,
            },
        };
        if stopping {
            // Refuse new work, then flush what is already queued.
            rx.close();
        }

        let mut pending: BTreeSet<SyncTable> = first.into_iter().collect();
        while let Ok(more) = rx.try_recv() {
            pending.extend(more);
        }
        if stopping && !pending.is_empty() {
            info!(tables = pending.len(), "flushing queued replication before shutdown");
        }

        for table in pending {
            if let Err(err) = replicator.sync_table(table).await {
                warn!(worker = "replication", %table, error = %err, "replication failed");
            }
        }

        if stopping {
            break;
        }
    }

    info!("replication worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replica::InMemoryReplica;
    use crate::store::{InMemoryStore, SupplierRepository, UnitOfWork};
    use chrono::Utc;
    use inventaris_core::SupplierId;
    use inventaris_suppliers::{NewSupplier, Supplier};
    use std::time::Duration;

    async fn seed_supplier(store: &InMemoryStore, name: &str) {
        let supplier = Supplier::create(
            SupplierId::new(),
            NewSupplier {
                name: name.into(),
                contact: Default::default(),
                notes: None,
                status: None,
            },
            Utc::now(),
        )
        .unwrap();
        let mut uow = store.begin().await.unwrap();
        uow.insert_supplier(&supplier).await.unwrap();
        uow.commit().await.unwrap();
    }

    async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[tokio::test]
    async fn manual_sync_reports_counts_per_table() {
        let store = InMemoryStore::new();
        seed_supplier(&store, "Acme").await;
        seed_supplier(&store, "Globex").await;
        let replica = InMemoryReplica::new();
        let replicator = Replicator::new(Arc::new(store), Arc::new(replica.clone()));

        let counts = replicator.sync_tables(&SyncTable::ALL).await.unwrap();
        assert_eq!(counts[&SyncTable::Suppliers], 2);
        assert_eq!(counts[&SyncTable::Products], 0);
        assert_eq!(replica.collection("suppliers").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn worker_pushes_enqueued_tables_and_survives_failures() {
        let store = InMemoryStore::new();
        seed_supplier(&store, "Acme").await;
        let replica = InMemoryReplica::new();
        replica.fail_next_write("firebase unreachable");

        let (dispatcher, handle) =
            SyncWorker::spawn(Replicator::new(Arc::new(store.clone()), Arc::new(replica.clone())));
        assert!(dispatcher.is_enabled());

        dispatcher.enqueue([SyncTable::Suppliers]);
        wait_until("failed attempt", || replica.attempts() >= 1).await;
        assert_eq!(replica.writes(), 0);

        dispatcher.enqueue([SyncTable::Suppliers, SyncTable::Suppliers]);
        wait_until("first write", || replica.writes() >= 1).await;
        assert_eq!(replica.collection("suppliers").unwrap().len(), 1);

        seed_supplier(&store, "Globex").await;
        dispatcher.enqueue([SyncTable::Suppliers]);
        wait_until("second write", || replica.writes() >= 2).await;
        assert_eq!(replica.collection("suppliers").unwrap().len(), 2);

        handle.shutdown().await;
        dispatcher.enqueue([SyncTable::Products]);
    }

    #[tokio::test]
    async fn shutdown_flushes_queued_tables() {
        let store = InMemoryStore::new();
        seed_supplier(&store, "Acme").await;
        let replica = InMemoryReplica::new();
        let (dispatcher, handle) =
            SyncWorker::spawn(Replicator::new(Arc::new(store), Arc::new(replica.clone())));

        dispatcher.enqueue([SyncTable::Suppliers]);
        dispatcher.enqueue([SyncTable::Products]);
        handle.shutdown().await;

        assert_eq!(replica.collection("suppliers").map(|c| c.len()), Some(1));
        assert_eq!(replica.collection("products").map(|c| c.len()), Some(0));
    }

    #[test]
    fn disabled_dispatcher_drops_requests() {
        let dispatcher = SyncDispatcher::disabled();
        assert!(!dispatcher.is_enabled());
        dispatcher.enqueue(SyncTable::ALL);
    }
}
