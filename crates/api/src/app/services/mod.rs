//! Application services: the operations behind every HTTP route.
//!
//! Each operation opens one unit of work, loads and locks what it needs,
//! applies domain rules, writes, and commits. An early return through `?`
//! drops the unit of work, which rolls back everything done so far.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use inventaris_core::{DomainError, Money, ProductId};
use inventaris_infra::replica::{NoopReplica, ReplicaError, ReplicaSink, Replicator, SyncDispatcher};
use inventaris_infra::store::{InMemoryStore, ProductRepository, Store, StoreError, UnitOfWork};
use inventaris_products::Product;

pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;
pub mod stock;
pub mod suppliers;
pub mod sync;

/// Attempts at picking an unused generated SKU or order number.
pub(crate) const GENERATED_KEY_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Replica(#[from] ReplicaError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared handles used by every request.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn Store>,
    replicator: Replicator,
    sync: SyncDispatcher,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("store", &self.store.backend())
            .field("replicator", &self.replicator)
            .field("sync_enabled", &self.sync.is_enabled())
            .finish()
    }
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, replicator: Replicator, sync: SyncDispatcher) -> Self {
        Self {
            store,
            replicator,
            sync,
        }
    }

    /// In-memory store, replication to `sink` only on manual sync.
    pub fn in_memory_with_sink(sink: Arc<dyn ReplicaSink>) -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let replicator = Replicator::new(store.clone(), sink);
        Self::new(store, replicator, SyncDispatcher::disabled())
    }

    /// In-memory store with replication disabled. Used by tests and local runs.
    pub fn in_memory() -> Self {
        Self::in_memory_with_sink(Arc::new(NoopReplica))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn sync(&self) -> &SyncDispatcher {
        &self.sync
    }

    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    async fn begin(&self) -> ServiceResult<Box<dyn UnitOfWork>> {
        Ok(self.store.begin().await?)
    }
}

/// An order line as submitted by a client. The product name is filled in
/// from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Load the product behind every line, failing on the first unknown one.
async fn resolve_lines(
    uow: &mut dyn UnitOfWork,
    lines: &[OrderLineInput],
) -> ServiceResult<Vec<(Product, OrderLineInput)>> {
    if lines.is_empty() {
        return Err(DomainError::validation("at least one line item is required").into());
    }
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let product = uow
            .get_product(line.product_id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        resolved.push((product, line.clone()));
    }
    Ok(resolved)
}

/// Distinct product ids in ascending order. Every unit of work that locks
/// more than one product row takes the locks in this order, so two of them
/// touching overlapping products queue instead of deadlocking.
pub(crate) fn lock_order(ids: impl IntoIterator<Item = ProductId>) -> Vec<ProductId> {
    ids.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lock every product in `ids` (see [`lock_order`]), failing on the first
/// unknown one.
async fn lock_products(
    uow: &mut dyn UnitOfWork,
    ids: Vec<ProductId>,
) -> ServiceResult<BTreeMap<ProductId, Product>> {
    let mut locked = BTreeMap::new();
    for id in lock_order(ids) {
        let product = uow
            .lock_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        locked.insert(id, product);
    }
    Ok(locked)
}
