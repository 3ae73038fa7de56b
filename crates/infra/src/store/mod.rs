//! Relational storage for the inventory domain.
//!
//! All reads and writes go through a [`UnitOfWork`] obtained from
//! [`Store::begin`]. A unit of work is one database transaction: changes become
//! visible only after [`UnitOfWork::commit`], and dropping it without
//! committing rolls everything back. Multi-row stock changes (order
//! receive/ship, bulk adjustments) rely on this for all-or-nothing semantics.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`]: a mutex-serialised copy-on-write state, used for local
//!   runs and tests.
//! - [`PostgresStore`]: SQLx transactions; product and order rows touched by a
//!   state change are locked with `SELECT ... FOR UPDATE`.

pub mod in_memory;
pub mod postgres;
pub mod query;

use chrono::{DateTime, Utc};
use thiserror::Error;

use inventaris_core::{ProductId, PurchaseOrderId, SalesOrderId, SupplierId};
use inventaris_inventory::StockTransaction;
use inventaris_products::Product;
use inventaris_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use inventaris_sales::{SalesOrder, SalesOrderStatus};
use inventaris_suppliers::{Supplier, SupplierStatus};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderQuery, Page, PageRequest, ProductQuery, ProductSort, SortOrder};

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or reference constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row expected to exist was missing (e.g. deleted concurrently).
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Any other database failure (connection, syntax, pool closed, ...).
    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait ProductRepository: Send {
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Like `get_product`, but holds a row lock until the unit of work ends.
    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn find_product_by_sku(&mut self, sku: &str) -> StoreResult<Option<Product>>;

    async fn list_products(
        &mut self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Product>>;

    async fn all_products(&mut self) -> StoreResult<Vec<Product>>;

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()>;

    async fn update_product(&mut self, product: &Product) -> StoreResult<()>;

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()>;

    /// Distinct categories, sorted.
    async fn categories(&mut self) -> StoreResult<Vec<String>>;
}

#[async_trait::async_trait]
pub trait SupplierRepository: Send {
    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>>;

    /// Newest first.
    async fn list_suppliers(
        &mut self,
        status: Option<SupplierStatus>,
    ) -> StoreResult<Vec<Supplier>>;

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;

    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;

    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait PurchaseOrderRepository: Send {
    async fn get_purchase_order(&mut self, id: PurchaseOrderId)
    -> StoreResult<Option<PurchaseOrder>>;

    /// Load with a row lock, for status transitions.
    async fn lock_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>>;

    /// Newest first.
    async fn list_purchase_orders(
        &mut self,
        query: &OrderQuery<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<PurchaseOrder>>;

    async fn all_purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>>;

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;

    /// Overwrites the header and replaces every line.
    async fn update_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;

    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<()>;

    async fn po_number_exists(&mut self, po_number: &str) -> StoreResult<bool>;

    async fn supplier_has_purchase_orders(&mut self, supplier_id: SupplierId) -> StoreResult<bool>;

    async fn product_on_purchase_orders(&mut self, product_id: ProductId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait SalesOrderRepository: Send {
    async fn get_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>>;

    async fn lock_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>>;

    /// Newest first.
    async fn list_sales_orders(
        &mut self,
        query: &OrderQuery<SalesOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<SalesOrder>>;

    async fn all_sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>>;

    async fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()>;

    async fn update_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()>;

    async fn delete_sales_order(&mut self, id: SalesOrderId) -> StoreResult<()>;

    async fn so_number_exists(&mut self, so_number: &str) -> StoreResult<bool>;

    async fn product_on_sales_orders(&mut self, product_id: ProductId) -> StoreResult<bool>;
}

/// Append-only stock movement log.
#[async_trait::async_trait]
pub trait TransactionLog: Send {
    async fn record_transaction(&mut self, transaction: &StockTransaction) -> StoreResult<()>;

    async fn product_has_transactions(&mut self, product_id: ProductId) -> StoreResult<bool>;

    /// Newest first.
    async fn transactions_for_product(
        &mut self,
        product_id: ProductId,
        page: PageRequest,
    ) -> StoreResult<Page<StockTransaction>>;

    /// Newest first.
    async fn recent_transactions(&mut self, limit: u32) -> StoreResult<Vec<StockTransaction>>;

    /// Oldest first, `from <= created_at <= to`.
    async fn transactions_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<StockTransaction>>;

    /// Oldest first.
    async fn all_transactions(&mut self) -> StoreResult<Vec<StockTransaction>>;
}

/// One database transaction spanning every repository.
#[async_trait::async_trait]
pub trait UnitOfWork:
    ProductRepository
    + SupplierRepository
    + PurchaseOrderRepository
    + SalesOrderRepository
    + TransactionLog
    + Send
{
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Entry point to the storage backend.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Start a unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Backend name for diagnostics (`memory`, `postgres`).
    fn backend(&self) -> &'static str;
}
