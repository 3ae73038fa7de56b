//! In-memory store.
//!
//! A unit of work holds the store's mutex for its whole lifetime and operates
//! on a private copy of the state; `commit` writes the copy back. Units of
//! work are therefore fully serialised, which gives the same all-or-nothing
//! behaviour as a database transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use inventaris_core::{ProductId, PurchaseOrderId, SalesOrderId, SupplierId, TransactionId};
use inventaris_inventory::StockTransaction;
use inventaris_products::Product;
use inventaris_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use inventaris_sales::{SalesOrder, SalesOrderStatus};
use inventaris_suppliers::{Supplier, SupplierStatus};

use super::query::{OrderQuery, Page, PageRequest, ProductQuery};
use super::{
    ProductRepository, PurchaseOrderRepository, SalesOrderRepository, Store, StoreError,
    StoreResult, SupplierRepository, TransactionLog, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    products: BTreeMap<ProductId, Product>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    sales_orders: BTreeMap<SalesOrderId, SalesOrder>,
    transactions: BTreeMap<TransactionId, StockTransaction>,
}

/// Process-local store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

fn newest_first<T: Clone>(
    rows: impl Iterator<Item = T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    rows
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryUnitOfWork {
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.get_product(id).await
    }

    async fn find_product_by_sku(&mut self, sku: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .working
            .products
            .values()
            .find(|p| p.sku() == sku)
            .cloned())
    }

    async fn list_products(
        &mut self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let mut rows: Vec<Product> = self
            .working
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        query.sort(&mut rows);
        Ok(page.slice(&rows))
    }

    async fn all_products(&mut self) -> StoreResult<Vec<Product>> {
        Ok(self.working.products.values().cloned().collect())
    }

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        if self.working.products.values().any(|p| p.sku() == product.sku()) {
            return Err(StoreError::Conflict(format!(
                "sku '{}' already exists",
                product.sku()
            )));
        }
        self.working
            .products
            .insert(product.id_typed(), product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        let id = product.id_typed();
        if self
            .working
            .products
            .values()
            .any(|p| p.sku() == product.sku() && p.id_typed() != id)
        {
            return Err(StoreError::Conflict(format!(
                "sku '{}' already exists",
                product.sku()
            )));
        }
        match self.working.products.get_mut(&id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("product {id}"))),
        }
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        self.working
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    async fn categories(&mut self) -> StoreResult<Vec<String>> {
        let mut categories: Vec<String> = self
            .working
            .products
            .values()
            .map(|p| p.category().to_string())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait::async_trait]
impl SupplierRepository for InMemoryUnitOfWork {
    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.working.suppliers.get(&id).cloned())
    }

    async fn list_suppliers(
        &mut self,
        status: Option<SupplierStatus>,
    ) -> StoreResult<Vec<Supplier>> {
        Ok(newest_first(
            self.working
                .suppliers
                .values()
                .filter(|s| status.is_none_or(|wanted| s.status() == wanted))
                .cloned(),
            Supplier::created_at,
        ))
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        self.working
            .suppliers
            .insert(supplier.id_typed(), supplier.clone());
        Ok(())
    }

    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        let id = supplier.id_typed();
        match self.working.suppliers.get_mut(&id) {
            Some(slot) => {
                *slot = supplier.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("supplier {id}"))),
        }
    }

    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()> {
        if self.supplier_has_purchase_orders(id).await? {
            return Err(StoreError::Conflict(format!(
                "supplier {id} is referenced by purchase orders"
            )));
        }
        self.working
            .suppliers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("supplier {id}")))
    }
}

#[async_trait::async_trait]
impl PurchaseOrderRepository for InMemoryUnitOfWork {
    async fn get_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.working.purchase_orders.get(&id).cloned())
    }

    async fn lock_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        self.get_purchase_order(id).await
    }

    async fn list_purchase_orders(
        &mut self,
        query: &OrderQuery<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<PurchaseOrder>> {
        let needle = query.search_term();
        let rows = newest_first(
            self.working
                .purchase_orders
                .values()
                .filter(|o| query.status.is_none_or(|s| o.status() == s))
                .filter(|o| match &needle {
                    Some(n) => {
                        o.po_number().to_lowercase().contains(n)
                            || o.supplier_name()
                                .is_some_and(|name| name.to_lowercase().contains(n))
                    }
                    None => true,
                })
                .cloned(),
            PurchaseOrder::created_at,
        );
        Ok(page.slice(&rows))
    }

    async fn all_purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>> {
        Ok(self.working.purchase_orders.values().cloned().collect())
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        if self.po_number_exists(order.po_number()).await? {
            return Err(StoreError::Conflict(format!(
                "po_number '{}' already exists",
                order.po_number()
            )));
        }
        self.working
            .purchase_orders
            .insert(order.id_typed(), order.clone());
        Ok(())
    }

    async fn update_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        let id = order.id_typed();
        match self.working.purchase_orders.get_mut(&id) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("purchase order {id}"))),
        }
    }

    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<()> {
        self.working
            .purchase_orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("purchase order {id}")))
    }

    async fn po_number_exists(&mut self, po_number: &str) -> StoreResult<bool> {
        Ok(self
            .working
            .purchase_orders
            .values()
            .any(|o| o.po_number() == po_number))
    }

    async fn supplier_has_purchase_orders(&mut self, supplier_id: SupplierId) -> StoreResult<bool> {
        Ok(self
            .working
            .purchase_orders
            .values()
            .any(|o| o.supplier_id() == Some(supplier_id)))
    }

    async fn product_on_purchase_orders(&mut self, product_id: ProductId) -> StoreResult<bool> {
        Ok(self
            .working
            .purchase_orders
            .values()
            .any(|o| o.references_product(product_id)))
    }
}

#[async_trait::async_trait]
impl SalesOrderRepository for InMemoryUnitOfWork {
    async fn get_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        Ok(self.working.sales_orders.get(&id).cloned())
    }

    async fn lock_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        self.get_sales_order(id).await
    }

    async fn list_sales_orders(
        &mut self,
        query: &OrderQuery<SalesOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<SalesOrder>> {
        let needle = query.search_term();
        let rows = newest_first(
            self.working
                .sales_orders
                .values()
                .filter(|o| query.status.is_none_or(|s| o.status() == s))
                .filter(|o| match &needle {
                    Some(n) => {
                        o.so_number().to_lowercase().contains(n)
                            || o.customer_name().to_lowercase().contains(n)
                    }
                    None => true,
                })
                .cloned(),
            SalesOrder::created_at,
        );
        Ok(page.slice(&rows))
    }

    async fn all_sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>> {
        Ok(self.working.sales_orders.values().cloned().collect())
    }

    async fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        if self.so_number_exists(order.so_number()).await? {
            return Err(StoreError::Conflict(format!(
                "so_number '{}' already exists",
                order.so_number()
            )));
        }
        self.working
            .sales_orders
            .insert(order.id_typed(), order.clone());
        Ok(())
    }

    async fn update_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        let id = order.id_typed();
        match self.working.sales_orders.get_mut(&id) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("sales order {id}"))),
        }
    }

    async fn delete_sales_order(&mut self, id: SalesOrderId) -> StoreResult<()> {
        self.working
            .sales_orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("sales order {id}")))
    }

    async fn so_number_exists(&mut self, so_number: &str) -> StoreResult<bool> {
        Ok(self
            .working
            .sales_orders
            .values()
            .any(|o| o.so_number() == so_number))
    }

    async fn product_on_sales_orders(&mut self, product_id: ProductId) -> StoreResult<bool> {
        Ok(self
            .working
            .sales_orders
            .values()
            .any(|o| o.references_product(product_id)))
    }
}

#[async_trait::async_trait]
impl TransactionLog for InMemoryUnitOfWork {
    async fn record_transaction(&mut self, transaction: &StockTransaction) -> StoreResult<()> {
        if !self.working.products.contains_key(&transaction.product_id) {
            return Err(StoreError::Conflict(format!(
                "product {} does not exist",
                transaction.product_id
            )));
        }
        self.working
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn product_has_transactions(&mut self, product_id: ProductId) -> StoreResult<bool> {
        Ok(self
            .working
            .transactions
            .values()
            .any(|t| t.product_id == product_id))
    }

    async fn transactions_for_product(
        &mut self,
        product_id: ProductId,
        page: PageRequest,
    ) -> StoreResult<Page<StockTransaction>> {
        // Ids are time-ordered, so reverse id order is newest first.
        let rows: Vec<StockTransaction> = self
            .working
            .transactions
            .values()
            .rev()
            .filter(|t| t.product_id == product_id)
            .cloned()
            .collect();
        Ok(page.slice(&rows))
    }

    async fn recent_transactions(&mut self, limit: u32) -> StoreResult<Vec<StockTransaction>> {
        Ok(self
            .working
            .transactions
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn transactions_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<StockTransaction>> {
        Ok(self
            .working
            .transactions
            .values()
            .filter(|t| from <= t.created_at && t.created_at <= to)
            .cloned()
            .collect())
    }

    async fn all_transactions(&mut self) -> StoreResult<Vec<StockTransaction>> {
        Ok(self.working.transactions.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProductSort, SortOrder};
    use inventaris_core::Money;
    use inventaris_products::NewProduct;

    fn product(name: &str, sku: &str) -> Product {
        let input = NewProduct {
            name: name.into(),
            description: None,
            category: "General".into(),
            purchase_price: Money::from_minor(100),
            selling_price: Money::from_minor(150),
            stock: 5,
            min_stock: None,
            status: None,
        };
        Product::create(ProductId::new(), input, sku.into(), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = InMemoryStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_product(&product("Tape", "TAPE-1")).await.unwrap();
        }
        let mut uow = store.begin().await.unwrap();
        assert!(uow.all_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_changes_are_visible() {
        let store = InMemoryStore::new();
        let p = product("Tape", "TAPE-1");
        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&p).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let loaded = uow.get_product(p.id_typed()).await.unwrap().unwrap();
        assert_eq!(loaded, p);
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&product("Tape", "TAPE-1")).await.unwrap();
        match uow.insert_product(&product("Glue", "TAPE-1")).await {
            Err(StoreError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_products_filters_sorts_and_pages() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        for (name, sku) in [("Alpha", "A-1"), ("Beta", "B-1"), ("Gamma", "G-1")] {
            uow.insert_product(&product(name, sku)).await.unwrap();
        }

        let query = ProductQuery {
            search: Some("a-".into()),
            ..ProductQuery::default()
        };
        let page = uow
            .list_products(&query, PageRequest::new(None, None, 10))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name(), "Alpha");

        let query = ProductQuery {
            sort: ProductSort::Name,
            order: SortOrder::Asc,
            ..ProductQuery::default()
        };
        let page = uow
            .list_products(&query, PageRequest::new(Some(2), Some(2), 10))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name(), "Gamma");
    }
}
