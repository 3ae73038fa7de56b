//! Postgres-backed store.
//!
//! Each unit of work wraps one SQLx transaction. Product and order rows loaded
//! for a state change use `SELECT ... FOR UPDATE`, so concurrent receive/ship
//! or stock adjustments on the same product serialise in the database.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | duplicate SKU / order number |
//! | Database (foreign key violation) | `23503` | `Conflict` | deleting a referenced row |
//! | Database (check constraint violation) | `23514` | `Conflict` | e.g. negative stock |
//! | Database (other) | Any other | `Database` | |
//! | PoolClosed / other | N/A | `Database` | network errors, pool shut down |

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use inventaris_core::{Money, ProductId, PurchaseOrderId, SalesOrderId, SupplierId, TransactionId};
use inventaris_inventory::{MovementKind, StockTransaction};
use inventaris_products::{Product, ProductParts, StockStatus};
use inventaris_purchasing::{LineItem, PurchaseOrder, PurchaseOrderParts, PurchaseOrderStatus};
use inventaris_sales::{OrderLine, SalesOrder, SalesOrderParts, SalesOrderStatus};
use inventaris_suppliers::{ContactInfo, Supplier, SupplierParts, SupplierStatus};

use super::query::{OrderQuery, Page, PageRequest, ProductQuery, SortOrder};
use super::{
    ProductRepository, PurchaseOrderRepository, SalesOrderRepository, Store, StoreError,
    StoreResult, SupplierRepository, TransactionLog, UnitOfWork,
};

/// Schema migrations shipped with this crate.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

macro_rules! product_columns {
    () => {
        "id, name, sku, description, category, purchase_price, selling_price, stock, \
         min_stock, status, created_at, updated_at"
    };
}

macro_rules! supplier_columns {
    () => {
        "id, name, contact_person, email, phone, address, notes, status, created_at, updated_at"
    };
}

macro_rules! purchase_order_columns {
    () => {
        "id, po_number, supplier_id, supplier_name, order_date, expected_delivery, notes, \
         status, total_amount, created_at, updated_at"
    };
}

macro_rules! sales_order_columns {
    () => {
        "id, so_number, customer_name, customer_email, customer_phone, order_date, \
         expected_delivery, shipping_address, notes, status, total_amount, created_at, updated_at"
    };
}

macro_rules! transaction_columns {
    () => {
        "id, product_id, kind, quantity, old_stock, new_stock, unit_price, reason, reference, \
         notes, performed_by, created_at"
    };
}

/// Postgres store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Dropping the inner transaction without `commit` rolls it back.
struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PostgresUnitOfWork {
    async fn fetch_products(&mut self, sql: &'static str, id: Option<Uuid>) -> StoreResult<Vec<Product>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn purchase_order_lines(
        &mut self,
        ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, Vec<LineItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT purchase_order_id, product_id, product_name, quantity, unit_price
            FROM purchase_order_items
            WHERE purchase_order_id = ANY($1)
            ORDER BY purchase_order_id, line_no
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("purchase_order_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for row in rows {
            let line = LineRow::from_row(&row).map_err(corrupt("purchase_order_items"))?;
            let order_id: Uuid = row
                .try_get("purchase_order_id")
                .map_err(corrupt("purchase_order_items"))?;
            lines.entry(order_id).or_default().push(LineItem {
                product_id: ProductId::from_uuid(line.product_id),
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: money(line.unit_price)?,
            });
        }
        Ok(lines)
    }

    async fn hydrate_purchase_orders(&mut self, rows: Vec<PgRow>) -> StoreResult<Vec<PurchaseOrder>> {
        let headers = rows
            .iter()
            .map(|r| PurchaseOrderRow::from_row(r).map_err(corrupt("purchase_orders")))
            .collect::<StoreResult<Vec<_>>>()?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut lines = self.purchase_order_lines(&ids).await?;
        headers
            .into_iter()
            .map(|h| {
                let order_lines = lines.remove(&h.id).unwrap_or_default();
                h.into_order(order_lines)
            })
            .collect()
    }

    async fn replace_purchase_order_lines(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = $1")
            .bind(order.id_typed().as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_purchase_order_items", e))?;

        for (idx, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    purchase_order_id, line_no, product_id, product_name, quantity, unit_price
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(idx as i32 + 1)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price.minor())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_purchase_order_item", e))?;
        }
        Ok(())
    }

    async fn sales_order_lines(&mut self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT sales_order_id, product_id, product_name, quantity, unit_price
            FROM sales_order_items
            WHERE sales_order_id = ANY($1)
            ORDER BY sales_order_id, line_no
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sales_order_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let line = LineRow::from_row(&row).map_err(corrupt("sales_order_items"))?;
            let order_id: Uuid = row
                .try_get("sales_order_id")
                .map_err(corrupt("sales_order_items"))?;
            lines.entry(order_id).or_default().push(OrderLine {
                product_id: ProductId::from_uuid(line.product_id),
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: money(line.unit_price)?,
            });
        }
        Ok(lines)
    }

    async fn hydrate_sales_orders(&mut self, rows: Vec<PgRow>) -> StoreResult<Vec<SalesOrder>> {
        let headers = rows
            .iter()
            .map(|r| SalesOrderRow::from_row(r).map_err(corrupt("sales_orders")))
            .collect::<StoreResult<Vec<_>>>()?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut lines = self.sales_order_lines(&ids).await?;
        headers
            .into_iter()
            .map(|h| {
                let order_lines = lines.remove(&h.id).unwrap_or_default();
                h.into_order(order_lines)
            })
            .collect()
    }

    async fn replace_sales_order_lines(&mut self, order: &SalesOrder) -> StoreResult<()> {
        sqlx::query("DELETE FROM sales_order_items WHERE sales_order_id = $1")
            .bind(order.id_typed().as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sales_order_items", e))?;

        for (idx, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sales_order_items (
                    sales_order_id, line_no, product_id, product_name, quantity, unit_price
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(idx as i32 + 1)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price.minor())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sales_order_item", e))?;
        }
        Ok(())
    }

    async fn exists(&mut self, operation: &'static str, sql: &'static str, id: Uuid) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn fetch_transactions(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> StoreResult<Vec<StockTransaction>> {
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter()
            .map(|r| {
                TransactionRow::from_row(r)
                    .map_err(corrupt("stock_transactions"))?
                    .into_transaction()
            })
            .collect()
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    qb.push(" WHERE TRUE");
    if let Some(term) = query.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(category) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(sku) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    match query.stock_status {
        Some(StockStatus::OutOfStock) => {
            qb.push(" AND stock = 0");
        }
        Some(StockStatus::LowStock) => {
            qb.push(" AND stock > 0 AND stock <= min_stock");
        }
        Some(StockStatus::InStock) => {
            qb.push(" AND stock > min_stock");
        }
        None => {}
    }
}

fn push_order_filters<S>(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &OrderQuery<S>,
    status: Option<&'static str>,
    number_column: &'static str,
    name_column: &'static str,
) {
    qb.push(" WHERE TRUE");
    if let Some(status) = status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(term) = query.search_term() {
        let pattern = like_pattern(&term);
        qb.push(format!(" AND (LOWER({number_column}) LIKE "))
            .push_bind(pattern.clone())
            .push(format!(" OR LOWER(COALESCE({name_column}, '')) LIKE "))
            .push_bind(pattern)
            .push(")");
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => " ASC",
        SortOrder::Desc => " DESC",
    }
}

#[async_trait::async_trait]
impl ProductRepository for PostgresUnitOfWork {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = concat!("SELECT ", product_columns!(), " FROM products WHERE id = $1");
        Ok(self.fetch_products(sql, Some(*id.as_uuid())).await?.pop())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1 FOR UPDATE"
        );
        Ok(self.fetch_products(sql, Some(*id.as_uuid())).await?.pop())
    }

    #[instrument(skip(self), err)]
    async fn find_product_by_sku(&mut self, sku: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE sku = $1"
        ))
        .bind(sku)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_product_by_sku", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, query), fields(page = page.page, per_page = page.per_page), err)]
    async fn list_products(
        &mut self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let mut select =
            QueryBuilder::<Postgres>::new(concat!("SELECT ", product_columns!(), " FROM products"));
        push_product_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.sort.column())
            .push(direction(query.order))
            .push(", id")
            .push(direction(query.order))
            .push(" LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Ok(Page {
            items: rows.iter().map(product_from_row).collect::<StoreResult<_>>()?,
            total: total.max(0) as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[instrument(skip(self), err)]
    async fn all_products(&mut self) -> StoreResult<Vec<Product>> {
        let sql = concat!(
            "SELECT ",
            product_columns!(),
            " FROM products ORDER BY created_at, id"
        );
        self.fetch_products(sql, None).await
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed(), sku = product.sku()), err)]
    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, description, category, purchase_price, selling_price,
                stock, min_stock, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.sku())
        .bind(product.description())
        .bind(product.category())
        .bind(product.purchase_price().minor())
        .bind(product.selling_price().minor())
        .bind(product.stock())
        .bind(product.min_stock())
        .bind(product.status().as_str())
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2,
                sku = $3,
                description = $4,
                category = $5,
                purchase_price = $6,
                selling_price = $7,
                stock = $8,
                min_stock = $9,
                status = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.sku())
        .bind(product.description())
        .bind(product.category())
        .bind(product.purchase_price().minor())
        .bind(product.selling_price().minor())
        .bind(product.stock())
        .bind(product.min_stock())
        .bind(product.status().as_str())
        .bind(product.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {}", product.id_typed())));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn categories(&mut self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM products ORDER BY category")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("categories", e))
    }
}

#[async_trait::async_trait]
impl SupplierRepository for PostgresUnitOfWork {
    #[instrument(skip(self), fields(supplier_id = %id), err)]
    async fn get_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            supplier_columns!(),
            " FROM suppliers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_supplier", e))?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_suppliers(
        &mut self,
        status: Option<SupplierStatus>,
    ) -> StoreResult<Vec<Supplier>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            supplier_columns!(),
            " FROM suppliers WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_suppliers", e))?;
        rows.iter().map(supplier_from_row).collect()
    }

    #[instrument(skip(self, supplier), fields(supplier_id = %supplier.id_typed()), err)]
    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        let contact = supplier.contact();
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_person, email, phone, address, notes, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(supplier.id_typed().as_uuid())
        .bind(supplier.name())
        .bind(contact.contact_person.as_deref())
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .bind(contact.address.as_deref())
        .bind(supplier.notes())
        .bind(supplier.status().as_str())
        .bind(supplier.created_at())
        .bind(supplier.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        Ok(())
    }

    #[instrument(skip(self, supplier), fields(supplier_id = %supplier.id_typed()), err)]
    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        let contact = supplier.contact();
        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = $2,
                contact_person = $3,
                email = $4,
                phone = $5,
                address = $6,
                notes = $7,
                status = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(supplier.id_typed().as_uuid())
        .bind(supplier.name())
        .bind(contact.contact_person.as_deref())
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .bind(contact.address.as_deref())
        .bind(supplier.notes())
        .bind(supplier.status().as_str())
        .bind(supplier.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_supplier", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("supplier {}", supplier.id_typed())));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(supplier_id = %id), err)]
    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_supplier", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("supplier {id}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PurchaseOrderRepository for PostgresUnitOfWork {
    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    async fn get_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            purchase_order_columns!(),
            " FROM purchase_orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_purchase_order", e))?;
        Ok(self.hydrate_purchase_orders(rows).await?.pop())
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    async fn lock_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            purchase_order_columns!(),
            " FROM purchase_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_purchase_order", e))?;
        Ok(self.hydrate_purchase_orders(rows).await?.pop())
    }

    #[instrument(skip(self, query), fields(page = page.page), err)]
    async fn list_purchase_orders(
        &mut self,
        query: &OrderQuery<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<PurchaseOrder>> {
        let status = query.status.map(|s| s.as_str());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM purchase_orders");
        push_order_filters(&mut count, query, status, "po_number", "supplier_name");
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_purchase_orders", e))?;

        let mut select = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ",
            purchase_order_columns!(),
            " FROM purchase_orders"
        ));
        push_order_filters(&mut select, query, status, "po_number", "supplier_name");
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_purchase_orders", e))?;

        Ok(Page {
            items: self.hydrate_purchase_orders(rows).await?,
            total: total.max(0) as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[instrument(skip(self), err)]
    async fn all_purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            purchase_order_columns!(),
            " FROM purchase_orders ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("all_purchase_orders", e))?;
        self.hydrate_purchase_orders(rows).await
    }

    #[instrument(skip(self, order), fields(po_number = order.po_number()), err)]
    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, po_number, supplier_id, supplier_name, order_date, expected_delivery,
                notes, status, total_amount, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.po_number())
        .bind(order.supplier_id().map(|s| *s.as_uuid()))
        .bind(order.supplier_name())
        .bind(order.order_date())
        .bind(order.expected_delivery())
        .bind(order.notes())
        .bind(order.status().as_str())
        .bind(order.total_amount().minor())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order", e))?;

        self.replace_purchase_order_lines(order).await
    }

    #[instrument(skip(self, order), fields(po_number = order.po_number()), err)]
    async fn update_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                supplier_id = $2,
                supplier_name = $3,
                order_date = $4,
                expected_delivery = $5,
                notes = $6,
                status = $7,
                total_amount = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.supplier_id().map(|s| *s.as_uuid()))
        .bind(order.supplier_name())
        .bind(order.order_date())
        .bind(order.expected_delivery())
        .bind(order.notes())
        .bind(order.status().as_str())
        .bind(order.total_amount().minor())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_purchase_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("purchase order {}", order.id_typed())));
        }

        self.replace_purchase_order_lines(order).await
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_purchase_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("purchase order {id}")));
        }
        Ok(())
    }

    async fn po_number_exists(&mut self, po_number: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchase_orders WHERE po_number = $1)",
        )
        .bind(po_number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("po_number_exists", e))
    }

    async fn supplier_has_purchase_orders(&mut self, supplier_id: SupplierId) -> StoreResult<bool> {
        self.exists(
            "supplier_has_purchase_orders",
            "SELECT EXISTS (SELECT 1 FROM purchase_orders WHERE supplier_id = $1)",
            *supplier_id.as_uuid(),
        )
        .await
    }

    async fn product_on_purchase_orders(&mut self, product_id: ProductId) -> StoreResult<bool> {
        self.exists(
            "product_on_purchase_orders",
            "SELECT EXISTS (SELECT 1 FROM purchase_order_items WHERE product_id = $1)",
            *product_id.as_uuid(),
        )
        .await
    }
}

#[async_trait::async_trait]
impl SalesOrderRepository for PostgresUnitOfWork {
    #[instrument(skip(self), fields(sales_order_id = %id), err)]
    async fn get_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            sales_order_columns!(),
            " FROM sales_orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_sales_order", e))?;
        Ok(self.hydrate_sales_orders(rows).await?.pop())
    }

    #[instrument(skip(self), fields(sales_order_id = %id), err)]
    async fn lock_sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            sales_order_columns!(),
            " FROM sales_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_sales_order", e))?;
        Ok(self.hydrate_sales_orders(rows).await?.pop())
    }

    #[instrument(skip(self, query), fields(page = page.page), err)]
    async fn list_sales_orders(
        &mut self,
        query: &OrderQuery<SalesOrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<SalesOrder>> {
        let status = query.status.map(|s| s.as_str());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sales_orders");
        push_order_filters(&mut count, query, status, "so_number", "customer_name");
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("count_sales_orders", e))?;

        let mut select = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ",
            sales_order_columns!(),
            " FROM sales_orders"
        ));
        push_order_filters(&mut select, query, status, "so_number", "customer_name");
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_sales_orders", e))?;

        Ok(Page {
            items: self.hydrate_sales_orders(rows).await?,
            total: total.max(0) as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[instrument(skip(self), err)]
    async fn all_sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            sales_order_columns!(),
            " FROM sales_orders ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("all_sales_orders", e))?;
        self.hydrate_sales_orders(rows).await
    }

    #[instrument(skip(self, order), fields(so_number = order.so_number()), err)]
    async fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_orders (
                id, so_number, customer_name, customer_email, customer_phone, order_date,
                expected_delivery, shipping_address, notes, status, total_amount,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.so_number())
        .bind(order.customer_name())
        .bind(order.customer_email())
        .bind(order.customer_phone())
        .bind(order.order_date())
        .bind(order.expected_delivery())
        .bind(order.shipping_address())
        .bind(order.notes())
        .bind(order.status().as_str())
        .bind(order.total_amount().minor())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sales_order", e))?;

        self.replace_sales_order_lines(order).await
    }

    #[instrument(skip(self, order), fields(so_number = order.so_number()), err)]
    async fn update_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales_orders SET
                customer_name = $2,
                customer_email = $3,
                customer_phone = $4,
                order_date = $5,
                expected_delivery = $6,
                shipping_address = $7,
                notes = $8,
                status = $9,
                total_amount = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.customer_name())
        .bind(order.customer_email())
        .bind(order.customer_phone())
        .bind(order.order_date())
        .bind(order.expected_delivery())
        .bind(order.shipping_address())
        .bind(order.notes())
        .bind(order.status().as_str())
        .bind(order.total_amount().minor())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_sales_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("sales order {}", order.id_typed())));
        }

        self.replace_sales_order_lines(order).await
    }

    #[instrument(skip(self), fields(sales_order_id = %id), err)]
    async fn delete_sales_order(&mut self, id: SalesOrderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM sales_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sales_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("sales order {id}")));
        }
        Ok(())
    }

    async fn so_number_exists(&mut self, so_number: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM sales_orders WHERE so_number = $1)")
            .bind(so_number)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("so_number_exists", e))
    }

    async fn product_on_sales_orders(&mut self, product_id: ProductId) -> StoreResult<bool> {
        self.exists(
            "product_on_sales_orders",
            "SELECT EXISTS (SELECT 1 FROM sales_order_items WHERE product_id = $1)",
            *product_id.as_uuid(),
        )
        .await
    }
}

#[async_trait::async_trait]
impl TransactionLog for PostgresUnitOfWork {
    #[instrument(
        skip(self, transaction),
        fields(product_id = %transaction.product_id, kind = %transaction.kind),
        err
    )]
    async fn record_transaction(&mut self, transaction: &StockTransaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_transactions (
                id, product_id, kind, quantity, old_stock, new_stock, unit_price,
                reason, reference, notes, performed_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.product_id.as_uuid())
        .bind(transaction.kind.as_str())
        .bind(transaction.quantity)
        .bind(transaction.old_stock)
        .bind(transaction.new_stock)
        .bind(transaction.unit_price.map(|p| p.minor()))
        .bind(&transaction.reason)
        .bind(transaction.reference.as_deref())
        .bind(transaction.notes.as_deref())
        .bind(transaction.performed_by.as_deref())
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("record_transaction", e))?;
        Ok(())
    }

    async fn product_has_transactions(&mut self, product_id: ProductId) -> StoreResult<bool> {
        self.exists(
            "product_has_transactions",
            "SELECT EXISTS (SELECT 1 FROM stock_transactions WHERE product_id = $1)",
            *product_id.as_uuid(),
        )
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id, page = page.page), err)]
    async fn transactions_for_product(
        &mut self,
        product_id: ProductId,
        page: PageRequest,
    ) -> StoreResult<Page<StockTransaction>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_transactions WHERE product_id = $1")
                .bind(product_id.as_uuid())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("count_product_transactions", e))?;

        let query = sqlx::query(concat!(
            "SELECT ",
            transaction_columns!(),
            " FROM stock_transactions WHERE product_id = $1 \
              ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(*product_id.as_uuid())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64);
        let items = self.fetch_transactions("transactions_for_product", query).await?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[instrument(skip(self), err)]
    async fn recent_transactions(&mut self, limit: u32) -> StoreResult<Vec<StockTransaction>> {
        let query = sqlx::query(concat!(
            "SELECT ",
            transaction_columns!(),
            " FROM stock_transactions ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::from(limit));
        self.fetch_transactions("recent_transactions", query).await
    }

    #[instrument(skip(self), err)]
    async fn transactions_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<StockTransaction>> {
        let query = sqlx::query(concat!(
            "SELECT ",
            transaction_columns!(),
            " FROM stock_transactions WHERE created_at BETWEEN $1 AND $2 ORDER BY created_at, id"
        ))
        .bind(from)
        .bind(to);
        self.fetch_transactions("transactions_between", query).await
    }

    #[instrument(skip(self), err)]
    async fn all_transactions(&mut self) -> StoreResult<Vec<StockTransaction>> {
        let query = sqlx::query(concat!(
            "SELECT ",
            transaction_columns!(),
            " FROM stock_transactions ORDER BY created_at, id"
        ));
        self.fetch_transactions("all_transactions", query).await
    }
}

#[async_trait::async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn corrupt(table: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| StoreError::Corrupt(format!("{table}: {e}"))
}

fn money(minor: i64) -> StoreResult<Money> {
    Money::try_new(minor).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse<T>(value: &str) -> StoreResult<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(e.to_string()))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    ProductRow::from_row(row)
        .map_err(corrupt("products"))?
        .into_product()
}

fn supplier_from_row(row: &PgRow) -> StoreResult<Supplier> {
    let r = SupplierRow::from_row(row).map_err(corrupt("suppliers"))?;
    Ok(Supplier::restore(SupplierParts {
        id: SupplierId::from_uuid(r.id),
        name: r.name,
        contact: ContactInfo {
            contact_person: r.contact_person,
            email: r.email,
            phone: r.phone,
            address: r.address,
        },
        notes: r.notes,
        status: parse::<SupplierStatus>(&r.status)?,
        created_at: r.created_at,
        updated_at: r.updated_at,
    }))
}

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: String,
    description: Option<String>,
    category: String,
    purchase_price: i64,
    selling_price: i64,
    stock: i64,
    min_stock: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            purchase_price: row.try_get("purchase_price")?,
            selling_price: row.try_get("selling_price")?,
            stock: row.try_get("stock")?,
            min_stock: row.try_get("min_stock")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ProductRow {
    fn into_product(self) -> StoreResult<Product> {
        Ok(Product::restore(ProductParts {
            id: ProductId::from_uuid(self.id),
            name: self.name,
            sku: self.sku,
            description: self.description,
            category: self.category,
            purchase_price: money(self.purchase_price)?,
            selling_price: money(self.selling_price)?,
            stock: self.stock,
            min_stock: self.min_stock,
            status: parse(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact_person: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SupplierRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SupplierRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_person: row.try_get("contact_person")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug)]
struct LineRow {
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    unit_price: i64,
}

impl<'r> FromRow<'r, PgRow> for LineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineRow {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
        })
    }
}

#[derive(Debug)]
struct PurchaseOrderRow {
    id: Uuid,
    po_number: String,
    supplier_id: Option<Uuid>,
    supplier_name: Option<String>,
    order_date: NaiveDate,
    expected_delivery: Option<NaiveDate>,
    notes: Option<String>,
    status: String,
    total_amount: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PurchaseOrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseOrderRow {
            id: row.try_get("id")?,
            po_number: row.try_get("po_number")?,
            supplier_id: row.try_get("supplier_id")?,
            supplier_name: row.try_get("supplier_name")?,
            order_date: row.try_get("order_date")?,
            expected_delivery: row.try_get("expected_delivery")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            total_amount: row.try_get("total_amount")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl PurchaseOrderRow {
    fn into_order(self, lines: Vec<LineItem>) -> StoreResult<PurchaseOrder> {
        Ok(PurchaseOrder::restore(PurchaseOrderParts {
            id: PurchaseOrderId::from_uuid(self.id),
            po_number: self.po_number,
            supplier_id: self.supplier_id.map(SupplierId::from_uuid),
            supplier_name: self.supplier_name,
            order_date: self.order_date,
            expected_delivery: self.expected_delivery,
            notes: self.notes,
            status: parse(&self.status)?,
            total_amount: money(self.total_amount)?,
            lines,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug)]
struct SalesOrderRow {
    id: Uuid,
    so_number: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    order_date: NaiveDate,
    expected_delivery: Option<NaiveDate>,
    shipping_address: String,
    notes: Option<String>,
    status: String,
    total_amount: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SalesOrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SalesOrderRow {
            id: row.try_get("id")?,
            so_number: row.try_get("so_number")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            order_date: row.try_get("order_date")?,
            expected_delivery: row.try_get("expected_delivery")?,
            shipping_address: row.try_get("shipping_address")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            total_amount: row.try_get("total_amount")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SalesOrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> StoreResult<SalesOrder> {
        Ok(SalesOrder::restore(SalesOrderParts {
            id: SalesOrderId::from_uuid(self.id),
            so_number: self.so_number,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            order_date: self.order_date,
            expected_delivery: self.expected_delivery,
            shipping_address: self.shipping_address,
            notes: self.notes,
            status: parse(&self.status)?,
            total_amount: money(self.total_amount)?,
            lines,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug)]
struct TransactionRow {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    quantity: i64,
    old_stock: i64,
    new_stock: i64,
    unit_price: Option<i64>,
    reason: String,
    reference: Option<String>,
    notes: Option<String>,
    performed_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            old_stock: row.try_get("old_stock")?,
            new_stock: row.try_get("new_stock")?,
            unit_price: row.try_get("unit_price")?,
            reason: row.try_get("reason")?,
            reference: row.try_get("reference")?,
            notes: row.try_get("notes")?,
            performed_by: row.try_get("performed_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TransactionRow {
    fn into_transaction(self) -> StoreResult<StockTransaction> {
        Ok(StockTransaction {
            id: TransactionId::from_uuid(self.id),
            product_id: ProductId::from_uuid(self.product_id),
            kind: parse::<MovementKind>(&self.kind)?,
            quantity: self.quantity,
            old_stock: self.old_stock,
            new_stock: self.new_stock,
            unit_price: self.unit_price.map(money).transpose()?,
            reason: self.reason,
            reference: self.reference,
            notes: self.notes,
            performed_by: self.performed_by,
            created_at: self.created_at,
        })
    }
}

/// Map SQLx errors to `StoreError` (see the module docs for the table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::NotFound(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventaris_products::NewProduct;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    // Requires a live database:
    // DATABASE_URL=postgres://... cargo test -p inventaris-infra -- --ignored
    #[tokio::test]
    #[ignore = "requires database"]
    async fn product_round_trip_and_rollback() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let store = PostgresStore::connect(&url, 2).await.expect("connect failed");
        store.migrate().await.expect("migrate failed");

        let input = NewProduct {
            name: "Roundtrip".into(),
            description: Some("pg test".into()),
            category: "Test".into(),
            purchase_price: Money::from_minor(100),
            selling_price: Money::from_minor(200),
            stock: 3,
            min_stock: None,
            status: None,
        };
        let product = Product::create(
            ProductId::new(),
            input,
            format!("PG-{}", Uuid::now_v7()),
            Utc::now(),
        )
        .unwrap();

        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_product(&product).await.unwrap();
            // dropped without commit
        }
        let mut uow = store.begin().await.unwrap();
        assert!(uow.get_product(product.id_typed()).await.unwrap().is_none());

        uow.insert_product(&product).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let loaded = uow.lock_product(product.id_typed()).await.unwrap().unwrap();
        assert_eq!(loaded.sku(), product.sku());
        assert_eq!(loaded.stock(), 3);
        uow.delete_product(product.id_typed()).await.unwrap();
        uow.commit().await.unwrap();
    }
}
