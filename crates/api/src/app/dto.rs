use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use inventaris_core::ProductId;
use inventaris_infra::store::{OrderQuery, Page, PageRequest, ProductQuery, ProductSort, SortOrder};
use inventaris_products::{NewProduct, Product, ProductStatus, StockStatus};
use inventaris_purchasing::PurchaseOrderStatus;
use inventaris_reporting::{Granularity, PerformanceSort, TrendMetric};
use inventaris_sales::SalesOrderStatus;
use inventaris_suppliers::SupplierStatus;

use crate::app::errors;
use crate::app::services::products::BulkAction;
use crate::app::services::stock::StockAdjustment;

pub const PRODUCTS_PER_PAGE: u32 = 10;
pub const STOCK_PER_PAGE: u32 = 15;
pub const HISTORY_PER_PAGE: u32 = 20;
pub const TRANSACTIONS_PER_PAGE: u32 = 10;
pub const ORDERS_PER_PAGE: u32 = 10;
pub const RECENT_TRANSACTIONS: u32 = 10;

type Rejection = axum::response::Response;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Generated from name and category when absent.
    pub sku: Option<String>,
    #[serde(flatten)]
    pub product: NewProduct,
}

#[derive(Debug, Deserialize)]
pub struct BulkProductRequest {
    pub action: BulkAction,
    pub product_ids: Vec<ProductId>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustRequest {
    pub adjustments: Vec<StockAdjustment>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default = "all_tables")]
    pub table: String,
}

fn all_tables() -> String {
    crate::app::services::sync::ALL_TABLES.to_string()
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self { table: all_tables() }
    }
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn request(&self, default_per_page: u32) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }
}

// Query structs spell out their paging fields: `serde(flatten)` does not
// survive urlencoded numbers.

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub stock_status: Option<String>,
    pub sort: Option<ProductSort>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductListParams {
    pub fn page_request(&self, default_per_page: u32) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }

    pub fn query(&self) -> Result<ProductQuery, Rejection> {
        Ok(ProductQuery {
            search: self.search.clone(),
            category: non_empty(&self.category),
            status: parse_opt::<ProductStatus>(&self.status)?,
            stock_status: parse_opt::<StockStatus>(&self.stock_status)?,
            sort: self.sort.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, ORDERS_PER_PAGE)
    }

    pub fn purchase_query(&self) -> Result<OrderQuery<PurchaseOrderStatus>, Rejection> {
        Ok(OrderQuery {
            status: parse_opt(&self.status)?,
            search: self.search.clone(),
        })
    }

    pub fn sales_query(&self) -> Result<OrderQuery<SalesOrderStatus>, Rejection> {
        Ok(OrderQuery {
            status: parse_opt(&self.status)?,
            search: self.search.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierListParams {
    pub status: Option<String>,
}

impl SupplierListParams {
    pub fn status(&self) -> Result<Option<SupplierStatus>, Rejection> {
        parse_opt(&self.status)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesReportParams {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    pub period: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Comma-separated metric names; empty selects every metric.
    pub metrics: Option<String>,
}

impl TrendParams {
    pub fn granularity(&self) -> Result<Granularity, Rejection> {
        Ok(parse_opt(&self.period)?.unwrap_or_default())
    }

    pub fn metrics(&self) -> Result<Vec<TrendMetric>, Rejection> {
        let mut metrics = Vec::new();
        for name in self.metrics.as_deref().unwrap_or_default().split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let metric = errors::parse_param::<TrendMetric>(name)?;
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        Ok(metrics)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceParams {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

impl PerformanceParams {
    pub fn sort(&self) -> Result<PerformanceSort, Rejection> {
        Ok(parse_opt(&self.sort_by)?.unwrap_or_default())
    }

    pub fn category(&self) -> Option<String> {
        non_empty(&self.category)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_opt<T>(value: &Option<String>) -> Result<Option<T>, Rejection>
where
    T: core::str::FromStr<Err = inventaris_core::DomainError>,
{
    non_empty(value)
        .map(|v| errors::parse_param::<T>(&v))
        .transpose()
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// A page of rows with the totals clients need for pagination controls.
#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl<T> From<Page<T>> for PageBody<T> {
    fn from(page: Page<T>) -> Self {
        let (last_page, from, to) = (page.total_pages().max(1), page.from(), page.to());
        Self {
            data: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            last_page,
            from,
            to,
        }
    }
}

/// Product fields plus its derived stock classification.
pub fn product_to_json(product: &Product) -> Result<serde_json::Value, axum::response::Response> {
    let mut value = errors::to_json(product)?;
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "stock_status".into(),
            product.stock_status().as_str().into(),
        );
        map.insert(
            "stock_value".into(),
            product.stock_value().minor().into(),
        );
    }
    Ok(value)
}
