use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::instrument;

use inventaris_core::DomainError;
use inventaris_infra::store::{
    ProductRepository, PurchaseOrderRepository, SalesOrderRepository, SupplierRepository,
    TransactionLog,
};
use inventaris_reporting::activity::ACTIVITY_WINDOW_DAYS;
use inventaris_reporting::{
    Activity, DEFAULT_PERFORMANCE_LIMIT, DashboardStats, Granularity, InventoryEfficiency,
    OrderStats, PerformanceQuery, PerformanceSort, Period, ProductPerformanceReport, RecentOrder,
    SalesReport, StockReport, TrendMetric, TrendReport, TrendRows, dashboard_stats,
    inventory_efficiency, order_stats, product_performance, recent_activities, recent_orders,
    sales_report, stock_report, trend_analysis,
};

use super::{AppServices, ServiceResult};

pub const DEFAULT_RECENT_ORDERS: usize = 5;

/// Longest window accepted by the sales report.
const MAX_REPORT_DAYS: i64 = 366;

/// Calendar years accepted for report dates.
const REPORT_YEARS: RangeInclusive<i32> = 1900..=9999;

/// Movement history loaded for the stock report.
const STOCK_REPORT_DAYS: i64 = 30;

/// Accepted row counts for the product performance report.
const PERFORMANCE_LIMITS: RangeInclusive<usize> = 5..=100;

impl AppServices {
    #[instrument(skip(self), err)]
    pub async fn dashboard_stats(&self) -> ServiceResult<DashboardStats> {
        let now = Utc::now();
        let window = Period::trailing_days(now, inventaris_reporting::dashboard::RECENT_TRANSACTION_DAYS);
        let mut uow = self.begin().await?;
        let products = uow.all_products().await?;
        let transactions = uow.transactions_between(window.from, window.to).await?;
        let suppliers = uow.list_suppliers(None).await?.len();
        Ok(dashboard_stats(&products, &transactions, suppliers, now))
    }

    pub async fn order_stats(&self) -> ServiceResult<OrderStats> {
        let mut uow = self.begin().await?;
        let sales = uow.all_sales_orders().await?;
        let purchases = uow.all_purchase_orders().await?;
        Ok(order_stats(&sales, &purchases, Utc::now()))
    }

    pub async fn recent_orders(&self, limit: Option<usize>) -> ServiceResult<Vec<RecentOrder>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_ORDERS).clamp(1, 100);
        let mut uow = self.begin().await?;
        let sales = uow.all_sales_orders().await?;
        let purchases = uow.all_purchase_orders().await?;
        Ok(recent_orders(&sales, &purchases, limit))
    }

    #[instrument(skip(self), err)]
    pub async fn stock_report(&self) -> ServiceResult<StockReport> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let products = uow.all_products().await?;
        let transactions = uow
            .transactions_between(now - Duration::days(STOCK_REPORT_DAYS), now)
            .await?;
        Ok(stock_report(&products, &transactions, now))
    }

    /// Sales over `[date_from, date_to]`, defaulting to month-to-date.
    #[instrument(skip(self), err)]
    pub async fn sales_report(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> ServiceResult<SalesReport> {
        let period = report_window(date_from, date_to, Utc::now())?;

        // The preceding window is needed for the growth figure.
        let load_from = period.preceding().map_or(period.from, |p| p.from);
        let mut uow = self.begin().await?;
        let transactions = uow.transactions_between(load_from, period.to).await?;
        let products = uow.all_products().await?;
        Ok(sales_report(&transactions, &products, period))
    }

    /// Sales, purchases, profit, stock and order value per bucket. An empty
    /// `metrics` selects all of them.
    #[instrument(skip(self), err)]
    pub async fn trend_analysis(
        &self,
        granularity: Granularity,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        metrics: Vec<TrendMetric>,
    ) -> ServiceResult<TrendReport> {
        let now = Utc::now();
        let period = report_window(date_from, date_to, now)?;
        let metrics = if metrics.is_empty() {
            TrendMetric::ALL.to_vec()
        } else {
            metrics
        };

        let mut uow = self.begin().await?;
        let sales = uow.all_sales_orders().await?;
        let purchases = uow.all_purchase_orders().await?;
        let products = uow.all_products().await?;
        // Stock levels are rewound from today, so every later movement counts.
        let transactions = if metrics.contains(&TrendMetric::StockLevel) {
            uow.transactions_between(period.from, now.max(period.to)).await?
        } else {
            Vec::new()
        };
        let rows = TrendRows {
            sales: &sales,
            purchases: &purchases,
            products: &products,
            transactions: &transactions,
        };
        Ok(trend_analysis(
            granularity,
            period.from.date_naive(),
            period.to.date_naive(),
            &metrics,
            rows,
        ))
    }

    #[instrument(skip(self), err)]
    pub async fn product_performance(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        category: Option<String>,
        sort: PerformanceSort,
        limit: Option<usize>,
    ) -> ServiceResult<ProductPerformanceReport> {
        let limit = limit.unwrap_or(DEFAULT_PERFORMANCE_LIMIT);
        if !PERFORMANCE_LIMITS.contains(&limit) {
            return Err(DomainError::validation(format!(
                "limit must be within {}..={}",
                PERFORMANCE_LIMITS.start(),
                PERFORMANCE_LIMITS.end()
            ))
            .into());
        }
        let period = report_window(date_from, date_to, Utc::now())?;
        let query = PerformanceQuery {
            from: period.from.date_naive(),
            to: period.to.date_naive(),
            category: category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            sort,
            limit,
        };

        let mut uow = self.begin().await?;
        let sales = uow.all_sales_orders().await?;
        let products = uow.all_products().await?;
        Ok(product_performance(&sales, &products, &query))
    }

    #[instrument(skip(self), err)]
    pub async fn inventory_efficiency(&self) -> ServiceResult<InventoryEfficiency> {
        let mut uow = self.begin().await?;
        let products = uow.all_products().await?;
        let sales = uow.all_sales_orders().await?;
        Ok(inventory_efficiency(&products, &sales, Utc::now().date_naive()))
    }

    pub async fn recent_activities(&self) -> ServiceResult<Vec<Activity>> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let products = uow.all_products().await?;
        let transactions = uow
            .transactions_between(now - Duration::days(ACTIVITY_WINDOW_DAYS), now)
            .await?;
        Ok(recent_activities(&products, &transactions, now))
    }
}

/// Resolve an optional `[date_from, date_to]` pair into a bounded window.
/// Missing ends default to the start of the current month and today.
fn report_window(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> ServiceResult<Period> {
    for date in [date_from, date_to].into_iter().flatten() {
        if !REPORT_YEARS.contains(&date.year()) {
            return Err(DomainError::validation(format!(
                "report dates must fall within years {}..={}",
                REPORT_YEARS.start(),
                REPORT_YEARS.end()
            ))
            .into());
        }
    }

    let period = match (date_from, date_to) {
        (None, None) => Period::month_to_date(now),
        (from, to) => {
            let from = from.unwrap_or_else(|| Period::month_to_date(now).from.date_naive());
            let to = to.unwrap_or_else(|| now.date_naive());
            if from > to {
                return Err(DomainError::validation("date_from must not be after date_to").into());
            }
            Period::from_dates(from, to)
        }
    };
    if period.to - period.from > Duration::days(MAX_REPORT_DAYS) {
        return Err(DomainError::validation(format!(
            "report window is limited to {MAX_REPORT_DAYS} days"
        ))
        .into());
    }
    Ok(period)
}
