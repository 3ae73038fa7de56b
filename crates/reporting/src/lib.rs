//! Reporting: dashboard figures and reports computed from loaded rows.
//!
//! Every function here is pure. Callers load the rows inside a unit of work
//! and pass the current time explicitly, which keeps the date-window logic
//! testable.

pub mod activity;
pub mod dashboard;
pub mod efficiency;
#[cfg(test)]
mod fixtures;
pub mod orders;
pub mod performance;
pub mod period;
pub mod sales;
pub mod stock;
pub mod trend;

pub use activity::{Activity, ActivityKind, recent_activities};
pub use dashboard::{DashboardStats, dashboard_stats};
pub use efficiency::{
    EfficiencyStatus, EfficiencySummary, InventoryEfficiency, StockEfficiency,
    inventory_efficiency,
};
pub use orders::{OrderKind, OrderStats, RecentOrder, order_stats, recent_orders};
pub use performance::{
    DEFAULT_PERFORMANCE_LIMIT, PerformanceQuery, PerformanceSort, PerformanceSummary,
    ProductPerformance, ProductPerformanceReport, product_performance,
};
pub use period::Period;
pub use sales::{DailySales, SalesReport, SalesSummary, TopProduct, sales_report};
pub use stock::{CategoryStock, MovementTotals, StockReport, StockSummary, stock_report};
pub use trend::{
    Granularity, MetricValue, TrendMetric, TrendPoint, TrendReport, TrendRows, trend_analysis,
};

/// Percentage change from `previous` to `current`, rounded to two decimals.
/// Zero when there is no previous value to compare against.
pub(crate) fn growth_percent(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
