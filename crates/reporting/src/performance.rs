use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, Money, ProductId};
use inventaris_products::Product;
use inventaris_sales::{SalesOrder, SalesOrderStatus};

use crate::round2;

pub const DEFAULT_PERFORMANCE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceSort {
    #[default]
    Revenue,
    Quantity,
    Profit,
    Margin,
}

impl core::str::FromStr for PerformanceSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "revenue" => Ok(PerformanceSort::Revenue),
            "quantity" => Ok(PerformanceSort::Quantity),
            "profit" => Ok(PerformanceSort::Profit),
            "margin" => Ok(PerformanceSort::Margin),
            other => Err(DomainError::validation(format!("unknown sort_by: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPerformance {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub units_sold: i64,
    pub revenue: Money,
    /// Units sold at the current purchase price.
    pub cost: Money,
    /// Revenue minus cost in minor units; negative for loss-making products.
    pub profit: i64,
    pub margin_percent: f64,
    pub current_stock: i64,
    /// Units sold over the average of opening and current stock.
    pub turnover_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_revenue: Money,
    pub total_profit: i64,
    pub average_margin: f64,
    pub products_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPerformanceReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: PerformanceSummary,
    pub products: Vec<ProductPerformance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub category: Option<String>,
    pub sort: PerformanceSort,
    pub limit: usize,
}

/// Per-product sales figures from the lines of non-cancelled sales orders
/// dated within the window. The summary covers the returned rows only.
pub fn product_performance(
    sales: &[SalesOrder],
    products: &[Product],
    query: &PerformanceQuery,
) -> ProductPerformanceReport {
    let mut sold: HashMap<ProductId, (i64, Money)> = HashMap::new();
    for order in sales
        .iter()
        .filter(|o| o.status() != SalesOrderStatus::Cancelled)
        .filter(|o| (query.from..=query.to).contains(&o.order_date()))
    {
        for line in order.lines() {
            let entry = sold.entry(line.product_id).or_insert((0, Money::ZERO));
            entry.0 += line.quantity;
            entry.1 = entry.1
                + Money::from_minor(line.unit_price.minor().saturating_mul(line.quantity));
        }
    }

    let mut rows: Vec<ProductPerformance> = products
        .iter()
        .filter(|p| query.category.as_deref().is_none_or(|c| p.category() == c))
        .filter_map(|p| {
            let (units_sold, revenue) = sold.get(&p.id_typed()).copied()?;
            Some(performance_row(p, units_sold, revenue))
        })
        .collect();

    rows.sort_by(|a, b| {
        let primary = match query.sort {
            PerformanceSort::Revenue => b.revenue.cmp(&a.revenue),
            PerformanceSort::Quantity => b.units_sold.cmp(&a.units_sold),
            PerformanceSort::Profit => b.profit.cmp(&a.profit),
            PerformanceSort::Margin => b.margin_percent.total_cmp(&a.margin_percent),
        };
        primary.then_with(|| a.product_id.cmp(&b.product_id))
    });
    rows.truncate(query.limit);

    let total_revenue: Money = rows.iter().map(|r| r.revenue).sum();
    let total_profit: i64 = rows.iter().map(|r| r.profit).sum();
    let summary = PerformanceSummary {
        total_revenue,
        total_profit,
        average_margin: margin(total_profit, total_revenue),
        products_analyzed: rows.len(),
    };

    ProductPerformanceReport {
        from: query.from,
        to: query.to,
        summary,
        products: rows,
    }
}

fn performance_row(product: &Product, units_sold: i64, revenue: Money) -> ProductPerformance {
    let cost = Money::from_minor(product.purchase_price().minor().saturating_mul(units_sold));
    let profit = revenue.minor() - cost.minor();
    let current_stock = product.stock();
    let turnover_rate = if current_stock > 0 {
        round2(units_sold as f64 / ((current_stock + units_sold) as f64 / 2.0))
    } else {
        0.0
    };
    ProductPerformance {
        product_id: product.id_typed(),
        name: product.name().to_string(),
        sku: product.sku().to_string(),
        category: product.category().to_string(),
        units_sold,
        revenue,
        cost,
        profit,
        margin_percent: margin(profit, revenue),
        current_stock,
        turnover_rate,
    }
}

fn margin(profit: i64, revenue: Money) -> f64 {
    if revenue.minor() > 0 {
        round2(profit as f64 / revenue.minor() as f64 * 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, date, product, sales_order_with};

    fn query(sort: PerformanceSort) -> PerformanceQuery {
        PerformanceQuery {
            from: date(2024, 3, 1),
            to: date(2024, 3, 31),
            category: None,
            sort,
            limit: DEFAULT_PERFORMANCE_LIMIT,
        }
    }

    #[test]
    fn ranks_products_and_computes_margins() {
        // cost 100 and 400 per unit
        let pen = product("pen", "Office", 10, 5, 100);
        let lamp = product("lamp", "Home", 0, 1, 400);
        let mut cancelled = sales_order_with("SO-3", at(2024, 3, 9), &[(&lamp, 50, 1_000)]);
        cancelled.cancel(at(2024, 3, 9)).unwrap();
        let sales = vec![
            sales_order_with("SO-1", at(2024, 3, 2), &[(&pen, 10, 150), (&lamp, 1, 500)]),
            sales_order_with("SO-2", at(2024, 3, 5), &[(&pen, 10, 150)]),
            cancelled,
            // outside the window
            sales_order_with("SO-4", at(2024, 4, 1), &[(&lamp, 9, 500)]),
        ];
        let catalog = [pen.clone(), lamp.clone()];

        let report = product_performance(&sales, &catalog, &query(PerformanceSort::Revenue));
        let ids: Vec<ProductId> = report.products.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![pen.id_typed(), lamp.id_typed()]);

        let pen_row = &report.products[0];
        assert_eq!(pen_row.units_sold, 20);
        assert_eq!(pen_row.revenue, Money::from_minor(3_000));
        assert_eq!(pen_row.profit, 1_000);
        assert_eq!(pen_row.margin_percent, 33.33);
        // 20 / ((10 + 20) / 2)
        assert_eq!(pen_row.turnover_rate, 1.33);

        let lamp_row = &report.products[1];
        assert_eq!(lamp_row.profit, 100);
        assert_eq!(lamp_row.turnover_rate, 0.0);

        let by_margin = product_performance(&sales, &catalog, &query(PerformanceSort::Margin));
        assert_eq!(by_margin.products[0].product_id, pen.id_typed());

        assert_eq!(report.summary.total_revenue, Money::from_minor(3_500));
        assert_eq!(report.summary.total_profit, 1_100);
        assert_eq!(report.summary.products_analyzed, 2);
    }

    #[test]
    fn category_filter_and_limit() {
        let pen = product("pen", "Office", 10, 5, 100);
        let ink = product("ink", "Office", 10, 5, 100);
        let lamp = product("lamp", "Home", 0, 1, 400);
        let sales = vec![sales_order_with(
            "SO-1",
            at(2024, 3, 2),
            &[(&pen, 1, 150), (&ink, 5, 150), (&lamp, 1, 500)],
        )];
        let catalog = [pen, ink.clone(), lamp];

        let mut q = query(PerformanceSort::Quantity);
        q.category = Some("Office".into());
        q.limit = 1;
        let report = product_performance(&sales, &catalog, &q);
        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].product_id, ink.id_typed());
        assert_eq!(report.summary.products_analyzed, 1);
    }
}
