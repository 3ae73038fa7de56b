use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use inventaris_core::Money;
use inventaris_inventory::{LowStockAlert, MovementKind, StockTransaction, low_stock_alerts};
use inventaris_products::{Product, ProductStatus};

use crate::period::Period;

const LOW_STOCK_LIMIT: usize = 20;
const RECENT_MOVEMENT_LIMIT: usize = 20;
const MOVEMENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub total_products: usize,
    pub active_products: usize,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub total_units: i64,
    pub total_stock_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStock {
    pub category: String,
    pub product_count: usize,
    pub total_stock: i64,
    pub stock_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementTotals {
    pub kind: MovementKind,
    pub movements: usize,
    /// Sum of absolute stock changes.
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub summary: StockSummary,
    pub by_category: Vec<CategoryStock>,
    pub low_stock_products: Vec<LowStockAlert>,
    pub movements_last_30_days: Vec<MovementTotals>,
    pub recent_movements: Vec<StockTransaction>,
}

pub fn stock_report(
    products: &[Product],
    transactions: &[StockTransaction],
    now: DateTime<Utc>,
) -> StockReport {
    let summary = StockSummary {
        total_products: products.len(),
        active_products: products
            .iter()
            .filter(|p| p.status() == ProductStatus::Active)
            .count(),
        low_stock_items: products.iter().filter(|p| p.is_low_stock()).count(),
        out_of_stock_items: products.iter().filter(|p| p.stock() == 0).count(),
        total_units: products.iter().map(Product::stock).sum(),
        total_stock_value: products.iter().map(Product::stock_value).sum(),
    };

    let mut categories: BTreeMap<&str, CategoryStock> = BTreeMap::new();
    for product in products {
        let entry = categories
            .entry(product.category())
            .or_insert_with(|| CategoryStock {
                category: product.category().to_string(),
                product_count: 0,
                total_stock: 0,
                stock_value: Money::ZERO,
            });
        entry.product_count += 1;
        entry.total_stock += product.stock();
        entry.stock_value = entry.stock_value + product.stock_value();
    }

    let mut low_stock_products = low_stock_alerts(products);
    low_stock_products.truncate(LOW_STOCK_LIMIT);

    let window = Period::trailing_days(now, MOVEMENT_WINDOW_DAYS);
    let movements_last_30_days = [MovementKind::In, MovementKind::Out, MovementKind::Adjustment]
        .into_iter()
        .map(|kind| {
            let rows: Vec<&StockTransaction> = transactions
                .iter()
                .filter(|t| t.kind == kind && window.contains(t.created_at))
                .collect();
            MovementTotals {
                kind,
                movements: rows.len(),
                units: rows.iter().map(|t| t.delta().abs()).sum(),
            }
        })
        .collect();

    let mut recent_movements = transactions.to_vec();
    recent_movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_movements.truncate(RECENT_MOVEMENT_LIMIT);

    StockReport {
        summary,
        by_category: categories.into_values().collect(),
        low_stock_products,
        movements_last_30_days,
        recent_movements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, movement, product};

    #[test]
    fn groups_by_category_and_totals_recent_movements() {
        let pen = product("pen", "Office", 40, 10, 100);
        let cable = product("cable", "Electronics", 2, 5, 300);
        let mouse = product("mouse", "Electronics", 0, 5, 900);
        let now = at(2024, 6, 30);
        let transactions = vec![
            movement(&pen, MovementKind::In, 40, None, at(2024, 6, 10)),
            movement(&cable, MovementKind::Out, 3, Some(600), at(2024, 6, 20)),
            movement(&mouse, MovementKind::Out, 1, Some(1_800), at(2024, 4, 1)),
        ];

        let report = stock_report(&[pen, cable, mouse], &transactions, now);

        assert_eq!(report.summary.total_products, 3);
        assert_eq!(report.summary.low_stock_items, 2);
        assert_eq!(report.summary.out_of_stock_items, 1);
        assert_eq!(report.summary.total_stock_value, Money::from_minor(40 * 100 + 2 * 300));

        let categories: Vec<&str> = report.by_category.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["Electronics", "Office"]);
        assert_eq!(report.by_category[0].product_count, 2);

        assert_eq!(report.low_stock_products[0].name, "mouse");

        let outs = report
            .movements_last_30_days
            .iter()
            .find(|m| m.kind == MovementKind::Out)
            .unwrap();
        assert_eq!(outs.movements, 1);
        assert_eq!(outs.units, 3);
        assert_eq!(report.recent_movements.len(), 3);
    }
}
