use chrono::{DateTime, Utc};
use serde::Serialize;

use inventaris_core::Money;
use inventaris_inventory::StockTransaction;
use inventaris_products::Product;

use crate::period::Period;

/// Window for the "recent transactions" dashboard counter.
pub const RECENT_TRANSACTION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub recent_transactions: usize,
    pub total_suppliers: usize,
    pub total_stock_value: Money,
}

pub fn dashboard_stats(
    products: &[Product],
    transactions: &[StockTransaction],
    total_suppliers: usize,
    now: DateTime<Utc>,
) -> DashboardStats {
    let window = Period::trailing_days(now, RECENT_TRANSACTION_DAYS);

    DashboardStats {
        total_products: products.len(),
        low_stock: products.iter().filter(|p| p.is_low_stock()).count(),
        out_of_stock: products.iter().filter(|p| p.stock() == 0).count(),
        recent_transactions: transactions
            .iter()
            .filter(|t| window.contains(t.created_at))
            .count(),
        total_suppliers,
        total_stock_value: products.iter().map(Product::stock_value).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, movement, product};
    use inventaris_inventory::MovementKind;

    #[test]
    fn counts_low_stock_and_recent_movements() {
        let pen = product("pen", "Office", 100, 10, 200);
        let ink = product("ink", "Office", 3, 10, 1_000);
        let paper = product("paper", "Office", 0, 5, 50);
        let now = at(2024, 4, 20);
        let transactions = vec![
            movement(&pen, MovementKind::In, 10, None, at(2024, 4, 18)),
            movement(&ink, MovementKind::Out, 2, Some(1_500), at(2024, 4, 14)),
            movement(&ink, MovementKind::In, 5, None, at(2024, 3, 1)),
        ];

        let stats = dashboard_stats(&[pen, ink, paper], &transactions, 4, now);
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.low_stock, 2);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.recent_transactions, 2);
        assert_eq!(stats.total_suppliers, 4);
        assert_eq!(stats.total_stock_value, Money::from_minor(100 * 200 + 3 * 1_000));
    }
}
