//! Inventory efficiency: how long current stock lasts at the recent sales
//! rate, and how much to reorder to cover a month.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use inventaris_core::{Money, ProductId};
use inventaris_products::Product;
use inventaris_sales::{SalesOrder, SalesOrderStatus};

use crate::round2;

/// Days before today that count towards the sales velocity. The window
/// includes today, so it spans one day more.
pub const VELOCITY_WINDOW_DAYS: u64 = 30;
/// Days of cover the reorder suggestion aims for.
pub const TARGET_COVER_DAYS: f64 = 30.0;
/// Beyond this many days of cover stock counts as excess.
pub const EXCESS_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyStatus {
    OutOfStock,
    LowStock,
    Excess,
    Optimal,
}

impl EfficiencyStatus {
    fn rank(self) -> u8 {
        match self {
            EfficiencyStatus::OutOfStock => 0,
            EfficiencyStatus::LowStock => 1,
            EfficiencyStatus::Excess | EfficiencyStatus::Optimal => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockEfficiency {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub category: String,
    pub quantity: i64,
    pub min_stock: i64,
    pub value: Money,
    pub days_of_inventory: i64,
    /// Units sold per day over the velocity window.
    pub sales_velocity: f64,
    pub status: EfficiencyStatus,
    pub reorder_suggestion: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EfficiencySummary {
    pub total_stock_value: Money,
    pub total_products: usize,
    pub out_of_stock_products: usize,
    pub low_stock_products: usize,
    pub excess_stock_products: usize,
    pub optimal_stock_products: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryEfficiency {
    pub summary: EfficiencySummary,
    pub category_breakdown: BTreeMap<String, Money>,
    pub stock_items: Vec<StockEfficiency>,
}

pub fn inventory_efficiency(
    products: &[Product],
    sales: &[SalesOrder],
    today: NaiveDate,
) -> InventoryEfficiency {
    let since = today
        .checked_sub_days(Days::new(VELOCITY_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let window_days = (today - since).num_days() + 1;

    let mut sold: HashMap<ProductId, i64> = HashMap::new();
    for order in sales
        .iter()
        .filter(|o| o.status() != SalesOrderStatus::Cancelled)
        .filter(|o| (since..=today).contains(&o.order_date()))
    {
        for line in order.lines() {
            *sold.entry(line.product_id).or_default() += line.quantity;
        }
    }

    let mut summary = EfficiencySummary::default();
    let mut category_breakdown: BTreeMap<String, Money> = BTreeMap::new();
    let mut stock_items: Vec<StockEfficiency> = products
        .iter()
        .map(|p| {
            let units = sold.get(&p.id_typed()).copied().unwrap_or(0);
            let velocity = units as f64 / window_days as f64;
            stock_efficiency(p, velocity)
        })
        .collect();

    for item in &stock_items {
        summary.total_stock_value = summary.total_stock_value + item.value;
        match item.status {
            EfficiencyStatus::OutOfStock => summary.out_of_stock_products += 1,
            EfficiencyStatus::LowStock => summary.low_stock_products += 1,
            EfficiencyStatus::Excess => summary.excess_stock_products += 1,
            EfficiencyStatus::Optimal => summary.optimal_stock_products += 1,
        }
        let entry = category_breakdown
            .entry(item.category.clone())
            .or_insert(Money::ZERO);
        *entry = *entry + item.value;
    }
    summary.total_products = stock_items.len();

    stock_items.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then(a.days_of_inventory.cmp(&b.days_of_inventory))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    InventoryEfficiency {
        summary,
        category_breakdown,
        stock_items,
    }
}

fn stock_efficiency(product: &Product, velocity: f64) -> StockEfficiency {
    let quantity = product.stock();
    let min_stock = product.min_stock();
    let days_of_inventory = if velocity > 0.0 {
        (quantity as f64 / velocity).round() as i64
    } else {
        0
    };
    let status = if quantity <= 0 {
        EfficiencyStatus::OutOfStock
    } else if quantity <= min_stock {
        EfficiencyStatus::LowStock
    } else if days_of_inventory > EXCESS_DAYS {
        EfficiencyStatus::Excess
    } else {
        EfficiencyStatus::Optimal
    };
    StockEfficiency {
        product_id: product.id_typed(),
        product_name: product.name().to_string(),
        sku: product.sku().to_string(),
        category: product.category().to_string(),
        quantity,
        min_stock,
        value: product.stock_value(),
        days_of_inventory,
        sales_velocity: round2(velocity),
        status,
        reorder_suggestion: reorder_amount(quantity, min_stock, velocity),
    }
}

/// Units needed to hold a month of sales, and never less than the minimum.
pub fn reorder_amount(quantity: i64, min_stock: i64, velocity: f64) -> i64 {
    if velocity <= 0.0 {
        return (min_stock - quantity).max(0);
    }
    let target = ((velocity * TARGET_COVER_DAYS).ceil() as i64).max(min_stock);
    (target - quantity).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, date, product, sales_order_with};

    #[test]
    fn classifies_and_orders_items() {
        let empty = product("empty", "Office", 0, 5, 100);
        let low = product("low", "Office", 3, 5, 100);
        let slow = product("slow", "Home", 200, 5, 10);
        let fast = product("fast", "Home", 40, 5, 10);
        // 62 units over the 31-day window is two a day
        let sales = vec![
            sales_order_with("SO-1", at(2024, 3, 20), &[(&slow, 1, 20), (&fast, 62, 20)]),
            sales_order_with("SO-2", at(2024, 3, 30), &[(&slow, 1, 20)]),
            // before the window
            sales_order_with("SO-3", at(2024, 2, 1), &[(&fast, 500, 20)]),
        ];
        let products = [slow.clone(), fast.clone(), low.clone(), empty.clone()];

        let report = inventory_efficiency(&products, &sales, date(2024, 3, 31));
        let order: Vec<ProductId> = report.stock_items.iter().map(|i| i.product_id).collect();
        assert_eq!(
            order,
            vec![empty.id_typed(), low.id_typed(), fast.id_typed(), slow.id_typed()]
        );

        let fast_row = &report.stock_items[2];
        assert_eq!(fast_row.sales_velocity, 2.0);
        assert_eq!(fast_row.days_of_inventory, 20);
        assert_eq!(fast_row.status, EfficiencyStatus::Optimal);
        assert_eq!(fast_row.reorder_suggestion, 20);

        // 2 units over 31 days gives 3100 days of cover
        let slow_row = &report.stock_items[3];
        assert_eq!(slow_row.status, EfficiencyStatus::Excess);
        assert_eq!(slow_row.reorder_suggestion, 0);

        assert_eq!(report.stock_items[1].reorder_suggestion, 2);
        assert_eq!(report.summary.total_products, 4);
        assert_eq!(report.summary.out_of_stock_products, 1);
        assert_eq!(report.summary.low_stock_products, 1);
        assert_eq!(report.summary.excess_stock_products, 1);
        assert_eq!(report.summary.optimal_stock_products, 1);
        assert_eq!(report.summary.total_stock_value, Money::from_minor(2_700));
        assert_eq!(report.category_breakdown["Office"], Money::from_minor(300));
        assert_eq!(report.category_breakdown["Home"], Money::from_minor(2_400));
    }

    #[test]
    fn reorder_covers_a_month_but_never_below_minimum() {
        assert_eq!(reorder_amount(2, 10, 0.0), 8);
        assert_eq!(reorder_amount(20, 10, 0.0), 0);
        assert_eq!(reorder_amount(0, 10, 0.1), 10);
        assert_eq!(reorder_amount(5, 0, 1.5), 40);
    }
}
