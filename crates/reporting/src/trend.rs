//! Trend analysis: the requested window cut into daily, weekly, monthly or
//! quarterly buckets, with the chosen metrics computed per bucket.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, Money, ProductId};
use inventaris_inventory::StockTransaction;
use inventaris_products::Product;
use inventaris_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use inventaris_sales::{SalesOrder, SalesOrderStatus};

use crate::period::day_bounds;
use crate::round2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl core::str::FromStr for Granularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            other => Err(DomainError::validation(format!("unknown period: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Sales,
    Purchases,
    Profit,
    StockLevel,
    AvgOrderValue,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 5] = [
        TrendMetric::Sales,
        TrendMetric::Purchases,
        TrendMetric::Profit,
        TrendMetric::StockLevel,
        TrendMetric::AvgOrderValue,
    ];
}

impl core::str::FromStr for TrendMetric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales" => Ok(TrendMetric::Sales),
            "purchases" => Ok(TrendMetric::Purchases),
            "profit" => Ok(TrendMetric::Profit),
            "stock_level" => Ok(TrendMetric::StockLevel),
            "avg_order_value" => Ok(TrendMetric::AvgOrderValue),
            other => Err(DomainError::validation(format!("unknown metric: {other}"))),
        }
    }
}

/// One slice of the window. The first and last buckets are clipped to the
/// requested dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub fn buckets(granularity: Granularity, from: NaiveDate, to: NaiveDate) -> Vec<Bucket> {
    let mut out = Vec::new();
    let mut start = align(granularity, from);
    while start <= to {
        let next = advance(granularity, start);
        let end = next.and_then(|n| n.pred_opt()).map_or(to, |last| last.min(to));
        out.push(Bucket {
            label: label(granularity, start),
            from: start.max(from),
            to: end,
        });
        match next {
            Some(next) => start = next,
            None => break,
        }
    }
    out
}

fn align(granularity: Granularity, date: NaiveDate) -> NaiveDate {
    match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(date),
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
        Granularity::Quarterly => {
            let month = (date.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
        }
    }
}

fn advance(granularity: Granularity, start: NaiveDate) -> Option<NaiveDate> {
    match granularity {
        Granularity::Daily => start.succ_opt(),
        Granularity::Weekly => start.checked_add_days(Days::new(7)),
        Granularity::Monthly => start.checked_add_months(Months::new(1)),
        Granularity::Quarterly => start.checked_add_months(Months::new(3)),
    }
}

fn label(granularity: Granularity, start: NaiveDate) -> String {
    match granularity {
        Granularity::Daily => start.format("%Y-%m-%d").to_string(),
        Granularity::Weekly => {
            let week = start.iso_week();
            format!("Week {} {}", week.week(), week.year())
        }
        Granularity::Monthly => start.format("%b %Y").to_string(),
        Granularity::Quarterly => format!("Q{} {}", start.month0() / 3 + 1, start.year()),
    }
}

/// Non-cancelled orders dated within a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub count: usize,
    pub total_amount: Money,
    pub average_amount: Money,
    pub item_count: i64,
}

impl OrderTotals {
    fn collect(orders: impl Iterator<Item = (Money, i64)>) -> Self {
        let mut totals = OrderTotals::default();
        for (amount, items) in orders {
            totals.count += 1;
            totals.total_amount = totals.total_amount + amount;
            totals.item_count += items;
        }
        if totals.count > 0 {
            totals.average_amount =
                Money::from_minor(totals.total_amount.minor() / totals.count as i64);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitFigures {
    /// Sales minus purchases in minor units; negative when purchases exceed sales.
    pub gross_profit: i64,
    pub margin_percent: f64,
}

/// Stock on hand at the end of a bucket, rebuilt from the movement log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub total_products: usize,
    pub total_units: i64,
    pub low_stock_products: usize,
    pub out_of_stock_products: usize,
    pub total_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Orders(OrderTotals),
    Profit(ProfitFigures),
    StockLevel(StockLevel),
    AverageOrder { average: Money },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub metrics: BTreeMap<TrendMetric, MetricValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub period: Granularity,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub points: Vec<TrendPoint>,
}

/// Rows a trend report is computed from. `transactions` must cover every
/// movement from the start of the window until now for `stock_level` to be
/// exact.
#[derive(Debug, Clone, Copy)]
pub struct TrendRows<'a> {
    pub sales: &'a [SalesOrder],
    pub purchases: &'a [PurchaseOrder],
    pub products: &'a [Product],
    pub transactions: &'a [StockTransaction],
}

pub fn trend_analysis(
    granularity: Granularity,
    from: NaiveDate,
    to: NaiveDate,
    metrics: &[TrendMetric],
    rows: TrendRows<'_>,
) -> TrendReport {
    let points = buckets(granularity, from, to)
        .into_iter()
        .map(|bucket| {
            let sales = sales_totals(rows.sales, &bucket);
            let purchases = purchase_totals(rows.purchases, &bucket);
            let metrics = metrics
                .iter()
                .map(|metric| {
                    let value = match metric {
                        TrendMetric::Sales => MetricValue::Orders(sales.clone()),
                        TrendMetric::Purchases => MetricValue::Orders(purchases.clone()),
                        TrendMetric::Profit => MetricValue::Profit(profit(&sales, &purchases)),
                        TrendMetric::StockLevel => MetricValue::StockLevel(stock_level_at(
                            rows.products,
                            rows.transactions,
                            bucket.to,
                        )),
                        TrendMetric::AvgOrderValue => MetricValue::AverageOrder {
                            average: sales.average_amount,
                        },
                    };
                    (*metric, value)
                })
                .collect();
            TrendPoint {
                label: bucket.label,
                from: bucket.from,
                to: bucket.to,
                metrics,
            }
        })
        .collect();

    TrendReport {
        period: granularity,
        from,
        to,
        points,
    }
}

fn sales_totals(orders: &[SalesOrder], bucket: &Bucket) -> OrderTotals {
    OrderTotals::collect(
        orders
            .iter()
            .filter(|o| o.status() != SalesOrderStatus::Cancelled)
            .filter(|o| (bucket.from..=bucket.to).contains(&o.order_date()))
            .map(|o| (o.total_amount(), o.lines().iter().map(|l| l.quantity).sum())),
    )
}

fn purchase_totals(orders: &[PurchaseOrder], bucket: &Bucket) -> OrderTotals {
    OrderTotals::collect(
        orders
            .iter()
            .filter(|o| o.status() != PurchaseOrderStatus::Cancelled)
            .filter(|o| (bucket.from..=bucket.to).contains(&o.order_date()))
            .map(|o| (o.total_amount(), o.lines().iter().map(|l| l.quantity).sum())),
    )
}

fn profit(sales: &OrderTotals, purchases: &OrderTotals) -> ProfitFigures {
    let revenue = sales.total_amount.minor();
    let gross_profit = revenue - purchases.total_amount.minor();
    let margin_percent = if revenue > 0 {
        round2(gross_profit as f64 / revenue as f64 * 100.0)
    } else {
        0.0
    };
    ProfitFigures {
        gross_profit,
        margin_percent,
    }
}

/// Current stock minus every movement booked after the end of `date`.
fn stock_level_at(
    products: &[Product],
    transactions: &[StockTransaction],
    date: NaiveDate,
) -> StockLevel {
    let (_, end) = day_bounds(date);
    let mut later: HashMap<ProductId, i64> = HashMap::new();
    for t in transactions.iter().filter(|t| t.created_at > end) {
        *later.entry(t.product_id).or_default() += t.delta();
    }

    let mut level = StockLevel::default();
    for product in products.iter().filter(|p| p.created_at() <= end) {
        let booked_later = later.get(&product.id_typed()).copied().unwrap_or(0);
        let stock = (product.stock() - booked_later).max(0);
        level.total_products += 1;
        level.total_units += stock;
        if stock == 0 {
            level.out_of_stock_products += 1;
        }
        if stock <= product.min_stock() {
            level.low_stock_products += 1;
        }
        level.total_value = level.total_value
            + Money::from_minor(product.purchase_price().minor().saturating_mul(stock));
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, date, movement, product, purchase_order, sales_order};
    use inventaris_inventory::MovementKind;

    fn labels(buckets: &[Bucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn weekly_buckets_align_to_monday_and_clip() {
        // 2024-03-06 is a Wednesday.
        let weeks = buckets(Granularity::Weekly, date(2024, 3, 6), date(2024, 3, 20));
        assert_eq!(labels(&weeks), vec!["Week 10 2024", "Week 11 2024", "Week 12 2024"]);
        assert_eq!(weeks[0].from, date(2024, 3, 6));
        assert_eq!(weeks[0].to, date(2024, 3, 10));
        assert_eq!(weeks[1].from, date(2024, 3, 11));
        assert_eq!(weeks[2].to, date(2024, 3, 20));
    }

    #[test]
    fn monthly_and_quarterly_labels() {
        let months = buckets(Granularity::Monthly, date(2024, 1, 15), date(2024, 3, 2));
        assert_eq!(labels(&months), vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
        assert_eq!(months[1].to, date(2024, 2, 29));

        let quarters = buckets(Granularity::Quarterly, date(2023, 11, 1), date(2024, 4, 1));
        assert_eq!(labels(&quarters), vec!["Q4 2023", "Q1 2024", "Q2 2024"]);
        assert_eq!(quarters[2].from, date(2024, 4, 1));
        assert_eq!(quarters[2].to, date(2024, 4, 1));
    }

    #[test]
    fn daily_buckets_cover_every_day() {
        let days = buckets(Granularity::Daily, date(2024, 2, 28), date(2024, 3, 1));
        assert_eq!(labels(&days), vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
    }

    #[test]
    fn profit_and_order_metrics_per_bucket() {
        let sales = vec![
            sales_order("SO-1", at(2024, 3, 1)),
            sales_order("SO-2", at(2024, 3, 1)),
            sales_order("SO-3", at(2024, 3, 2)),
        ];
        let purchases = vec![purchase_order("PO-1", at(2024, 3, 1))];
        let rows = TrendRows {
            sales: &sales,
            purchases: &purchases,
            products: &[],
            transactions: &[],
        };

        let report = trend_analysis(
            Granularity::Daily,
            date(2024, 3, 1),
            date(2024, 3, 2),
            &[TrendMetric::Sales, TrendMetric::Profit, TrendMetric::AvgOrderValue],
            rows,
        );

        assert_eq!(report.points.len(), 2);
        let first = &report.points[0].metrics;
        match &first[&TrendMetric::Sales] {
            MetricValue::Orders(totals) => {
                assert_eq!(totals.count, 2);
                assert_eq!(totals.total_amount, Money::from_minor(2_000));
                assert_eq!(totals.item_count, 2);
            }
            other => panic!("unexpected sales value: {other:?}"),
        }
        assert_eq!(
            first[&TrendMetric::Profit],
            MetricValue::Profit(ProfitFigures {
                gross_profit: 1_000,
                margin_percent: 50.0,
            })
        );
        assert_eq!(
            report.points[1].metrics[&TrendMetric::AvgOrderValue],
            MetricValue::AverageOrder {
                average: Money::from_minor(1_000)
            }
        );
        assert!(!first.contains_key(&TrendMetric::Purchases));
    }

    #[test]
    fn stock_level_rewinds_later_movements() {
        // Created 2024-01-01 with 10 on hand; 4 shipped on 2024-03-05.
        let mug = product("mug", "Kitchen", 6, 5, 100);
        let transactions = vec![movement(&mug, MovementKind::Out, 4, Some(300), at(2024, 3, 5))];
        let rows = TrendRows {
            sales: &[],
            purchases: &[],
            products: std::slice::from_ref(&mug),
            transactions: &transactions,
        };

        let report = trend_analysis(
            Granularity::Daily,
            date(2024, 3, 4),
            date(2024, 3, 5),
            &[TrendMetric::StockLevel],
            rows,
        );
        let level = |i: usize| match &report.points[i].metrics[&TrendMetric::StockLevel] {
            MetricValue::StockLevel(level) => level.clone(),
            other => panic!("unexpected stock value: {other:?}"),
        };
        assert_eq!(level(0).total_units, 10);
        assert_eq!(level(0).low_stock_products, 0);
        assert_eq!(level(1).total_units, 6);
        assert_eq!(level(1).total_value, Money::from_minor(600));
    }
}
