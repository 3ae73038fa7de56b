use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, DomainResult, Entity, Money, ProductId, SalesOrderId};

const MAX_NUMBER_LEN: usize = 50;

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Pending => "pending",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::Shipped => "shipped",
            SalesOrderStatus::Delivered => "delivered",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for SalesOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SalesOrderStatus::Pending),
            "confirmed" => Ok(SalesOrderStatus::Confirmed),
            "shipped" => Ok(SalesOrderStatus::Shipped),
            "delivered" => Ok(SalesOrderStatus::Delivered),
            "cancelled" => Ok(SalesOrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown sales order status: {other}"
            ))),
        }
    }
}

/// Sales order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> DomainResult<Money> {
        self.unit_price.checked_mul(self.quantity)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if self.product_name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSalesOrder {
    pub so_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub lines: Vec<OrderLine>,
}

/// Changes to a pending order. `lines`, when present, replaces every line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesOrderUpdate {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub lines: Option<Vec<OrderLine>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrderParts {
    pub id: SalesOrderId,
    pub so_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub status: SalesOrderStatus,
    pub total_amount: Money,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    so_number: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    order_date: NaiveDate,
    expected_delivery: Option<NaiveDate>,
    shipping_address: String,
    notes: Option<String>,
    status: SalesOrderStatus,
    total_amount: Money,
    lines: Vec<OrderLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SalesOrder {
    pub fn create(id: SalesOrderId, input: NewSalesOrder, now: DateTime<Utc>) -> DomainResult<Self> {
        let so_number = validate_number(&input.so_number)?;
        let customer_name = required(&input.customer_name, "customer_name")?;
        let shipping_address = required(&input.shipping_address, "shipping_address")?;
        let total_amount = total_of(&input.lines)?;

        Ok(Self {
            id,
            so_number,
            customer_name,
            customer_email: clean(input.customer_email),
            customer_phone: clean(input.customer_phone),
            order_date: input.order_date,
            expected_delivery: input.expected_delivery,
            shipping_address,
            notes: clean(input.notes),
            status: SalesOrderStatus::Pending,
            total_amount,
            lines: input.lines,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: SalesOrderParts) -> Self {
        Self {
            id: parts.id,
            so_number: parts.so_number,
            customer_name: parts.customer_name,
            customer_email: parts.customer_email,
            customer_phone: parts.customer_phone,
            order_date: parts.order_date,
            expected_delivery: parts.expected_delivery,
            shipping_address: parts.shipping_address,
            notes: parts.notes,
            status: parts.status,
            total_amount: parts.total_amount,
            lines: parts.lines,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn so_number(&self) -> &str {
        &self.so_number
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_email.as_deref()
    }

    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn expected_delivery(&self) -> Option<NaiveDate> {
        self.expected_delivery
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    /// Reason recorded on the stock movements created by [`SalesOrder::ship`].
    pub fn shipment_reason(&self) -> String {
        format!("Stock shipped for SO: {}", self.so_number)
    }

    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status != SalesOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending sales orders can be modified",
            ));
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: SalesOrderUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;

        let customer_name = update
            .customer_name
            .as_deref()
            .map(|v| required(v, "customer_name"))
            .transpose()?;
        let shipping_address = update
            .shipping_address
            .as_deref()
            .map(|v| required(v, "shipping_address"))
            .transpose()?;
        let total_amount = match &update.lines {
            Some(lines) => total_of(lines)?,
            None => self.total_amount,
        };

        if let Some(name) = customer_name {
            self.customer_name = name;
        }
        if let Some(address) = shipping_address {
            self.shipping_address = address;
        }
        if update.customer_email.is_some() {
            self.customer_email = clean(update.customer_email);
        }
        if update.customer_phone.is_some() {
            self.customer_phone = clean(update.customer_phone);
        }
        if let Some(date) = update.order_date {
            self.order_date = date;
        }
        if update.expected_delivery.is_some() {
            self.expected_delivery = update.expected_delivery;
        }
        if update.notes.is_some() {
            self.notes = clean(update.notes);
        }
        if let Some(lines) = update.lines {
            self.lines = lines;
        }
        self.total_amount = total_amount;
        self.updated_at = now;
        Ok(())
    }

    /// Caller re-checks availability of every line before confirming.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != SalesOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending sales orders can be confirmed",
            ));
        }
        self.transition(SalesOrderStatus::Confirmed, now);
        Ok(())
    }

    /// Mark as shipped. The caller books one outbound stock movement per line
    /// in the same unit of work.
    pub fn ship(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != SalesOrderStatus::Confirmed {
            return Err(DomainError::invariant(
                "only confirmed sales orders can be shipped",
            ));
        }
        self.transition(SalesOrderStatus::Shipped, now);
        Ok(())
    }

    pub fn deliver(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != SalesOrderStatus::Shipped {
            return Err(DomainError::invariant(
                "only shipped sales orders can be delivered",
            ));
        }
        self.transition(SalesOrderStatus::Delivered, now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            SalesOrderStatus::Pending | SalesOrderStatus::Confirmed => {
                self.transition(SalesOrderStatus::Cancelled, now);
                Ok(())
            }
            SalesOrderStatus::Shipped | SalesOrderStatus::Delivered => Err(DomainError::invariant(
                "cannot cancel a shipped or delivered sales order",
            )),
            SalesOrderStatus::Cancelled => {
                Err(DomainError::invariant("sales order is already cancelled"))
            }
        }
    }

    fn transition(&mut self, status: SalesOrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

impl Entity for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// `SO-YYYYMMDD-NNNN`, with `seq` reduced into `1..=9999`.
pub fn generate_so_number(date: NaiveDate, seq: u16) -> String {
    format!("SO-{}-{:04}", date.format("%Y%m%d"), (seq % 9999) + 1)
}

fn total_of(lines: &[OrderLine]) -> DomainResult<Money> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "sales order must have at least one line",
        ));
    }
    lines.iter().try_fold(Money::ZERO, |acc, line| {
        line.validate()?;
        acc.checked_add(line.subtotal()?)
    })
}

fn validate_number(number: &str) -> DomainResult<String> {
    let number = number.trim();
    if number.is_empty() {
        return Err(DomainError::validation("so_number cannot be empty"));
    }
    if number.len() > MAX_NUMBER_LEN {
        return Err(DomainError::validation("so_number is too long"));
    }
    Ok(number.to_string())
}

fn required(value: &str, field: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn line(quantity: i64, unit_price: i64) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(),
            product_name: "USB Cable".into(),
            quantity,
            unit_price: Money::from_minor(unit_price),
        }
    }

    fn new_order() -> NewSalesOrder {
        NewSalesOrder {
            so_number: "SO-20240615-0001".into(),
            customer_name: "Toko Sinar".into(),
            customer_email: None,
            customer_phone: None,
            order_date: test_date(),
            expected_delivery: None,
            shipping_address: "Jl. Merdeka 1, Bandung".into(),
            notes: None,
            lines: vec![line(2, 2_500), line(1, 10_000)],
        }
    }

    fn pending_order() -> SalesOrder {
        SalesOrder::create(SalesOrderId::new(), new_order(), test_time()).unwrap()
    }

    #[test]
    fn create_computes_total() {
        let order = pending_order();
        assert_eq!(order.status(), SalesOrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::from_minor(15_000));
    }

    #[test]
    fn create_requires_shipping_address() {
        let mut input = new_order();
        input.shipping_address = " ".into();
        match SalesOrder::create(SalesOrderId::new(), input, test_time()) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("shipping_address")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_lifecycle() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        order.ship(test_time()).unwrap();
        order.deliver(test_time()).unwrap();
        assert_eq!(order.status(), SalesOrderStatus::Delivered);
    }

    #[test]
    fn cannot_ship_pending_order() {
        let mut order = pending_order();
        match order.ship(test_time()) {
            Err(DomainError::InvariantViolation(msg)) if msg.contains("confirmed") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        order.ship(test_time()).unwrap();
        assert!(order.cancel(test_time()).is_err());
        assert_eq!(order.status(), SalesOrderStatus::Shipped);
    }

    #[test]
    fn confirmed_orders_can_be_cancelled() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        order.cancel(test_time()).unwrap();
        assert_eq!(order.status(), SalesOrderStatus::Cancelled);
        assert!(order.cancel(test_time()).is_err());
    }

    #[test]
    fn confirmed_orders_are_not_editable() {
        let mut order = pending_order();
        order.confirm(test_time()).unwrap();
        let update = SalesOrderUpdate {
            notes: Some("leave at gate".into()),
            ..SalesOrderUpdate::default()
        };
        assert!(order.apply_update(update, test_time()).is_err());
    }

    #[test]
    fn shipment_reason_names_the_order() {
        assert_eq!(pending_order().shipment_reason(), "Stock shipped for SO: SO-20240615-0001");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

        #[test]
        fn total_tracks_line_subtotals_through_updates(
            first in proptest::collection::vec((1i64..1_000, 0i64..100_000), 1..20),
            second in proptest::collection::vec((1i64..1_000, 0i64..100_000), 1..20),
        ) {
            let input = NewSalesOrder {
                lines: first.iter().map(|(q, p)| line(*q, *p)).collect(),
                ..new_order()
            };
            let mut order = SalesOrder::create(SalesOrderId::new(), input, test_time()).unwrap();
            prop_assert_eq!(order.total_amount().minor(), first.iter().map(|(q, p)| q * p).sum::<i64>());

            let update = SalesOrderUpdate {
                lines: Some(second.iter().map(|(q, p)| line(*q, *p)).collect()),
                ..SalesOrderUpdate::default()
            };
            order.apply_update(update, test_time()).unwrap();
            prop_assert_eq!(order.total_amount().minor(), second.iter().map(|(q, p)| q * p).sum::<i64>());
        }
    }
}
