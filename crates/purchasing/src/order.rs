use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{
    DomainError, DomainResult, Entity, Money, ProductId, PurchaseOrderId, SupplierId,
};

const MAX_NUMBER_LEN: usize = 50;

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Approved,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseOrderStatus::Pending),
            "approved" => Ok(PurchaseOrderStatus::Approved),
            "received" => Ok(PurchaseOrderStatus::Received),
            "cancelled" => Ok(PurchaseOrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status: {other}"
            ))),
        }
    }
}

/// Purchase order line item.
///
/// `product_name` is copied from the catalog when the order is written so the
/// order stays readable if the product is renamed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
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
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<LineItem>,
}

/// Changes to a pending order. `lines`, when present, replaces every line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseOrderUpdate {
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Option<Vec<LineItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrderParts {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: PurchaseOrderStatus,
    pub total_amount: Money,
    pub lines: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchase order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    po_number: String,
    supplier_id: Option<SupplierId>,
    supplier_name: Option<String>,
    order_date: NaiveDate,
    expected_delivery: Option<NaiveDate>,
    notes: Option<String>,
    status: PurchaseOrderStatus,
    total_amount: Money,
    lines: Vec<LineItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn create(
        id: PurchaseOrderId,
        input: NewPurchaseOrder,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let po_number = validate_number(&input.po_number)?;
        let supplier_name = clean(input.supplier_name);
        if input.supplier_id.is_none() && supplier_name.is_none() {
            return Err(DomainError::validation(
                "either supplier_id or supplier_name is required",
            ));
        }
        let total_amount = total_of(&input.lines)?;

        Ok(Self {
            id,
            po_number,
            supplier_id: input.supplier_id,
            supplier_name,
            order_date: input.order_date,
            expected_delivery: input.expected_delivery,
            notes: clean(input.notes),
            status: PurchaseOrderStatus::Pending,
            total_amount,
            lines: input.lines,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: PurchaseOrderParts) -> Self {
        Self {
            id: parts.id,
            po_number: parts.po_number,
            supplier_id: parts.supplier_id,
            supplier_name: parts.supplier_name,
            order_date: parts.order_date,
            expected_delivery: parts.expected_delivery,
            notes: parts.notes,
            status: parts.status,
            total_amount: parts.total_amount,
            lines: parts.lines,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> Option<&str> {
        self.supplier_name.as_deref()
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn expected_delivery(&self) -> Option<NaiveDate> {
        self.expected_delivery
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn lines(&self) -> &[LineItem] {
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

    /// Reason recorded on the stock movements created by [`PurchaseOrder::receive`].
    pub fn receipt_reason(&self) -> String {
        format!("Stock received from PO: {}", self.po_number)
    }

    /// Only pending orders may be edited or deleted.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending purchase orders can be modified",
            ));
        }
        Ok(())
    }

    pub fn apply_update(
        &mut self,
        update: PurchaseOrderUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;

        let supplier_id = update.supplier_id.or(self.supplier_id);
        let supplier_name = match update.supplier_name {
            Some(name) => clean(Some(name)),
            None => self.supplier_name.clone(),
        };
        if supplier_id.is_none() && supplier_name.is_none() {
            return Err(DomainError::validation(
                "either supplier_id or supplier_name is required",
            ));
        }
        let total_amount = match &update.lines {
            Some(lines) => total_of(lines)?,
            None => self.total_amount,
        };

        self.supplier_id = supplier_id;
        self.supplier_name = supplier_name;
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

    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending purchase orders can be approved",
            ));
        }
        self.transition(PurchaseOrderStatus::Approved, now);
        Ok(())
    }

    /// Mark goods as received. The caller books one inbound stock movement per
    /// line in the same unit of work.
    pub fn receive(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Approved {
            return Err(DomainError::invariant(
                "cannot receive goods before purchase order is approved",
            ));
        }
        self.transition(PurchaseOrderStatus::Received, now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            PurchaseOrderStatus::Pending | PurchaseOrderStatus::Approved => {
                self.transition(PurchaseOrderStatus::Cancelled, now);
                Ok(())
            }
            PurchaseOrderStatus::Received => Err(DomainError::invariant(
                "cannot cancel a received purchase order",
            )),
            PurchaseOrderStatus::Cancelled => Err(DomainError::invariant(
                "purchase order is already cancelled",
            )),
        }
    }

    fn transition(&mut self, status: PurchaseOrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// `PO-YYYYMMDD-NNNN`, with `seq` reduced into `1..=9999`.
pub fn generate_po_number(date: NaiveDate, seq: u16) -> String {
    format!("PO-{}-{:04}", date.format("%Y%m%d"), (seq % 9999) + 1)
}

fn total_of(lines: &[LineItem]) -> DomainResult<Money> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "purchase order must have at least one line",
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
        return Err(DomainError::validation("po_number cannot be empty"));
    }
    if number.len() > MAX_NUMBER_LEN {
        return Err(DomainError::validation("po_number is too long"));
    }
    Ok(number.to_string())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
