use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use inventaris_core::{DomainError, ProductId, SalesOrderId};
use inventaris_infra::store::{
    OrderQuery, Page, PageRequest, ProductRepository, SalesOrderRepository, TransactionLog,
    UnitOfWork,
};
use inventaris_inventory::{MovementDetails, MovementKind, StockTransaction, move_stock};
use inventaris_sales::{
    NewSalesOrder, OrderLine, SalesOrder, SalesOrderStatus, SalesOrderUpdate, generate_so_number,
};

use super::{
    AppServices, GENERATED_KEY_ATTEMPTS, OrderLineInput, ServiceError, ServiceResult, lock_products,
    resolve_lines,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSalesOrder {
    pub so_number: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSalesOrder {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub items: Option<Vec<OrderLineInput>>,
}

/// A shipped order and the outbound movements it booked.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentOutcome {
    pub order: SalesOrder,
    pub transactions: Vec<StockTransaction>,
}

impl AppServices {
    #[instrument(skip(self, input), fields(customer = %input.customer_name, items = input.items.len()), err)]
    pub async fn create_sales_order(&self, input: CreateSalesOrder) -> ServiceResult<SalesOrder> {
        let now = Utc::now();
        let mut uow = self.begin().await?;

        let lines = order_lines(uow.as_mut(), &input.items).await?;
        ensure_lines_available(uow.as_mut(), &lines).await?;
        let so_number = match input.so_number.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(number) => {
                if uow.so_number_exists(&number).await? {
                    return Err(
                        DomainError::conflict(format!("so_number '{number}' is already in use")).into(),
                    );
                }
                number
            }
            None => unused_so_number(uow.as_mut(), now.date_naive()).await?,
        };

        let order = SalesOrder::create(
            SalesOrderId::new(),
            NewSalesOrder {
                so_number,
                customer_name: input.customer_name,
                customer_email: input.customer_email,
                customer_phone: input.customer_phone,
                order_date: input.order_date.unwrap_or_else(|| now.date_naive()),
                expected_delivery: input.expected_delivery,
                shipping_address: input.shipping_address,
                notes: input.notes,
                lines,
            },
            now,
        )?;
        uow.insert_sales_order(&order).await?;
        uow.commit().await?;

        info!(
            sales_order_id = %order.id_typed(),
            so_number = order.so_number(),
            total = order.total_amount().minor(),
            "sales order created"
        );
        Ok(order)
    }

    pub async fn get_sales_order(&self, id: SalesOrderId) -> ServiceResult<SalesOrder> {
        let mut uow = self.begin().await?;
        uow.get_sales_order(id)
            .await?
            .ok_or(ServiceError::NotFound("sales order"))
    }

    pub async fn list_sales_orders(
        &self,
        query: &OrderQuery<SalesOrderStatus>,
        page: PageRequest,
    ) -> ServiceResult<Page<SalesOrder>> {
        let mut uow = self.begin().await?;
        Ok(uow.list_sales_orders(query, page).await?)
    }

    #[instrument(skip(self, input), err)]
    pub async fn update_sales_order(
        &self,
        id: SalesOrderId,
        input: UpdateSalesOrder,
    ) -> ServiceResult<SalesOrder> {
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        order.ensure_editable()?;

        let lines = match &input.items {
            Some(items) => {
                let lines = order_lines(uow.as_mut(), items).await?;
                ensure_lines_available(uow.as_mut(), &lines).await?;
                Some(lines)
            }
            None => None,
        };

        order.apply_update(
            SalesOrderUpdate {
                customer_name: input.customer_name,
                customer_email: input.customer_email,
                customer_phone: input.customer_phone,
                order_date: input.order_date,
                expected_delivery: input.expected_delivery,
                shipping_address: input.shipping_address,
                notes: input.notes,
                lines,
            },
            Utc::now(),
        )?;
        uow.update_sales_order(&order).await?;
        uow.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_sales_order(&self, id: SalesOrderId) -> ServiceResult<()> {
        let mut uow = self.begin().await?;
        let order = locked_order(uow.as_mut(), id).await?;
        order.ensure_editable()?;
        uow.delete_sales_order(id).await?;
        uow.commit().await?;
        info!(sales_order_id = %id, "sales order deleted");
        Ok(())
    }

    /// Confirm after re-checking that every line can still be served.
    #[instrument(skip(self), err)]
    pub async fn confirm_sales_order(&self, id: SalesOrderId) -> ServiceResult<SalesOrder> {
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        order.confirm(Utc::now())?;
        ensure_lines_available(uow.as_mut(), order.lines()).await?;
        uow.update_sales_order(&order).await?;
        uow.commit().await?;
        info!(sales_order_id = %id, status = order.status().as_str(), "sales order status changed");
        Ok(order)
    }

    /// Mark the order shipped and book one outbound movement per line. A line
    /// that cannot be served fails the whole shipment.
    #[instrument(skip(self), err)]
    pub async fn ship_sales_order(
        &self,
        id: SalesOrderId,
        actor: Option<String>,
    ) -> ServiceResult<ShipmentOutcome> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        order.ship(now)?;

        let reason = order.shipment_reason();
        let mut transactions = Vec::with_capacity(order.lines().len());
        let mut products = lock_products(
            uow.as_mut(),
            order.lines().iter().map(|line| line.product_id).collect(),
        )
        .await?;
        for line in order.lines() {
            let product = products
                .get_mut(&line.product_id)
                .ok_or(ServiceError::NotFound("product"))?;
            let details = MovementDetails {
                reason: reason.clone(),
                unit_price: Some(line.unit_price),
                reference: Some(order.so_number().to_string()),
                notes: None,
                performed_by: actor.clone(),
            };
            let tx = move_stock(product, MovementKind::Out, line.quantity, details, now)?;
            uow.update_product(product).await?;
            uow.record_transaction(&tx).await?;
            transactions.push(tx);
        }

        uow.update_sales_order(&order).await?;
        uow.commit().await?;

        info!(
            sales_order_id = %id,
            so_number = order.so_number(),
            lines = transactions.len(),
            "sales order shipped"
        );
        Ok(ShipmentOutcome {
            order,
            transactions,
        })
    }

    #[instrument(skip(self), err)]
    pub async fn deliver_sales_order(&self, id: SalesOrderId) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(id, |order, now| order.deliver(now))
            .await
    }

    #[instrument(skip(self), err)]
    pub async fn cancel_sales_order(&self, id: SalesOrderId) -> ServiceResult<SalesOrder> {
        self.transition_sales_order(id, |order, now| order.cancel(now))
            .await
    }

    async fn transition_sales_order<F>(&self, id: SalesOrderId, apply: F) -> ServiceResult<SalesOrder>
    where
        F: FnOnce(&mut SalesOrder, chrono::DateTime<Utc>) -> Result<(), DomainError> + Send,
    {
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        apply(&mut order, Utc::now())?;
        uow.update_sales_order(&order).await?;
        uow.commit().await?;
        info!(sales_order_id = %id, status = order.status().as_str(), "sales order status changed");
        Ok(order)
    }
}

async fn locked_order(uow: &mut dyn UnitOfWork, id: SalesOrderId) -> ServiceResult<SalesOrder> {
    uow.lock_sales_order(id)
        .await?
        .ok_or(ServiceError::NotFound("sales order"))
}

async fn order_lines(
    uow: &mut dyn UnitOfWork,
    items: &[OrderLineInput],
) -> ServiceResult<Vec<OrderLine>> {
    Ok(resolve_lines(uow, items)
        .await?
        .into_iter()
        .map(|(product, line)| OrderLine {
            product_id: line.product_id,
            product_name: product.name().to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect())
}

/// Lines naming the same product are summed before comparing with stock.
async fn ensure_lines_available(uow: &mut dyn UnitOfWork, lines: &[OrderLine]) -> ServiceResult<()> {
    let mut requested: BTreeMap<ProductId, i64> = BTreeMap::new();
    for line in lines {
        *requested.entry(line.product_id).or_default() += line.quantity;
    }
    for (product_id, quantity) in requested {
        let product = uow
            .get_product(product_id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        product.ensure_available(quantity)?;
    }
    Ok(())
}

async fn unused_so_number(uow: &mut dyn UnitOfWork, today: NaiveDate) -> ServiceResult<String> {
    for _ in 0..GENERATED_KEY_ATTEMPTS {
        let candidate = generate_so_number(today, rand::random::<u16>());
        if !uow.so_number_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(DomainError::conflict("could not generate an unused so_number").into())
}
