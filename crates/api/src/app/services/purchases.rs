use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use inventaris_core::{DomainError, PurchaseOrderId, SupplierId};
use inventaris_infra::store::{
    OrderQuery, Page, PageRequest, ProductRepository, PurchaseOrderRepository, SupplierRepository,
    TransactionLog, UnitOfWork,
};
use inventaris_inventory::{MovementDetails, MovementKind, StockTransaction, move_stock};
use inventaris_purchasing::{
    LineItem, NewPurchaseOrder, PurchaseOrder, PurchaseOrderStatus, PurchaseOrderUpdate,
    generate_po_number,
};

use super::{
    AppServices, GENERATED_KEY_ATTEMPTS, OrderLineInput, ServiceError, ServiceResult, lock_products,
    resolve_lines,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseOrder {
    pub po_number: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePurchaseOrder {
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Option<Vec<OrderLineInput>>,
}

/// A received order and the inbound movements it booked.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReceiptOutcome {
    pub order: PurchaseOrder,
    pub transactions: Vec<StockTransaction>,
}

impl AppServices {
    #[instrument(skip(self, input), fields(items = input.items.len()), err)]
    pub async fn create_purchase_order(
        &self,
        input: CreatePurchaseOrder,
    ) -> ServiceResult<PurchaseOrder> {
        let now = Utc::now();
        let mut uow = self.begin().await?;

        let lines = line_items(uow.as_mut(), &input.items).await?;
        let supplier_name =
            supplier_name_for(uow.as_mut(), input.supplier_id, input.supplier_name).await?;
        let po_number = match input.po_number.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(number) => {
                if uow.po_number_exists(&number).await? {
                    return Err(
                        DomainError::conflict(format!("po_number '{number}' is already in use")).into(),
                    );
                }
                number
            }
            None => unused_po_number(uow.as_mut(), now.date_naive()).await?,
        };

        let order = PurchaseOrder::create(
            PurchaseOrderId::new(),
            NewPurchaseOrder {
                po_number,
                supplier_id: input.supplier_id,
                supplier_name,
                order_date: input.order_date.unwrap_or_else(|| now.date_naive()),
                expected_delivery: input.expected_delivery,
                notes: input.notes,
                lines,
            },
            now,
        )?;
        uow.insert_purchase_order(&order).await?;
        uow.commit().await?;

        info!(
            purchase_order_id = %order.id_typed(),
            po_number = order.po_number(),
            total = order.total_amount().minor(),
            "purchase order created"
        );
        Ok(order)
    }

    pub async fn get_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        let mut uow = self.begin().await?;
        uow.get_purchase_order(id)
            .await?
            .ok_or(ServiceError::NotFound("purchase order"))
    }

    pub async fn list_purchase_orders(
        &self,
        query: &OrderQuery<PurchaseOrderStatus>,
        page: PageRequest,
    ) -> ServiceResult<Page<PurchaseOrder>> {
        let mut uow = self.begin().await?;
        Ok(uow.list_purchase_orders(query, page).await?)
    }

    #[instrument(skip(self, input), err)]
    pub async fn update_purchase_order(
        &self,
        id: PurchaseOrderId,
        input: UpdatePurchaseOrder,
    ) -> ServiceResult<PurchaseOrder> {
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        order.ensure_editable()?;

        let lines = match &input.items {
            Some(items) => Some(line_items(uow.as_mut(), items).await?),
            None => None,
        };
        let supplier_name = match input.supplier_id {
            Some(supplier_id) => {
                supplier_name_for(uow.as_mut(), Some(supplier_id), input.supplier_name).await?
            }
            None => input.supplier_name,
        };

        order.apply_update(
            PurchaseOrderUpdate {
                supplier_id: input.supplier_id,
                supplier_name,
                order_date: input.order_date,
                expected_delivery: input.expected_delivery,
                notes: input.notes,
                lines,
            },
            Utc::now(),
        )?;
        uow.update_purchase_order(&order).await?;
        uow.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<()> {
        let mut uow = self.begin().await?;
        let order = locked_order(uow.as_mut(), id).await?;
        order.ensure_editable()?;
        uow.delete_purchase_order(id).await?;
        uow.commit().await?;
        info!(purchase_order_id = %id, "purchase order deleted");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn approve_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(id, |order, now| order.approve(now))
            .await
    }

    #[instrument(skip(self), err)]
    pub async fn cancel_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.transition_purchase_order(id, |order, now| order.cancel(now))
            .await
    }

    /// Mark the order received and book one inbound movement per line, all in
    /// one unit of work.
    #[instrument(skip(self), err)]
    pub async fn receive_purchase_order(
        &self,
        id: PurchaseOrderId,
        actor: Option<String>,
    ) -> ServiceResult<ReceiptOutcome> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        order.receive(now)?;

        let reason = order.receipt_reason();
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
                reference: Some(order.po_number().to_string()),
                notes: None,
                performed_by: actor.clone(),
            };
            let tx = move_stock(product, MovementKind::In, line.quantity, details, now)?;
            uow.update_product(product).await?;
            uow.record_transaction(&tx).await?;
            transactions.push(tx);
        }

        uow.update_purchase_order(&order).await?;
        uow.commit().await?;

        info!(
            purchase_order_id = %id,
            po_number = order.po_number(),
            lines = transactions.len(),
            "purchase order received"
        );
        Ok(ReceiptOutcome {
            order,
            transactions,
        })
    }

    async fn transition_purchase_order<F>(
        &self,
        id: PurchaseOrderId,
        apply: F,
    ) -> ServiceResult<PurchaseOrder>
    where
        F: FnOnce(&mut PurchaseOrder, chrono::DateTime<Utc>) -> Result<(), DomainError> + Send,
    {
        let mut uow = self.begin().await?;
        let mut order = locked_order(uow.as_mut(), id).await?;
        apply(&mut order, Utc::now())?;
        uow.update_purchase_order(&order).await?;
        uow.commit().await?;
        info!(purchase_order_id = %id, status = order.status().as_str(), "purchase order status changed");
        Ok(order)
    }
}

async fn locked_order(uow: &mut dyn UnitOfWork, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
    uow.lock_purchase_order(id)
        .await?
        .ok_or(ServiceError::NotFound("purchase order"))
}

async fn line_items(
    uow: &mut dyn UnitOfWork,
    items: &[OrderLineInput],
) -> ServiceResult<Vec<LineItem>> {
    Ok(resolve_lines(uow, items)
        .await?
        .into_iter()
        .map(|(product, line)| LineItem {
            product_id: line.product_id,
            product_name: product.name().to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect())
}

/// The supplier must exist when referenced; its name fills in a missing one.
async fn supplier_name_for(
    uow: &mut dyn UnitOfWork,
    supplier_id: Option<SupplierId>,
    supplier_name: Option<String>,
) -> ServiceResult<Option<String>> {
    let Some(supplier_id) = supplier_id else {
        return Ok(supplier_name);
    };
    let supplier = uow
        .get_supplier(supplier_id)
        .await?
        .ok_or(ServiceError::NotFound("supplier"))?;
    Ok(supplier_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| Some(supplier.name().to_string())))
}

async fn unused_po_number(uow: &mut dyn UnitOfWork, today: NaiveDate) -> ServiceResult<String> {
    for _ in 0..GENERATED_KEY_ATTEMPTS {
        let candidate = generate_po_number(today, rand::random::<u16>());
        if !uow.po_number_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(DomainError::conflict("could not generate an unused po_number").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::products::tests::new_product;
    use crate::app::services::suppliers::tests::new_supplier;
    use inventaris_core::{Money, ProductId};

    fn item(product_id: ProductId, quantity: i64, unit_price: i64) -> OrderLineInput {
        OrderLineInput {
            product_id,
            quantity,
            unit_price: Money::from_minor(unit_price),
        }
    }

    fn order_for(supplier_id: Option<SupplierId>, items: Vec<OrderLineInput>) -> CreatePurchaseOrder {
        CreatePurchaseOrder {
            po_number: None,
            supplier_id,
            supplier_name: None,
            order_date: None,
            expected_delivery: None,
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn create_copies_names_and_generates_number() {
        let services = AppServices::in_memory();
        let supplier = services.create_supplier(new_supplier("Acme")).await.unwrap();
        let paper = services
            .create_product(new_product("Paper", "Office", 0), None, None)
            .await
            .unwrap();

        let order = services
            .create_purchase_order(order_for(
                Some(supplier.id_typed()),
                vec![item(paper.id_typed(), 10, 4_500)],
            ))
            .await
            .unwrap();
        assert!(order.po_number().starts_with("PO-"));
        assert_eq!(order.supplier_name(), Some("Acme"));
        assert_eq!(order.lines()[0].product_name, "Paper");
        assert_eq!(order.total_amount(), Money::from_minor(45_000));
        assert_eq!(order.status(), PurchaseOrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_supplier_or_product_is_not_found() {
        let services = AppServices::in_memory();
        let paper = services
            .create_product(new_product("Paper", "Office", 0), None, None)
            .await
            .unwrap();

        let err = services
            .create_purchase_order(order_for(
                Some(SupplierId::new()),
                vec![item(paper.id_typed(), 1, 100)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("supplier")));

        let mut input = order_for(None, vec![item(ProductId::new(), 1, 100)]);
        input.supplier_name = Some("Walk-in".into());
        let err = services.create_purchase_order(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("product")));
    }

    #[tokio::test]
    async fn receive_books_inbound_stock_per_line() {
        let services = AppServices::in_memory();
        let supplier = services.create_supplier(new_supplier("Acme")).await.unwrap();
        let paper = services
            .create_product(new_product("Paper", "Office", 2), None, None)
            .await
            .unwrap();
        let order = services
            .create_purchase_order(order_for(
                Some(supplier.id_typed()),
                vec![item(paper.id_typed(), 10, 4_500)],
            ))
            .await
            .unwrap();

        let err = services
            .receive_purchase_order(order.id_typed(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));

        services.approve_purchase_order(order.id_typed()).await.unwrap();
        let receipt = services
            .receive_purchase_order(order.id_typed(), Some("carol".into()))
            .await
            .unwrap();
        assert_eq!(receipt.order.status(), PurchaseOrderStatus::Received);

        let tx = &receipt.transactions[0];
        assert_eq!((tx.old_stock, tx.new_stock), (2, 12));
        assert_eq!(tx.reason, format!("Stock received from PO: {}", order.po_number()));
        assert_eq!(tx.reference.as_deref(), Some(order.po_number()));
        assert_eq!(tx.unit_price, Some(Money::from_minor(4_500)));

        let stock = services.get_product(paper.id_typed()).await.unwrap().product.stock();
        assert_eq!(stock, 12);

        let err = services
            .cancel_purchase_order(order.id_typed())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn only_pending_orders_can_be_edited_or_deleted() {
        let services = AppServices::in_memory();
        let paper = services
            .create_product(new_product("Paper", "Office", 0), None, None)
            .await
            .unwrap();
        let mut input = order_for(None, vec![item(paper.id_typed(), 1, 100)]);
        input.supplier_name = Some("Walk-in".into());
        let order = services.create_purchase_order(input).await.unwrap();

        let updated = services
            .update_purchase_order(
                order.id_typed(),
                UpdatePurchaseOrder {
                    items: Some(vec![item(paper.id_typed(), 3, 200)]),
                    ..UpdatePurchaseOrder::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_amount(), Money::from_minor(600));

        services.approve_purchase_order(order.id_typed()).await.unwrap();
        assert!(services.delete_purchase_order(order.id_typed()).await.is_err());
        assert!(services
            .update_purchase_order(order.id_typed(), UpdatePurchaseOrder::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn duplicate_po_number_is_a_conflict() {
        let services = AppServices::in_memory();
        let paper = services
            .create_product(new_product("Paper", "Office", 0), None, None)
            .await
            .unwrap();
        let mut input = order_for(None, vec![item(paper.id_typed(), 1, 100)]);
        input.supplier_name = Some("Walk-in".into());
        input.po_number = Some("PO-FIXED".into());
        services.create_purchase_order(input.clone()).await.unwrap();

        let err = services.create_purchase_order(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }
}
