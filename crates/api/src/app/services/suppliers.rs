use chrono::Utc;
use tracing::{info, instrument};

use inventaris_core::{DomainError, SupplierId};
use inventaris_infra::store::{PurchaseOrderRepository, SupplierRepository, UnitOfWork};
use inventaris_suppliers::{NewSupplier, Supplier, SupplierPatch, SupplierStatus};

use super::{AppServices, ServiceError, ServiceResult};

impl AppServices {
    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create_supplier(&self, input: NewSupplier) -> ServiceResult<Supplier> {
        let supplier = Supplier::create(SupplierId::new(), input, Utc::now())?;
        let mut uow = self.begin().await?;
        uow.insert_supplier(&supplier).await?;
        uow.commit().await?;
        info!(supplier_id = %supplier.id_typed(), "supplier created");
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        let mut uow = self.begin().await?;
        uow.get_supplier(id)
            .await?
            .ok_or(ServiceError::NotFound("supplier"))
    }

    pub async fn list_suppliers(
        &self,
        status: Option<SupplierStatus>,
    ) -> ServiceResult<Vec<Supplier>> {
        let mut uow = self.begin().await?;
        Ok(uow.list_suppliers(status).await?)
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update_supplier(
        &self,
        id: SupplierId,
        patch: SupplierPatch,
    ) -> ServiceResult<Supplier> {
        let mut uow = self.begin().await?;
        let mut supplier = uow
            .get_supplier(id)
            .await?
            .ok_or(ServiceError::NotFound("supplier"))?;
        supplier.apply_patch(patch, Utc::now())?;
        uow.update_supplier(&supplier).await?;
        uow.commit().await?;
        Ok(supplier)
    }

    #[instrument(skip(self), err)]
    pub async fn set_supplier_status(
        &self,
        id: SupplierId,
        status: SupplierStatus,
    ) -> ServiceResult<Supplier> {
        let mut uow = self.begin().await?;
        let mut supplier = uow
            .get_supplier(id)
            .await?
            .ok_or(ServiceError::NotFound("supplier"))?;
        supplier.set_status(status, Utc::now());
        uow.update_supplier(&supplier).await?;
        uow.commit().await?;
        info!(supplier_id = %id, status = status.as_str(), "supplier status changed");
        Ok(supplier)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_supplier(&self, id: SupplierId) -> ServiceResult<()> {
        let mut uow = self.begin().await?;
        if uow.get_supplier(id).await?.is_none() {
            return Err(ServiceError::NotFound("supplier"));
        }
        if uow.supplier_has_purchase_orders(id).await? {
            return Err(DomainError::conflict(
                "supplier is referenced by purchase orders and cannot be deleted",
            )
            .into());
        }
        uow.delete_supplier(id).await?;
        uow.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use inventaris_suppliers::ContactInfo;

    pub(crate) fn new_supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.into(),
            contact: ContactInfo {
                contact_person: Some("Dana".into()),
                email: Some("dana@example.com".into()),
                phone: None,
                address: None,
            },
            notes: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn status_filter_and_patch() {
        let services = AppServices::in_memory();
        let acme = services.create_supplier(new_supplier("Acme")).await.unwrap();
        services.create_supplier(new_supplier("Globex")).await.unwrap();

        services
            .set_supplier_status(acme.id_typed(), SupplierStatus::Inactive)
            .await
            .unwrap();
        let active = services
            .list_suppliers(Some(SupplierStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name(), "Globex");

        let patched = services
            .update_supplier(
                acme.id_typed(),
                SupplierPatch {
                    phone: Some("555-0100".into()),
                    ..SupplierPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.contact().phone.as_deref(), Some("555-0100"));
        assert_eq!(patched.contact().email.as_deref(), Some("dana@example.com"));
    }

    #[tokio::test]
    async fn missing_supplier_is_not_found() {
        let services = AppServices::in_memory();
        assert!(matches!(
            services.delete_supplier(SupplierId::new()).await,
            Err(ServiceError::NotFound("supplier"))
        ));
    }

    #[tokio::test]
    async fn supplier_on_a_purchase_order_cannot_be_deleted() {
        use crate::app::services::OrderLineInput;
        use crate::app::services::products::tests::new_product;
        use crate::app::services::purchases::CreatePurchaseOrder;
        use inventaris_core::Money;

        let services = AppServices::in_memory();
        let acme = services.create_supplier(new_supplier("Acme")).await.unwrap();
        let paper = services
            .create_product(new_product("Paper", "Office", 0), None, None)
            .await
            .unwrap();
        services
            .create_purchase_order(CreatePurchaseOrder {
                po_number: None,
                supplier_id: Some(acme.id_typed()),
                supplier_name: None,
                order_date: None,
                expected_delivery: None,
                notes: None,
                items: vec![OrderLineInput {
                    product_id: paper.id_typed(),
                    quantity: 5,
                    unit_price: Money::from_minor(900),
                }],
            })
            .await
            .unwrap();

        assert!(matches!(
            services.delete_supplier(acme.id_typed()).await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));
        assert_eq!(services.get_supplier(acme.id_typed()).await.unwrap().name(), "Acme");
    }
}
