use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, DomainResult, Entity, SupplierId};

const MAX_NAME_LEN: usize = 255;

/// Supplier status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Inactive,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::Active => "active",
            SupplierStatus::Inactive => "inactive",
        }
    }
}

impl core::str::FromStr for SupplierStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SupplierStatus::Active),
            "inactive" => Ok(SupplierStatus::Inactive),
            other => Err(DomainError::validation(format!("unknown supplier status: {other}"))),
        }
    }
}

/// Contact information for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    fn normalized(self) -> DomainResult<Self> {
        let email = clean(self.email);
        if let Some(email) = &email {
            if !looks_like_email(email) {
                return Err(DomainError::validation("email is not a valid address"));
            }
        }
        Ok(Self {
            contact_person: clean(self.contact_person),
            email,
            phone: clean(self.phone),
            address: clean(self.address),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub notes: Option<String>,
    pub status: Option<SupplierStatus>,
}

/// Partial update. `None` keeps the existing value; an empty string clears an
/// optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub status: Option<SupplierStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierParts {
    pub id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub notes: Option<String>,
    pub status: SupplierStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    #[serde(flatten)]
    contact: ContactInfo,
    notes: Option<String>,
    status: SupplierStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Supplier {
    pub fn create(id: SupplierId, input: NewSupplier, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: validate_name(&input.name)?,
            contact: input.contact.normalized()?,
            notes: clean(input.notes),
            status: input.status.unwrap_or(SupplierStatus::Active),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: SupplierParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            contact: parts.contact,
            notes: parts.notes,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }

    pub fn apply_patch(&mut self, patch: SupplierPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let contact = ContactInfo {
            contact_person: patch.contact_person.or_else(|| self.contact.contact_person.clone()),
            email: patch.email.or_else(|| self.contact.email.clone()),
            phone: patch.phone.or_else(|| self.contact.phone.clone()),
            address: patch.address.or_else(|| self.contact.address.clone()),
        }
        .normalized()?;

        if let Some(name) = name {
            self.name = name;
        }
        self.contact = contact;
        if patch.notes.is_some() {
            self.notes = clean(patch.notes);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: SupplierStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation("name is too long"));
    }
    Ok(name.to_string())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_supplier() -> NewSupplier {
        NewSupplier {
            name: "PT Sumber Makmur".into(),
            contact: ContactInfo {
                contact_person: Some("Budi".into()),
                email: Some("sales@sumber.co.id".into()),
                phone: Some(" 021-555-0101 ".into()),
                address: None,
            },
            notes: None,
            status: None,
        }
    }

    #[test]
    fn create_defaults_to_active_and_trims_contact() {
        let supplier = Supplier::create(SupplierId::new(), new_supplier(), test_time()).unwrap();
        assert!(supplier.is_active());
        assert_eq!(supplier.contact().phone.as_deref(), Some("021-555-0101"));
    }

    #[test]
    fn create_rejects_malformed_email() {
        let mut input = new_supplier();
        input.contact.email = Some("not-an-email".into());
        match Supplier::create(SupplierId::new(), input, test_time()) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("email")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn patch_with_empty_string_clears_optional_field() {
        let mut supplier = Supplier::create(SupplierId::new(), new_supplier(), test_time()).unwrap();
        let patch = SupplierPatch {
            phone: Some(String::new()),
            status: Some(SupplierStatus::Inactive),
            ..SupplierPatch::default()
        };
        supplier.apply_patch(patch, test_time()).unwrap();
        assert_eq!(supplier.contact().phone, None);
        assert_eq!(supplier.contact().contact_person.as_deref(), Some("Budi"));
        assert!(!supplier.is_active());
    }
}
