//! Hotel models and DTOs.

use serde::{Deserialize, Serialize};

use super::{Principal, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Paid,
    Unpaid,
    Test,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "paid"),
            Self::Unpaid => write!(f, "unpaid"),
            Self::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A way for guests to pay by transfer (bank account, e-wallet...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub details: String,
}

impl PaymentMethod {
    /// Older records were saved without a provider or account details.
    pub fn is_legacy(&self) -> bool {
        self.name.trim().is_empty() || self.details.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: Principal,
    pub name: String,
    pub location: String,
    pub address: String,
    pub map_link: String,
    pub active: bool,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl Hotel {
    /// A freshly activated hotel, named after nothing until the owner edits it.
    pub fn new(id: Principal) -> Self {
        Self {
            id,
            name: String::new(),
            location: String::new(),
            address: String::new(),
            map_link: String::new(),
            active: true,
            subscription_status: SubscriptionStatus::Unpaid,
            rooms: Vec::new(),
            payment_methods: Vec::new(),
            contact: ContactInfo::default(),
        }
    }

    /// Shown on the guest browse pages
    pub fn is_listed(&self) -> bool {
        self.active
    }
}

/// Owner-editable hotel profile fields
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelProfileUpdate {
    pub name: String,
    pub location: String,
    pub address: String,
    #[serde(default)]
    pub map_link: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    pub name: String,
    pub details: String,
}
