use std::collections::BTreeMap;

use hpp_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Address, AuditEntry, BuyerContact, Order, OrderItem},
    helpers::GatewayOutcome,
};

//--------------------------------------         Checkout         ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Everything the buyer supplies at checkout. Prices are taken as given; reconciling them with the live catalogue is
/// the cart's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub buyer: BuyerContact,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub shipping: Money,
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub redirect_url: String,
}

//--------------------------------------         Callbacks        ---------------------------------------------------
pub const FIELD_MERCHANT_REFERENCE: &str = "ivp_cart";
pub const FIELD_TRANSACTION_REFERENCE: &str = "tran_ref";
pub const FIELD_STATUS_CODE: &str = "tran_status";
pub const FIELD_AUTH_CODE: &str = "tran_authcode";
pub const FIELD_MESSAGE: &str = "tran_authmessage";

/// The raw key/value pairs of a gateway callback, however they arrived (form body or query string). Values are kept
/// byte-for-byte since they feed the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackPayload(BTreeMap<String, String>);

impl CallbackPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Adds pairs from another source. Keys already present win, so merge the preferred source first.
    pub fn merge_missing<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.0.entry(k.into()).or_insert_with(|| v.into());
        }
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like [`Self::get`], but treats blank values as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackOutcome {
    /// The order's status fields changed.
    Applied,
    /// The callback restated the current state. Only gateway metadata was refreshed.
    Unchanged,
    /// The transition was refused by the lifecycle policy. Only gateway metadata was refreshed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackResult {
    pub order: Order,
    pub outcome: CallbackOutcome,
    pub gateway_outcome: GatewayOutcome,
}

//--------------------------------------           Admin          ---------------------------------------------------
/// A partial admin edit. Enum fields arrive as raw strings so that bad values can be reported with the list of allowed
/// ones instead of a generic deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "paymentStatus")]
    pub payment_status: Option<String>,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<String>,
    #[serde(default, alias = "shippingAddress")]
    pub shipping_address: Option<Address>,
    #[serde(default, alias = "billingAddress")]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub shipping: Option<Money>,
    #[serde(default)]
    pub total: Option<Money>,
}

impl ModifyOrderRequest {
    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_payment_status<S: Into<String>>(mut self, payment_status: S) -> Self {
        self.payment_status = Some(payment_status.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyerSummary {
    pub customer_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<&Order> for BuyerSummary {
    fn from(order: &Order) -> Self {
        let name = format!("{} {}", order.buyer.first_name, order.buyer.last_name).trim().to_string();
        Self {
            customer_id: order.customer_id.clone(),
            name,
            email: order.buyer.email.clone(),
            phone: order.buyer.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub buyer: BuyerSummary,
    pub audit_log: Vec<AuditEntry>,
}
